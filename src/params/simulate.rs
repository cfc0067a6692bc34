// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Simulate timestreams over a schedule and make maps from them.

use std::{
    num::NonZeroUsize,
    path::PathBuf,
    thread::{self, ScopedJoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;
use scopeguard::defer_on_unwind;
use thiserror::Error;

use crate::{
    focal_plane::FocalPlane,
    io::{write_maps, MapWriteError},
    mapmaking::{
        validate_weights, MapmakingError, NormalEquations, PartialNormalEquations,
        SkyMapEstimate, SolveParams,
    },
    pointing::{ObservationConfig, PointingEngine, PointingError},
    schedule::{Chunk, Schedule},
    sky::SkyCoefficients,
    synthesize::{
        ChunkTimestreams, ConvolvedSky, SynthesisError, SynthesisParams, TimestreamSynthesizer,
    },
    tod::{AccumulationError, ChunkMerger, TimestreamAccumulator},
    PROGRESS_BARS,
};

/// Everything needed to run a simulation, validated and ready to go.
pub struct SimulateParams {
    pub sky: SkyCoefficients,
    pub focal_plane: FocalPlane,
    pub schedule: Schedule,
    pub observation: ObservationConfig,
    pub synthesis: SynthesisParams,
    pub solve: SolveParams,

    /// The resolution of the output maps.
    pub map_nside: usize,

    /// The maximum number of samples handled at once.
    pub chunk_size: NonZeroUsize,

    /// The map-making weight of each focal-plane detector.
    pub weights: Vec<f64>,

    /// Keep all timestreams in memory, not just their normal equations.
    pub retain_tod: bool,

    /// Where to write the maps.
    pub outputs: Vec<PathBuf>,
}

/// The results of [`SimulateParams::run`].
pub struct SimulateOutput {
    pub maps: SkyMapEstimate,
    pub accumulator: TimestreamAccumulator,
}

/// What one chunk produces.
struct ChunkResult {
    timestreams: ChunkTimestreams,
    partial: PartialNormalEquations,
}

impl SimulateParams {
    pub fn run(&self) -> Result<SimulateOutput, SimulateError> {
        let SimulateParams {
            sky,
            focal_plane,
            schedule,
            observation,
            synthesis,
            solve,
            map_nside,
            chunk_size,
            weights,
            retain_tod,
            outputs,
        } = self;
        // Chunks are binned in parallel, so catch missing weights up front.
        validate_weights(weights, focal_plane.live_detectors().map(|(i, _)| i))?;

        info!(
            "Convolving the sky (lmax {}) with the beams at nside {}",
            sky.lmax(),
            synthesis.nside
        );
        let convolved = ConvolvedSky::new(sky, focal_plane, synthesis.nside)?;
        debug!("{} distinct beam(s)", convolved.num_distinct_beams());
        let synthesizer = TimestreamSynthesizer::new(&convolved, focal_plane, synthesis)?;
        let engine = PointingEngine::new(schedule, observation)?;
        let num_chunks = schedule.partition(*chunk_size).num_chunks();
        info!(
            "Processing {} samples per detector in {num_chunks} chunk(s)",
            schedule.total_num_samples()
        );

        // Channel for chunk results. Each batch has at most this many chunks.
        let batch_size = rayon::current_num_threads();
        let (tx, rx) = bounded(batch_size);

        // Progress bars.
        let multi_progress = MultiProgress::with_draw_target(if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        });
        let synth_progress = multi_progress.add(
            ProgressBar::new(num_chunks as _)
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} chunks ({elapsed_precise}<{eta_precise})").unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message("Synthesising"),
        );
        let accum_progress = multi_progress.add(
            ProgressBar::new(num_chunks as _)
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} chunks ({elapsed_precise}<{eta_precise})").unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message("Accumulating"),
        );

        let error = AtomicCell::new(false);
        let scoped_threads_result: Result<(TimestreamAccumulator, NormalEquations), SimulateError> =
            thread::scope(|scope| {
                // Synthesis thread.
                let synth_handle: ScopedJoinHandle<Result<(), SimulateError>> =
                    thread::Builder::new()
                        .name("synthesis".to_string())
                        .spawn_scoped(scope, || {
                            defer_on_unwind! { error.store(true); }
                            synth_progress.tick();

                            let result = synthesis_thread(
                                schedule,
                                *chunk_size,
                                batch_size,
                                &engine,
                                &synthesizer,
                                *map_nside,
                                weights,
                                tx,
                                &error,
                                synth_progress,
                            );
                            if result.is_err() {
                                error.store(true);
                            }
                            result
                        })
                        .expect("OS can create threads");

                // Accumulation thread.
                let accum_handle: ScopedJoinHandle<
                    Result<(TimestreamAccumulator, NormalEquations), SimulateError>,
                > = thread::Builder::new()
                    .name("accumulate".to_string())
                    .spawn_scoped(scope, || {
                        defer_on_unwind! { error.store(true); }
                        accum_progress.tick();

                        let result = accumulate_thread(
                            focal_plane,
                            *map_nside,
                            *retain_tod,
                            num_chunks,
                            rx,
                            &error,
                            accum_progress,
                        );
                        if result.is_err() {
                            error.store(true);
                        }
                        result
                    })
                    .expect("OS can create threads");

                // Join all thread handles. This propagates any errors and lets
                // us know if any threads panicked.
                synth_handle.join().unwrap()?;
                let accumulated = accum_handle.join().unwrap()?;
                Ok(accumulated)
            });
        let (accumulator, normal) = scoped_threads_result?;

        info!("Solving for maps at nside {map_nside}");
        let maps = normal.solve(solve)?;
        for output in outputs {
            write_maps(&maps, output)?;
            info!("Maps written to {}", output.display());
        }

        Ok(SimulateOutput { maps, accumulator })
    }
}

fn process_chunk(
    chunk: &Chunk,
    engine: &PointingEngine,
    synthesizer: &TimestreamSynthesizer,
    map_nside: usize,
    weights: &[f64],
) -> Result<ChunkResult, SimulateError> {
    let pointing = engine.resolve_pointing(chunk)?;
    let timestreams = synthesizer.synthesize(&pointing);
    let partial = PartialNormalEquations::from_chunk(map_nside, weights, &timestreams)?;
    Ok(ChunkResult {
        timestreams,
        partial,
    })
}

#[allow(clippy::too_many_arguments)]
fn synthesis_thread(
    schedule: &Schedule,
    chunk_size: NonZeroUsize,
    batch_size: usize,
    engine: &PointingEngine,
    synthesizer: &TimestreamSynthesizer,
    map_nside: usize,
    weights: &[f64],
    tx: Sender<ChunkResult>,
    error: &AtomicCell<bool>,
    progress_bar: ProgressBar,
) -> Result<(), SimulateError> {
    let mut partitioner = schedule.partition(chunk_size);
    loop {
        // Should we continue?
        if error.load() {
            return Ok(());
        }

        let batch: Vec<Chunk> = partitioner.by_ref().take(batch_size.max(1)).collect();
        if batch.is_empty() {
            break;
        }
        // Chunks within a batch finish in any order; the accumulator puts
        // them back in order.
        batch.par_iter().try_for_each(|chunk| {
            let result = process_chunk(chunk, engine, synthesizer, map_nside, weights)?;
            // If we can't send the message, it's because the channel has
            // been closed on the other side. That should only happen because
            // the accumulator has exited due to error; in that case, stop.
            if tx.send(result).is_err() {
                error.store(true);
            }
            progress_bar.inc(1);
            Ok::<(), SimulateError>(())
        })?;
    }

    progress_bar.abandon_with_message("Finished synthesising");
    Ok(())
}

fn accumulate_thread(
    focal_plane: &FocalPlane,
    map_nside: usize,
    retain_tod: bool,
    num_chunks: usize,
    rx: Receiver<ChunkResult>,
    error: &AtomicCell<bool>,
    progress_bar: ProgressBar,
) -> Result<(TimestreamAccumulator, NormalEquations), SimulateError> {
    let live = focal_plane.live_detectors().map(|(i, _)| i).collect();
    let mut accumulator = TimestreamAccumulator::new(map_nside, live, retain_tod);
    let mut normal = NormalEquations::new(map_nside)?;
    let mut merger = ChunkMerger::new();

    for result in rx.iter() {
        let index = result.timestreams.chunk.index;
        for ready in merger.push(index, result)? {
            accumulator.append(&ready.timestreams)?;
            normal.add(&ready.partial)?;
            progress_bar.inc(1);
        }

        // Should we continue?
        if error.load() {
            return Ok((accumulator, normal));
        }
    }
    // The synthesis thread has finished; if it failed, its error takes
    // precedence over any gap here.
    if error.load() {
        return Ok((accumulator, normal));
    }
    merger.finish(num_chunks)?;

    progress_bar.abandon_with_message("Finished accumulating");
    Ok((accumulator, normal))
}

#[derive(Error, Debug)]
pub enum SimulateError {
    #[error(transparent)]
    Pointing(#[from] PointingError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Accumulation(#[from] AccumulationError),

    #[error(transparent)]
    Mapmaking(#[from] MapmakingError),

    #[error(transparent)]
    MapWrite(#[from] MapWriteError),
}
