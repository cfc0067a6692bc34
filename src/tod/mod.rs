// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Time-ordered data, accumulated chunk by chunk.
//!
//! Chunks may finish out of order when they're processed in parallel. A
//! [`ChunkMerger`] holds early arrivals until everything before them has been
//! seen, then a [`TimestreamAccumulator`] appends them, refusing anything
//! that isn't the next contiguous chunk.

mod error;
#[cfg(test)]
mod tests;

pub use error::AccumulationError;

use std::collections::BTreeMap;

use log::trace;
use rayon::prelude::*;

use crate::{healpix::ang2pix_ring, synthesize::ChunkTimestreams};

/// The samples of one detector with their pointing-matrix entries.
#[derive(Debug, Clone, Default)]
pub struct DetectorTod {
    /// The index of the detector in the focal plane.
    pub detector: usize,

    pub data: Vec<f64>,

    /// The RING-ordered pixel containing each sample.
    pub pixels: Vec<u32>,

    pub cos_2psi: Vec<f64>,
    pub sin_2psi: Vec<f64>,
}

impl DetectorTod {
    fn new(detector: usize) -> DetectorTod {
        DetectorTod {
            detector,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Pointing-matrix entries of a detector's samples at `nside`.
pub(crate) fn pointing_matrix(
    nside: usize,
    theta: &[f64],
    phi: &[f64],
    psi: &[f64],
) -> (Vec<u32>, Vec<f64>, Vec<f64>) {
    let pixels = theta
        .par_iter()
        .zip(phi.par_iter())
        .map(|(&t, &p)| ang2pix_ring(nside, t, p) as u32)
        .collect();
    let (sin_2psi, cos_2psi) = psi.par_iter().map(|&psi| (2.0 * psi).sin_cos()).unzip();
    (pixels, cos_2psi, sin_2psi)
}

/// Appends chunk timestreams in strict chunk order.
///
/// Ordering is always checked. The samples themselves are only kept if
/// `retain` was set; otherwise the accumulator just counts.
#[derive(Debug)]
pub struct TimestreamAccumulator {
    nside: usize,
    retain: bool,
    detectors: Vec<usize>,
    tods: Vec<DetectorTod>,
    next_chunk: usize,
    num_samples: usize,
}

impl TimestreamAccumulator {
    /// `detectors` are the focal-plane indices of the live detectors, in the
    /// order the synthesizer reports them.
    pub fn new(nside: usize, detectors: Vec<usize>, retain: bool) -> TimestreamAccumulator {
        let tods = if retain {
            detectors.iter().copied().map(DetectorTod::new).collect()
        } else {
            vec![]
        };
        TimestreamAccumulator {
            nside,
            retain,
            detectors,
            tods,
            next_chunk: 0,
            num_samples: 0,
        }
    }

    /// Append the next chunk. It must directly follow the previous chunk in
    /// both chunk index and sample range, and carry every expected detector.
    pub fn append(&mut self, chunk: &ChunkTimestreams) -> Result<(), AccumulationError> {
        let c = &chunk.chunk;
        if c.index != self.next_chunk {
            return Err(AccumulationError::OutOfOrder {
                expected: self.next_chunk,
                got: c.index,
            });
        }
        if c.first_sample != self.num_samples {
            return Err(AccumulationError::NotContiguous {
                chunk: c.index,
                expected: self.num_samples,
                got: c.first_sample,
            });
        }
        if !chunk
            .detectors
            .iter()
            .map(|d| d.detector)
            .eq(self.detectors.iter().copied())
        {
            return Err(AccumulationError::DetectorMismatch {
                chunk: c.index,
                expected: self.detectors.clone(),
                got: chunk.detectors.iter().map(|d| d.detector).collect(),
            });
        }
        for d in &chunk.detectors {
            let got = d.data.len().min(d.pointing.theta.len());
            if d.data.len() != c.num_samples || d.pointing.theta.len() != c.num_samples {
                return Err(AccumulationError::BadLength {
                    chunk: c.index,
                    detector: d.detector,
                    expected: c.num_samples,
                    got,
                });
            }
        }

        if self.retain {
            for (tod, d) in self.tods.iter_mut().zip(chunk.detectors.iter()) {
                let (pixels, cos_2psi, sin_2psi) =
                    pointing_matrix(self.nside, &d.pointing.theta, &d.pointing.phi, &d.pointing.psi);
                tod.data.extend_from_slice(&d.data);
                tod.pixels.extend(pixels);
                tod.cos_2psi.extend(cos_2psi);
                tod.sin_2psi.extend(sin_2psi);
            }
        }
        trace!(
            "Accumulated chunk {} (samples {}..{})",
            c.index,
            c.first_sample,
            c.first_sample + c.num_samples
        );
        self.next_chunk += 1;
        self.num_samples += c.num_samples;
        Ok(())
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    /// The number of chunks appended so far.
    pub fn num_chunks(&self) -> usize {
        self.next_chunk
    }

    /// The number of samples per detector appended so far.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn is_retained(&self) -> bool {
        self.retain
    }

    /// The accumulated timestreams; empty unless they're being retained.
    pub fn tods(&self) -> &[DetectorTod] {
        &self.tods
    }
}

/// Releases items strictly in chunk-index order, however they arrive.
#[derive(Debug)]
pub struct ChunkMerger<T> {
    next: usize,
    pending: BTreeMap<usize, T>,
}

impl<T> Default for ChunkMerger<T> {
    fn default() -> Self {
        ChunkMerger::new()
    }
}

impl<T> ChunkMerger<T> {
    pub fn new() -> ChunkMerger<T> {
        ChunkMerger {
            next: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Hand over the item of chunk `index`. Returns every item that is now
    /// ready, in order (possibly none).
    pub fn push(&mut self, index: usize, item: T) -> Result<Vec<T>, AccumulationError> {
        if index < self.next || self.pending.contains_key(&index) {
            return Err(AccumulationError::DuplicateChunk(index));
        }
        self.pending.insert(index, item);

        let mut ready = vec![];
        while let Some(item) = self.pending.remove(&self.next) {
            ready.push(item);
            self.next += 1;
        }
        Ok(ready)
    }

    /// The index of the chunk being waited on.
    pub fn next_index(&self) -> usize {
        self.next
    }

    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// Check that exactly `num_chunks` chunks were released.
    pub fn finish(self, num_chunks: usize) -> Result<(), AccumulationError> {
        if !self.pending.is_empty() {
            return Err(AccumulationError::Gap {
                missing: self.next,
                pending: self.pending.len(),
            });
        }
        if self.next != num_chunks {
            return Err(AccumulationError::Incomplete {
                expected: num_chunks,
                got: self.next,
            });
        }
        Ok(())
    }
}
