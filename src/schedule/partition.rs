// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Splitting a schedule into bounded chunks of samples.

use std::{num::NonZeroUsize, ops::Range};

use super::Schedule;

/// A contiguous run of samples inside a single schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// The position of this chunk in the partition.
    pub index: usize,

    /// The index of the schedule entry that owns this chunk.
    pub entry: usize,

    /// The index of the first sample over the whole schedule.
    pub first_sample: usize,

    /// The index of the first sample inside the owning entry.
    pub entry_offset: usize,

    pub num_samples: usize,
}

impl Chunk {
    /// The global sample range of this chunk.
    pub fn range(&self) -> Range<usize> {
        self.first_sample..self.first_sample + self.num_samples
    }
}

/// Lazily produces [`Chunk`]s. Chunks never cross entry boundaries, so each
/// entry's last chunk may be short. Once exhausted, nothing more is produced
/// until [`Partitioner::reset`] is called.
#[derive(Debug, Clone)]
pub struct Partitioner<'a> {
    schedule: &'a Schedule,
    chunk_size: usize,

    next_index: usize,
    entry: usize,
    entry_offset: usize,
}

impl<'a> Partitioner<'a> {
    pub(super) fn new(schedule: &'a Schedule, chunk_size: NonZeroUsize) -> Partitioner<'a> {
        Partitioner {
            schedule,
            chunk_size: chunk_size.get(),
            next_index: 0,
            entry: 0,
            entry_offset: 0,
        }
    }

    /// Start again from the first chunk.
    pub fn reset(&mut self) {
        self.next_index = 0;
        self.entry = 0;
        self.entry_offset = 0;
    }

    /// The total number of chunks in the partition.
    pub fn num_chunks(&self) -> usize {
        self.schedule
            .entry_num_samples()
            .iter()
            .map(|&n| (n + self.chunk_size - 1) / self.chunk_size)
            .sum()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Iterator for Partitioner<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let entry_num_samples = self.schedule.entry_num_samples();
        loop {
            let num_in_entry = *entry_num_samples.get(self.entry)?;
            if self.entry_offset >= num_in_entry {
                self.entry += 1;
                self.entry_offset = 0;
                continue;
            }

            let num_samples = self.chunk_size.min(num_in_entry - self.entry_offset);
            let chunk = Chunk {
                index: self.next_index,
                entry: self.entry,
                first_sample: self.schedule.entry_first_sample(self.entry) + self.entry_offset,
                entry_offset: self.entry_offset,
                num_samples,
            };
            self.next_index += 1;
            self.entry_offset += num_samples;
            return Some(chunk);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_chunks() - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Partitioner<'_> {}
