// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tree-style printers for run summaries and deferred warnings.

use std::{borrow::Cow, sync::Mutex};

use log::Level;

const VERTICAL: char = '│';
const UP_AND_RIGHT: char = '└';
const VERTICAL_AND_RIGHT: char = '├';

lazy_static::lazy_static! {
    static ref WARNINGS: Mutex<Vec<Vec<Cow<'static, str>>>> = Mutex::new(vec![]);
}

type Block = Vec<Cow<'static, str>>;

/// Log a bold title followed by blocks of lines. The first line of each
/// block gets a branch; the last block closes the tree.
fn render(level: Level, title: &str, blocks: &[Block]) {
    log::log!(level, "{}", console::style(title).bold());
    let num_blocks = blocks.len();
    for (i_block, block) in blocks.iter().enumerate() {
        let last_block = i_block + 1 == num_blocks;
        let num_lines = block.len();
        for (i_line, line) in block.iter().enumerate() {
            let symbol = match (i_line, i_line + 1 == num_lines, last_block) {
                (0, true, true) => UP_AND_RIGHT,
                (0, _, _) => VERTICAL_AND_RIGHT,
                _ => VERTICAL,
            };
            log::log!(level, "{symbol} {line}");
        }
    }
    log::log!(level, "");
}

pub(crate) struct InfoPrinter {
    title: Cow<'static, str>,
    blocks: Vec<Block>,
}

impl InfoPrinter {
    pub(crate) fn new(title: Cow<'static, str>) -> Self {
        Self {
            title,
            blocks: vec![],
        }
    }

    pub(crate) fn push_line(&mut self, line: Cow<'static, str>) {
        self.blocks.push(vec![line]);
    }

    pub(crate) fn push_block(&mut self, block: Vec<Cow<'static, str>>) {
        self.blocks.push(block);
    }

    pub(crate) fn display(self) {
        render(Level::Info, &self.title, &self.blocks);
    }
}

/// Things that can be queued as a warning, to be shown once argument parsing
/// is done.
pub(crate) trait Warn {
    fn warn(self);
}

fn queue(block: Block) {
    // A poisoned lock only means another thread panicked mid-push; the
    // queue itself is still usable.
    let mut warnings = match WARNINGS.lock() {
        Ok(w) => w,
        Err(poisoned) => poisoned.into_inner(),
    };
    warnings.push(block);
}

impl Warn for &'static str {
    fn warn(self) {
        queue(vec![self.into()]);
    }
}

impl Warn for String {
    fn warn(self) {
        queue(vec![self.into()]);
    }
}

impl Warn for Cow<'static, str> {
    fn warn(self) {
        queue(vec![self]);
    }
}

impl Warn for Vec<Cow<'static, str>> {
    fn warn(self) {
        queue(self);
    }
}

impl<const N: usize> Warn for [Cow<'static, str>; N] {
    fn warn(self) {
        queue(self.to_vec());
    }
}

/// Print out any warnings that have been collected as CLI arguments have been
/// parsed, then forget them.
pub(crate) fn display_warnings() {
    log::debug!("Displaying warnings");
    let blocks: Vec<Block> = match WARNINGS.lock() {
        Ok(mut w) => std::mem::take(&mut *w),
        Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    };
    if !blocks.is_empty() {
        render(Level::Warn, "Warnings", &blocks);
    }
}
