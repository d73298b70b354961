// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// Pretty printers for reporting information.
use std::{borrow::Cow, sync::Mutex};

const VERTICAL: char = '│';
const UP_AND_RIGHT: char = '└';
const VERTICAL_AND_RIGHT: char = '├';

lazy_static::lazy_static! {
    static ref WARNING_PRINTER: Mutex<Vec<Vec<Cow<'static, str>>>> = Mutex::new(vec![]);
}

/// A titled tree of lines, e.g.
///
/// ```text
/// Programme U/24A/1
/// ├ 3 MSBs
/// └ MSB 'M31 map'
/// │ remaining: 2
/// ```
pub(crate) struct InfoPrinter {
    title: Cow<'static, str>,
    blocks: Vec<Vec<Cow<'static, str>>>,
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
        log::info!("{}", console::style(self.title).bold());
        for (symbol, line) in tree_lines(&self.blocks) {
            log::info!("{symbol} {line}");
        }
        log::info!("");
    }
}

/// Pair each line of each block with the tree symbol it's drawn with. The
/// first line of a block branches off; the rest of the block hangs below it.
fn tree_lines<'a>(blocks: &'a [Vec<Cow<'static, str>>]) -> Vec<(char, &'a str)> {
    let num_blocks = blocks.len();
    blocks
        .iter()
        .enumerate()
        .flat_map(|(i_block, block)| {
            let num_lines = block.len();
            block.iter().enumerate().map(move |(i_line, line)| {
                let symbol = match (i_line, i_line + 1 == num_lines, i_block + 1 == num_blocks) {
                    (0, false, _) | (0, _, false) => VERTICAL_AND_RIGHT,
                    (0, true, true) => UP_AND_RIGHT,
                    _ => VERTICAL,
                };
                (symbol, line.as_ref())
            })
        })
        .collect()
}

pub(crate) trait Warn {
    fn warn(self);
}

impl Warn for &'static str {
    fn warn(self) {
        push_warning(vec![self.into()]);
    }
}

impl Warn for String {
    fn warn(self) {
        push_warning(vec![self.into()]);
    }
}

impl Warn for Vec<Cow<'static, str>> {
    fn warn(self) {
        push_warning(self);
    }
}

fn push_warning(block: Vec<Cow<'static, str>>) {
    // A poisoned lock only means another thread panicked while pushing; the
    // warnings collected so far are still usable.
    let mut blocks = match WARNING_PRINTER.lock() {
        Ok(b) => b,
        Err(poisoned) => poisoned.into_inner(),
    };
    blocks.push(block);
}

/// Print out any warnings that have been collected while running a
/// subcommand, then forget them.
pub(crate) fn display_warnings() {
    log::debug!("Displaying warnings");
    let mut blocks = match WARNING_PRINTER.lock() {
        Ok(b) => b,
        Err(poisoned) => poisoned.into_inner(),
    };
    if blocks.is_empty() {
        return;
    }

    log::warn!("{}", console::style("Warnings").bold());
    for (symbol, line) in tree_lines(&blocks) {
        log::warn!("{symbol} {line}");
    }
    log::warn!("");
    blocks.clear();
}
