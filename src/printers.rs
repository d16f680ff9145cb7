// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pretty printers for reporting information through the logger.

use std::borrow::Cow;

use log::Level;

const VERTICAL: char = '│';
const UP_AND_RIGHT: char = '└';
const VERTICAL_AND_RIGHT: char = '├';

/// A bold title followed by blocks of lines, drawn as a tree.
pub(crate) struct BlockPrinter {
    title: Cow<'static, str>,
    blocks: Vec<Vec<Cow<'static, str>>>,
    level: Level,
}

impl BlockPrinter {
    pub(crate) fn info(title: impl Into<Cow<'static, str>>) -> Self {
        Self {
            title: title.into(),
            blocks: vec![],
            level: Level::Info,
        }
    }

    pub(crate) fn push_line(&mut self, line: impl Into<Cow<'static, str>>) {
        self.blocks.push(vec![line.into()]);
    }

    pub(crate) fn push_block(&mut self, block: Vec<Cow<'static, str>>) {
        if !block.is_empty() {
            self.blocks.push(block);
        }
    }

    /// The lines that would be displayed, without the title.
    pub(crate) fn lines(&self) -> Vec<String> {
        let num_blocks = self.blocks.len();
        let mut lines = vec![];
        for (i_block, block) in self.blocks.iter().enumerate() {
            let num_lines = block.len();
            for (i_line, line) in block.iter().enumerate() {
                let symbol = match (i_line, i_line + 1 == num_lines, i_block + 1 == num_blocks) {
                    (0, false, _) => VERTICAL_AND_RIGHT,
                    (0, _, false) => VERTICAL_AND_RIGHT,
                    (0, true, true) => UP_AND_RIGHT,
                    _ => VERTICAL,
                };
                lines.push(format!("{symbol} {line}"));
            }
        }
        lines
    }

    pub(crate) fn display(self) {
        log::log!(self.level, "{}", console::style(&self.title).bold());
        for line in self.lines() {
            log::log!(self.level, "{line}");
        }
        log::log!(self.level, "");
    }
}
