/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

/// Rows moved by PageUp/PageDown and Ctrl-U/Ctrl-D.
pub(crate) const PAGE_STEP: usize = 10;

/// Row cursor over the visible tree.
///
/// Invariant: `pos < len`, or `pos == 0` when the tree shows no rows.
/// Movement methods return `true` when the position changed.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    pos: usize,
    len: usize,
}

impl Cursor {
    pub(crate) fn new(len: usize) -> Self {
        Self { pos: 0, len }
    }

    fn move_to(&mut self, new_pos: usize) -> bool {
        let changed = self.pos != new_pos;
        self.pos = new_pos;
        changed
    }

    fn last(&self) -> usize {
        self.len.saturating_sub(1)
    }

    pub(crate) fn move_up(&mut self) -> bool {
        self.move_to(self.pos.saturating_sub(1))
    }

    pub(crate) fn move_down(&mut self) -> bool {
        self.move_to((self.pos + 1).min(self.last()))
    }

    pub(crate) fn home(&mut self) -> bool {
        self.move_to(0)
    }

    pub(crate) fn end(&mut self) -> bool {
        self.move_to(self.last())
    }

    pub(crate) fn page_down(&mut self, amount: usize) -> bool {
        self.move_to((self.pos + amount).min(self.last()))
    }

    pub(crate) fn page_up(&mut self, amount: usize) -> bool {
        self.move_to(self.pos.saturating_sub(amount))
    }

    /// Resize after the tree changed shape, clamping the position.
    pub(crate) fn update_len(&mut self, new_len: usize) {
        self.len = new_len;
        self.pos = self.pos.min(self.last());
    }

    /// Jump to a row (clamped).
    pub(crate) fn set_pos(&mut self, new_pos: usize) {
        self.pos = new_pos.min(self.last());
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    #[allow(dead_code)] // used by tests
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
