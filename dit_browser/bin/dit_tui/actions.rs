/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

/// Result of handling a key event.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum KeyResult {
    /// Nothing changed.
    None,
    /// The cursor moved; publish the new selection.
    SelectionChanged,
    /// The tree shape changed (expand, collapse, page change); resync
    /// the cursor length and publish the selection.
    TreeChanged,
}
