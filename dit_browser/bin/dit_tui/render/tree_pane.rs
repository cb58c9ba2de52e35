/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use dit_browser::synthetic::TreeItem;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::List;
use ratatui::widgets::ListItem;
use ratatui::widgets::ListState;

use crate::App;

/// Text drawn for a row. Entries show their display name; the DN is
/// in the detail pane.
pub(crate) fn row_label(item: &TreeItem) -> String {
    match item {
        TreeItem::Entry(node) => node.display_name().to_string(),
        other => other.label().into_owned(),
    }
}

/// Render the directory tree (left pane).
///
/// Each row carries indentation/connectors, a fold glyph for nodes
/// with an expand affordance (`⟳` while loading), and color-coding by
/// row kind, with the selected row highlighted.
pub(crate) fn render_directory_tree(frame: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let rows = app.visible_rows();
    let scheme = &app.theme.scheme;
    let labels = &app.theme.labels;

    let items: Vec<ListItem> = rows
        .as_slice()
        .iter()
        .enumerate()
        .map(|(vis_idx, row)| {
            let node = row.node;
            let indent = "  ".repeat(row.depth);

            let connector = if row.depth == 0 {
                ""
            } else if rows.has_sibling_after(vis_idx, row.depth) {
                "├─ "
            } else {
                "└─ "
            };

            let expandable = node.has_affordance();
            let fold = if app.controller.is_loading(&node.key) {
                labels.loading_icon
            } else if expandable {
                if node.expanded { "▼ " } else { "▶ " }
            } else {
                "  "
            };

            let selected = vis_idx == app.cursor.pos();
            let style = if selected {
                scheme.stat_selection.add_modifier(Modifier::BOLD)
            } else {
                scheme.node_style(node.item.kind(), expandable)
            };
            let marker = if selected {
                labels.selection_caret
            } else {
                "  "
            };

            ListItem::new(Line::from(Span::styled(
                format!(
                    "{}{}{}{}{}",
                    marker,
                    indent,
                    connector,
                    fold,
                    row_label(&node.item)
                ),
                style,
            )))
        })
        .collect();

    let block = Block::default()
        .title(labels.pane_tree)
        .borders(Borders::ALL)
        .border_style(scheme.border);

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default());
    let mut list_state = ListState::default()
        .with_selected(Some(app.cursor.pos()))
        .with_offset(app.tree_scroll_offset);
    frame.render_stateful_widget(list, area, &mut list_state);
}
