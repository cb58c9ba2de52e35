/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use dit_browser::DirectoryNode;
use dit_browser::LoadState;
use dit_browser::classify::classify_node;
use dit_browser::synthetic::TreeItem;
use dit_browser::tree::TreeNode;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Wrap;

use crate::App;
use crate::theme::ColorScheme;
use crate::theme::Labels;

/// Render the contextual details pane (right side) for the row under
/// the cursor.
pub(crate) fn render_detail_pane(frame: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let rows = app.visible_rows();
    let scheme = &app.theme.scheme;
    let labels = &app.theme.labels;

    let Some(row) = rows.get(app.cursor.pos()) else {
        let block = Block::default()
            .title(labels.pane_details)
            .borders(Borders::ALL)
            .border_style(scheme.border);
        let p = Paragraph::new(Span::styled("Select a node to view details", scheme.info))
            .block(block);
        frame.render_widget(p, area);
        return;
    };

    let lines = match &row.node.item {
        TreeItem::Entry(entry) => entry_lines(app, row.node, entry, scheme, labels),
        TreeItem::Root => vec![
            Line::from(Span::styled(labels.root_hint, scheme.info)),
            Line::default(),
            detail_line(labels.state, state_label(app, row.node), scheme),
            detail_line(labels.children, row.node.children.len().to_string(), scheme),
        ],
        TreeItem::PaginationPrev { .. }
        | TreeItem::PaginationNext { .. }
        | TreeItem::PaginationInfo { .. } => {
            let parent = app.controller.cache().parent_key(&row.node.key);
            let page = parent
                .as_ref()
                .and_then(|p| app.controller.cursors().get(p))
                .unwrap_or(0);
            let mut lines = vec![
                detail_line(
                    labels.dn,
                    parent.map(|p| p.to_string()).unwrap_or_default(),
                    scheme,
                ),
                detail_line(labels.page, (page + 1).to_string(), scheme),
            ];
            if row.node.item.is_page_control() {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(labels.paging_hint, scheme.info)));
            }
            lines
        }
        TreeItem::Placeholder | TreeItem::Forest => {
            vec![Line::from(Span::styled(labels.placeholder_hint, scheme.info))]
        }
    };

    let title = if row.node.item.is_real() {
        labels.pane_entry
    } else {
        labels.pane_details
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(scheme.border);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(p, area);
}

fn state_label(app: &App, node: &TreeNode) -> String {
    if app.controller.is_loading(&node.key) {
        return "loading".to_string();
    }
    match app.controller.cache().state(&node.key) {
        LoadState::Unexpanded => "not loaded",
        LoadState::Loading => "loading",
        LoadState::Loaded => "loaded",
        LoadState::Empty => "no children",
    }
    .to_string()
}

fn entry_lines<'a>(
    app: &App,
    node: &TreeNode,
    entry: &'a DirectoryNode,
    scheme: &ColorScheme,
    labels: &'a Labels,
) -> Vec<Line<'a>> {
    let kind = if classify_node(entry).is_eligible() {
        labels.expandable
    } else {
        labels.leaf
    };
    let mut lines = vec![
        detail_line(labels.dn, entry.dn.to_string(), scheme),
        detail_line(labels.object_classes, entry.object_classes().join(", "), scheme),
        detail_line(labels.state, format!("{} ({})", state_label(app, node), kind), scheme),
    ];
    if app.controller.cache().state(&node.key) == LoadState::Loaded {
        let count = node.children.iter().filter(|c| c.item.is_real()).count();
        lines.push(detail_line(labels.children, count.to_string(), scheme));
        if let Some(page) = app.controller.cursors().get(&node.key) {
            lines.push(detail_line(labels.page, (page + 1).to_string(), scheme));
        }
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(labels.attributes, scheme.app_name)));
    for (name, values) in &entry.attributes {
        for value in values {
            lines.push(Line::from(vec![
                Span::styled(format!("  {}: ", name), scheme.detail_label),
                Span::styled(value.as_str(), scheme.detail_value),
            ]));
        }
    }
    lines
}

/// Build a key-value detail line with a styled label and raw value.
pub(crate) fn detail_line<'a>(
    label: &'a str,
    value: impl Into<String>,
    scheme: &ColorScheme,
) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, scheme.detail_label),
        Span::raw(value.into()),
    ])
}
