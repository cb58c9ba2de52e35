/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use dit_browser::NodeKind;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;

use crate::App;
use crate::theme::ColorScheme;
use crate::theme::Labels;
use crate::theme::ThemeName;

/// Render the top status/header bar.
///
/// Line 1 carries the source, cache size, fetches in flight and the
/// last completion message; line 2 the last selected entry. An error
/// replaces both until dismissed.
pub(crate) fn render_header(frame: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let l = &app.theme.labels;
    let scheme = &app.theme.scheme;

    if let Some(err) = &app.error {
        let header = Paragraph::new(vec![
            Line::from(Span::styled(l.app_name, scheme.app_name)),
            Line::from(Span::styled(format!("ERROR: {}", err), scheme.error)),
        ])
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(scheme.border),
        );
        frame.render_widget(header, area);
        return;
    }

    // Line 1: app name • source • entries: 42 • ⟳ 2 • status
    let mut line1_spans = vec![
        Span::styled(l.app_name, scheme.app_name),
        Span::styled(l.separator, scheme.stat_label),
        Span::styled(app.source.as_str(), scheme.stat_url),
        Span::styled(l.separator, scheme.stat_label),
        Span::styled(l.entries, scheme.stat_label),
        Span::styled(
            app.controller.cache().entries().len().to_string(),
            scheme.stat_timing,
        ),
    ];

    let in_flight = app.controller.in_flight();
    if in_flight > 0 {
        line1_spans.extend(vec![
            Span::styled(l.separator, scheme.stat_label),
            Span::styled(l.loading_icon, scheme.stat_timing),
            Span::styled(in_flight.to_string(), scheme.stat_timing),
        ]);
    }

    // Skip the default theme to reduce noise.
    if !matches!(app.theme_name, ThemeName::Nord) {
        line1_spans.extend(vec![
            Span::styled(l.separator, scheme.stat_label),
            Span::styled(format!("theme:{}", app.theme_name), scheme.stat_url),
        ]);
    }

    if let Some(status) = &app.status {
        line1_spans.extend(vec![
            Span::styled(l.separator, scheme.stat_label),
            Span::styled(status.as_str(), scheme.info),
        ]);
    }

    // Line 2: selection context
    let mut line2_spans = vec![];
    match app.selection.borrow().as_ref() {
        Some(node) => {
            let expandable = node.has_children_hint;
            line2_spans.extend(vec![
                Span::styled(l.selection_caret, scheme.stat_selection),
                Span::styled(
                    node.display_name().to_string(),
                    scheme.node_style(NodeKind::Real, expandable),
                ),
                Span::styled(" ", Style::default()),
                Span::styled(node.dn.to_string(), scheme.stat_selection),
            ]);
        }
        None => line2_spans.push(Span::styled(l.no_selection, scheme.info)),
    }

    let header = Paragraph::new(vec![Line::from(line1_spans), Line::from(line2_spans)]).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(scheme.border),
    );

    frame.render_widget(header, area);
}

/// Render the bottom help bar showing the keyboard shortcuts.
pub(crate) fn render_footer(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    scheme: &ColorScheme,
    labels: &Labels,
) {
    let footer = Paragraph::new(labels.footer_help_text)
        .style(scheme.footer_help)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, area);
}
