/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::path::PathBuf;

use clap::Parser;
use clap::ValueEnum;
use dit_browser::NodeKind;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;

/// Selectable color theme.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum ThemeName {
    /// Nord: an arctic, north-bluish color palette.
    #[default]
    Nord,
    /// doom-nord-light: desaturated Nord accents for light backgrounds.
    DoomNordLight,
}

impl std::fmt::Display for ThemeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThemeName::Nord => write!(f, "nord"),
            ThemeName::DoomNordLight => write!(f, "doom-nord-light"),
        }
    }
}

/// Command-line arguments for the directory browser.
#[derive(Debug, Parser)]
#[command(name = "dit-tui", about = "TUI browser for a remote directory tree")]
pub(crate) struct Args {
    /// Directory gateway address (e.g., 127.0.0.1:8389)
    #[arg(long, short, required_unless_present = "demo")]
    pub(crate) addr: Option<String>,

    /// Browse beneath this base DN instead of the Root DSE
    #[arg(long, short)]
    pub(crate) base_dn: Option<String>,

    /// Include the server's private naming contexts under the Root DSE
    #[arg(long)]
    pub(crate) private: bool,

    /// Children per page (overrides DIT_BROWSER_PAGE_SIZE)
    #[arg(long)]
    pub(crate) page_size: Option<u32>,

    /// Connection identifier for server-side paging state
    /// (overrides DIT_BROWSER_CONNECTION_ID)
    #[arg(long)]
    pub(crate) connection_id: Option<String>,

    /// Browse a built-in sample directory instead of a server
    #[arg(long)]
    pub(crate) demo: bool,

    /// Delay every sample-directory call by this many milliseconds
    #[arg(long, requires = "demo")]
    pub(crate) demo_latency_ms: Option<u64>,

    /// Write logs to this file (the terminal belongs to the UI)
    #[arg(long)]
    pub(crate) log_file: Option<PathBuf>,

    /// Color theme
    #[arg(long, default_value_t = ThemeName::Nord, value_enum)]
    pub(crate) theme: ThemeName,
}

/// All user-visible text in the TUI.
pub(crate) struct Labels {
    // Header
    pub(crate) app_name: &'static str,
    pub(crate) separator: &'static str,
    pub(crate) selection_caret: &'static str,
    pub(crate) loading_icon: &'static str,
    pub(crate) no_selection: &'static str,
    pub(crate) demo_source: &'static str,
    pub(crate) entries: &'static str,

    // Detail pane
    pub(crate) dn: &'static str,
    pub(crate) object_classes: &'static str,
    pub(crate) children: &'static str,
    pub(crate) page: &'static str,
    pub(crate) state: &'static str,
    pub(crate) expandable: &'static str,
    pub(crate) leaf: &'static str,
    pub(crate) attributes: &'static str,
    pub(crate) paging_hint: &'static str,
    pub(crate) placeholder_hint: &'static str,
    pub(crate) root_hint: &'static str,

    // Pane titles
    pub(crate) pane_tree: &'static str,
    pub(crate) pane_details: &'static str,
    pub(crate) pane_entry: &'static str,

    // Footer
    pub(crate) footer_help_text: &'static str,
}

impl Labels {
    pub(crate) fn en() -> Self {
        Self {
            app_name: "dit-browser",
            separator: " • ",
            selection_caret: "▸ ",
            loading_icon: "⟳ ",
            no_selection: "No selection",
            demo_source: "sample directory",
            entries: "entries: ",
            dn: "DN: ",
            object_classes: "Object classes: ",
            children: "Children: ",
            page: "Page: ",
            state: "State: ",
            expandable: "expandable",
            leaf: "leaf",
            attributes: "Attributes",
            paging_hint: "Press Enter to change page",
            placeholder_hint: "Children not loaded yet",
            root_hint: "Server root; expand to list naming contexts",
            pane_tree: "Directory",
            pane_details: "Details",
            pane_entry: "Entry",
            footer_help_text: "q: quit | j/k: navigate | g/G: top/bottom | Tab/Enter: expand/collapse or page | c: collapse all | r: reload | R: reload children",
        }
    }
}

/// Color scheme for the TUI.
pub(crate) struct ColorScheme {
    // UI chrome
    pub(crate) app_name: Style,
    pub(crate) border: Style,

    // Node kinds (tree rendering)
    pub(crate) node_root: Style,
    pub(crate) node_entry: Style,
    pub(crate) node_container: Style,
    pub(crate) node_paging: Style,
    pub(crate) node_info: Style,
    pub(crate) node_placeholder: Style,

    // Semantic states
    pub(crate) error: Style,
    pub(crate) info: Style,

    // Header stats
    pub(crate) stat_timing: Style,
    pub(crate) stat_selection: Style,
    pub(crate) stat_url: Style,
    pub(crate) stat_label: Style,

    // Detail pane and misc
    pub(crate) detail_label: Style,
    pub(crate) detail_value: Style,
    pub(crate) footer_help: Style,
}

impl ColorScheme {
    /// Nord color scheme (https://www.nordtheme.com/).
    pub(crate) fn nord() -> Self {
        let polar3 = Color::Rgb(76, 86, 106); // #4C566A
        let snow0 = Color::Rgb(216, 222, 233); // #D8DEE9
        let snow2 = Color::Rgb(236, 239, 244); // #ECEFF4
        let frost_teal = Color::Rgb(143, 188, 187); // #8FBCBB
        let frost_cyan = Color::Rgb(136, 192, 208); // #88C0D0
        let frost_blue = Color::Rgb(129, 161, 193); // #81A1C1
        let aurora_red = Color::Rgb(191, 97, 106); // #BF616A
        let aurora_yellow = Color::Rgb(235, 203, 139); // #EBCB8B
        let aurora_green = Color::Rgb(163, 190, 140); // #A3BE8C
        let aurora_purple = Color::Rgb(180, 142, 173); // #B48EAD

        Self {
            app_name: Style::default().fg(frost_cyan).add_modifier(Modifier::BOLD),
            border: Style::default().fg(polar3),

            node_root: Style::default().fg(frost_teal),
            node_entry: Style::default().fg(frost_blue),
            node_container: Style::default().fg(aurora_green),
            node_paging: Style::default().fg(aurora_yellow),
            node_info: Style::default().fg(polar3),
            node_placeholder: Style::default()
                .fg(polar3)
                .add_modifier(Modifier::ITALIC),

            error: Style::default().fg(aurora_red),
            info: Style::default().fg(frost_cyan),

            stat_timing: Style::default().fg(aurora_yellow),
            stat_selection: Style::default().fg(aurora_purple),
            stat_url: Style::default().fg(polar3),
            stat_label: Style::default().fg(snow0),

            detail_label: Style::default().fg(snow0),
            detail_value: Style::default().fg(snow2),
            footer_help: Style::default().fg(polar3),
        }
    }

    /// doom-nord-light color scheme.
    pub(crate) fn doom_nord_light() -> Self {
        let base7 = Color::Rgb(96, 114, 140); // #60728C
        let fg = Color::Rgb(59, 66, 82); // #3B4252
        let fg_alt = Color::Rgb(46, 52, 64); // #2E3440
        let red = Color::Rgb(153, 50, 75); // #99324B
        let green = Color::Rgb(79, 137, 76); // #4F894C
        let yellow = Color::Rgb(154, 117, 0); // #9A7500
        let blue = Color::Rgb(59, 110, 168); // #3B6EA8
        let teal = Color::Rgb(41, 131, 141); // #29838D
        let cyan = Color::Rgb(57, 142, 172); // #398EAC
        let violet = Color::Rgb(132, 40, 121); // #842879

        Self {
            app_name: Style::default().fg(teal).add_modifier(Modifier::BOLD),
            border: Style::default().fg(base7),

            node_root: Style::default().fg(teal),
            node_entry: Style::default().fg(blue),
            node_container: Style::default().fg(green),
            node_paging: Style::default().fg(yellow),
            node_info: Style::default().fg(base7),
            node_placeholder: Style::default().fg(base7).add_modifier(Modifier::ITALIC),

            error: Style::default().fg(red),
            info: Style::default().fg(cyan),

            stat_timing: Style::default().fg(yellow),
            stat_selection: Style::default().fg(violet),
            stat_url: Style::default().fg(base7),
            stat_label: Style::default().fg(fg),

            detail_label: Style::default().fg(fg),
            detail_value: Style::default().fg(fg_alt),
            footer_help: Style::default().fg(base7),
        }
    }

    /// Return the style for a row of the given kind. Real entries
    /// that can be expanded render as containers.
    pub(crate) fn node_style(&self, kind: NodeKind, expandable: bool) -> Style {
        match kind {
            NodeKind::Root => self.node_root,
            NodeKind::Real if expandable => self.node_container,
            NodeKind::Real => self.node_entry,
            NodeKind::PaginationPrev | NodeKind::PaginationNext => self.node_paging,
            NodeKind::PaginationInfo => self.node_info,
            NodeKind::Placeholder => self.node_placeholder,
        }
    }
}

/// Complete visual presentation: colors + text.
pub(crate) struct Theme {
    pub(crate) scheme: ColorScheme,
    pub(crate) labels: Labels,
}

impl Theme {
    pub(crate) fn new(theme_name: ThemeName) -> Self {
        let scheme = match theme_name {
            ThemeName::Nord => ColorScheme::nord(),
            ThemeName::DoomNordLight => ColorScheme::doom_nord_light(),
        };
        Self {
            scheme,
            labels: Labels::en(),
        }
    }
}
