/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::io;

use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use dit_browser::DirectoryNode;
use dit_browser::ExpandOutcome;
use dit_browser::NodeKey;
use dit_browser::RootController;
use dit_browser::TreeEvent;
use dit_browser::expansion::Completion;
use dit_browser::tree::VisibleRows;
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::watch;

use crate::Cursor;
use crate::KeyResult;
use crate::PAGE_STEP;
use crate::Theme;
use crate::ThemeName;
use crate::render::ui;

// Application state

/// Runtime state for the directory browser.
///
/// `App` owns the [`RootController`] (and through it the tree cache)
/// plus the purely visual state: cursor, scroll position, and the
/// last status or error message.
pub(crate) struct App {
    /// Where the entries come from (gateway URL or the sample
    /// directory), shown in the header.
    pub(crate) source: String,
    pub(crate) controller: RootController,
    /// Latest real entry the user selected.
    pub(crate) selection: watch::Receiver<Option<DirectoryNode>>,
    pub(crate) cursor: Cursor,
    /// First visible row of the tree pane.
    pub(crate) tree_scroll_offset: usize,
    /// Rows the tree pane can show; set from the terminal size before
    /// each draw.
    pub(crate) tree_viewport_height: usize,
    /// Outcome of the last completed fetch.
    pub(crate) status: Option<String>,
    /// Last failure; shown in place of the header until dismissed.
    pub(crate) error: Option<String>,
    pub(crate) theme: Theme,
    pub(crate) theme_name: ThemeName,
    pub(crate) should_quit: bool,
}

impl App {
    pub(crate) fn new(source: String, controller: RootController, theme_name: ThemeName) -> Self {
        let selection = controller.subscribe();
        let len = controller.visible_rows().len();
        Self {
            source,
            controller,
            selection,
            cursor: Cursor::new(len),
            tree_scroll_offset: 0,
            tree_viewport_height: 20,
            status: None,
            error: None,
            theme: Theme::new(theme_name),
            theme_name,
            should_quit: false,
        }
    }

    pub(crate) fn visible_rows(&self) -> VisibleRows<'_> {
        self.controller.visible_rows()
    }

    /// Key of the row under the cursor.
    pub(crate) fn selected_key(&self) -> Option<NodeKey> {
        self.visible_rows()
            .get(self.cursor.pos())
            .map(|row| row.node.key.clone())
    }

    /// Resize the cursor to the visible rows, keeping it on `key` if
    /// that row is still shown.
    fn resync_cursor(&mut self, key: Option<&NodeKey>) {
        let rows = self.visible_rows();
        let len = rows.len();
        let pos = key.and_then(|k| rows.position(k));
        self.cursor.update_len(len);
        if let Some(pos) = pos {
            self.cursor.set_pos(pos);
        }
        self.ensure_cursor_visible();
    }

    /// Forward the row under the cursor to selection subscribers.
    ///
    /// Only real entries are forwarded: passing over a page control
    /// or the Root DSE with the cursor must not page or expand.
    pub(crate) fn publish_selection(&mut self) {
        if let Some(key @ NodeKey::Entry(_)) = self.selected_key() {
            self.controller.select(&key);
        }
    }

    /// Act on the row under the cursor: toggle a node, or turn the
    /// page for a page control.
    fn activate(&mut self) -> KeyResult {
        let rows = self.visible_rows();
        let Some(row) = rows.get(self.cursor.pos()) else {
            return KeyResult::None;
        };
        let key = row.node.key.clone();
        let page_control = row.node.item.is_page_control();
        let toggles = row.node.has_affordance();
        drop(rows);

        if page_control {
            let parent = self.controller.cache().parent_key(&key);
            if !self.controller.activate_pagination(&key) {
                return KeyResult::None;
            }
            // The control is replaced when the page lands; park the
            // cursor on the paginated parent.
            self.resync_cursor(parent.as_ref());
            return KeyResult::TreeChanged;
        }
        if toggles && self.controller.toggle(&key) != ExpandOutcome::Ignored {
            self.resync_cursor(Some(&key));
            return KeyResult::TreeChanged;
        }
        KeyResult::None
    }

    /// Apply a finished fetch and report it in the header.
    pub(crate) fn on_completion(&mut self, completion: Completion) -> TreeEvent {
        let key = self.selected_key();
        let event = self.controller.apply(completion);
        self.resync_cursor(key.as_ref());
        self.note_event(&event);
        event
    }

    fn note_event(&mut self, event: &TreeEvent) {
        match event {
            TreeEvent::Loaded {
                key, count, page, ..
            } => {
                self.status = Some(format!(
                    "{} entries under {} (page {})",
                    count,
                    key,
                    page + 1
                ));
            }
            TreeEvent::Empty { key } => {
                self.status = Some(format!("{} has no children", key));
            }
            TreeEvent::Failed { error, .. } => {
                self.error = Some(error.user_message());
            }
            TreeEvent::Pruned { key, .. } => {
                self.error = Some(format!("{} no longer exists and was removed", key));
            }
            TreeEvent::NamingContextsLoaded { count } => {
                self.status = Some(format!("{} naming contexts", count));
            }
            TreeEvent::RootsLoaded {
                count,
                more_available,
            } => {
                self.status = Some(if *more_available {
                    format!("{} top-level entries (more not shown)", count)
                } else {
                    format!("{} top-level entries", count)
                });
            }
            TreeEvent::Discarded { .. } => {}
        }
    }

    /// Adjust scroll offset so the cursor stays inside the viewport.
    pub(crate) fn ensure_cursor_visible(&mut self) {
        let pos = self.cursor.pos();
        if pos < self.tree_scroll_offset {
            self.tree_scroll_offset = pos;
        } else if pos >= self.tree_scroll_offset + self.tree_viewport_height {
            self.tree_scroll_offset =
                pos.saturating_sub(self.tree_viewport_height.saturating_sub(1));
        }
    }

    fn moved(&mut self, changed: bool) -> KeyResult {
        if changed {
            self.ensure_cursor_visible();
            KeyResult::SelectionChanged
        } else {
            KeyResult::None
        }
    }

    /// Handle a single keypress and update in-memory UI state.
    pub(crate) fn on_key(&mut self, key: KeyEvent) -> KeyResult {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                KeyResult::None
            }
            KeyCode::Char('c') if ctrl => {
                self.should_quit = true;
                KeyResult::None
            }
            KeyCode::Char('d') if ctrl => {
                let changed = self.cursor.page_down(PAGE_STEP);
                self.moved(changed)
            }
            KeyCode::Char('u') if ctrl => {
                let changed = self.cursor.page_up(PAGE_STEP);
                self.moved(changed)
            }
            KeyCode::Char('l') if ctrl => {
                // Scroll selected row to the top.
                self.tree_scroll_offset = self.cursor.pos();
                KeyResult::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let changed = self.cursor.move_up();
                self.moved(changed)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let changed = self.cursor.move_down();
                self.moved(changed)
            }
            KeyCode::Home | KeyCode::Char('g') => {
                let changed = self.cursor.home();
                self.moved(changed)
            }
            KeyCode::End | KeyCode::Char('G') => {
                let changed = self.cursor.end();
                self.moved(changed)
            }
            KeyCode::PageDown => {
                let changed = self.cursor.page_down(PAGE_STEP);
                self.moved(changed)
            }
            KeyCode::PageUp => {
                let changed = self.cursor.page_up(PAGE_STEP);
                self.moved(changed)
            }
            KeyCode::Enter | KeyCode::Tab | KeyCode::Char(' ') => self.activate(),
            KeyCode::Char('c') => {
                let key = self.selected_key();
                self.controller.collapse_all();
                self.resync_cursor(key.as_ref());
                KeyResult::TreeChanged
            }
            KeyCode::Char('r') => {
                if !self.controller.reload() {
                    return KeyResult::None;
                }
                self.error = None;
                self.status = None;
                self.cursor.home();
                self.resync_cursor(None);
                KeyResult::TreeChanged
            }
            KeyCode::Char('R') => {
                let Some(key) = self.selected_key() else {
                    return KeyResult::None;
                };
                match self.controller.reload_children(&key) {
                    ExpandOutcome::Ignored => KeyResult::None,
                    _ => {
                        self.resync_cursor(Some(&key));
                        KeyResult::TreeChanged
                    }
                }
            }
            KeyCode::Esc => {
                self.error = None;
                KeyResult::None
            }
            _ => KeyResult::None,
        }
    }
}

/// Drive the main event loop.
///
/// Renders, then waits for either a keypress or a finished fetch.
/// Completions are applied here, on the loop that owns the cache.
pub(crate) async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    let mut events = EventStream::new();

    loop {
        // Body area is terminal height minus header (3 rows) and
        // footer (2 rows).
        let terminal_size = terminal.size()?;
        app.tree_viewport_height = terminal_size.height.saturating_sub(5) as usize;

        terminal.draw(|frame| ui(frame, &app))?;

        tokio::select! {
            Some(completion) = app.controller.next_completion() => {
                app.on_completion(completion);
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => match app.on_key(key) {
                        KeyResult::SelectionChanged | KeyResult::TreeChanged => {
                            app.publish_selection();
                        }
                        KeyResult::None => {}
                    },
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

