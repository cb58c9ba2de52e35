/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Tests that drive `App` against the in-memory sample directory
//! (App + cursor + controller + render).

use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use dit_browser::DirectoryError;
use dit_browser::NodeKey;
use dit_browser::TreeEvent;
use dit_browser::memory::InMemoryDirectory;
use dit_browser::memory::Op;
use dit_browser::synthetic::TreeItem;
use futures::FutureExt;
use ratatui::backend::TestBackend;
use reqwest::StatusCode;

use super::*;
use crate::client::HttpDirectory;
use crate::client::base_url;
use crate::client::parse_addr;
use crate::client::status_error;
use crate::render::ui;

const BASE: &str = "dc=example,dc=com";
const PEOPLE: &str = "ou=people,dc=example,dc=com";

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

/// Apply completions until nothing is in flight.
async fn settle(app: &mut App) -> Vec<TreeEvent> {
    let mut events = Vec::new();
    while app.controller.in_flight() > 0 {
        let Some(completion) = app.controller.next_completion().await else {
            break;
        };
        events.push(app.on_completion(completion));
    }
    events
}

/// The sample directory, loaded at the Root DSE.
async fn sample_app() -> (Arc<InMemoryDirectory>, App) {
    let dir = Arc::new(sample_directory());
    let mut controller = RootController::new(dir.clone(), BrowserConfig::default());
    controller.load_root_with_naming_contexts(false);
    let mut app = App::new("test".to_string(), controller, ThemeName::Nord);
    settle(&mut app).await;
    (dir, app)
}

/// Put the cursor on `key` and activate it.
fn activate(app: &mut App, key: &NodeKey) -> KeyResult {
    let pos = app
        .visible_rows()
        .position(key)
        .unwrap_or_else(|| panic!("{key} not visible"));
    app.cursor.set_pos(pos);
    app.on_key(self::key(KeyCode::Enter))
}

/// Sample app with the Root DSE, the base and `ou=people` open.
async fn people_open() -> (Arc<InMemoryDirectory>, App) {
    let (dir, mut app) = sample_app().await;
    activate(&mut app, &NodeKey::RootDse);
    activate(&mut app, &NodeKey::entry(BASE));
    settle(&mut app).await;
    activate(&mut app, &NodeKey::entry(PEOPLE));
    settle(&mut app).await;
    (dir, app)
}

fn position_of(app: &App, pred: impl Fn(&TreeItem) -> bool) -> Option<usize> {
    app.visible_rows()
        .as_slice()
        .iter()
        .position(|row| pred(&row.node.item))
}

// Cursor movement is clamped to the list.
#[test]
fn cursor_movement_is_clamped() {
    let mut cursor = Cursor::new(3);
    assert!(!cursor.move_up());
    assert!(cursor.move_down());
    assert!(cursor.move_down());
    assert!(!cursor.move_down());
    assert_eq!(cursor.pos(), 2);

    assert!(cursor.home());
    assert!(!cursor.home());
    assert!(cursor.page_down(PAGE_STEP));
    assert_eq!(cursor.pos(), 2);
    assert!(cursor.page_up(PAGE_STEP));
    assert_eq!(cursor.pos(), 0);
    assert!(cursor.end());
    assert!(!cursor.end());
}

// Shrinking the list pulls the cursor back in range.
#[test]
fn cursor_update_len_clamps_position() {
    let mut cursor = Cursor::new(10);
    cursor.set_pos(8);
    cursor.update_len(4);
    assert_eq!(cursor.pos(), 3);
    assert_eq!(cursor.len(), 4);
    cursor.update_len(0);
    assert_eq!(cursor.pos(), 0);
    cursor.set_pos(5);
    assert_eq!(cursor.pos(), 0);
}

// Keys on a tree that was never loaded change nothing.
#[tokio::test]
async fn keys_on_an_empty_tree_are_noops() {
    let controller = RootController::new(Arc::new(sample_directory()), BrowserConfig::default());
    let mut app = App::new("test".to_string(), controller, ThemeName::Nord);
    assert_eq!(app.visible_rows().len(), 0);
    for code in [
        KeyCode::Char('j'),
        KeyCode::Char('k'),
        KeyCode::Char('G'),
        KeyCode::Enter,
        KeyCode::Char('R'),
        KeyCode::Char('r'),
    ] {
        assert_eq!(app.on_key(key(code)), KeyResult::None, "{code:?}");
    }
    assert_eq!(app.controller.in_flight(), 0);
    assert!(!app.should_quit);
}

// q and Ctrl-C quit.
#[tokio::test]
async fn quit_keys() {
    let (_dir, mut app) = sample_app().await;
    app.on_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);

    let (_dir, mut app) = sample_app().await;
    app.on_key(ctrl('c'));
    assert!(app.should_quit);
}

// The Root DSE starts collapsed and Enter reveals the naming context.
#[tokio::test]
async fn root_dse_expands_on_enter() {
    let (_dir, mut app) = sample_app().await;
    assert_eq!(app.visible_rows().len(), 1);
    assert_eq!(app.selected_key(), Some(NodeKey::RootDse));
    assert_eq!(app.status.as_deref(), Some("1 naming contexts"));

    assert_eq!(app.on_key(key(KeyCode::Enter)), KeyResult::TreeChanged);
    assert_eq!(app.controller.in_flight(), 0);
    let rows = app.visible_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.get(1).map(|r| &r.node.key), Some(&NodeKey::entry(BASE)));
}

// Expanding an entry fetches its children and keeps the cursor on it.
#[tokio::test]
async fn expanding_an_entry_fetches_children() {
    let (_dir, mut app) = sample_app().await;
    activate(&mut app, &NodeKey::RootDse);
    assert_eq!(
        activate(&mut app, &NodeKey::entry(BASE)),
        KeyResult::TreeChanged
    );
    assert!(app.controller.is_loading(&NodeKey::entry(BASE)));

    settle(&mut app).await;
    assert_eq!(
        app.status.as_deref(),
        Some("5 entries under dc=example,dc=com (page 1)")
    );
    assert_eq!(app.visible_rows().len(), 7);
    assert_eq!(app.selected_key(), Some(NodeKey::entry(BASE)));
    assert_eq!(app.cursor.len(), 7);
}

// Enter on an expanded entry collapses it.
#[tokio::test]
async fn enter_toggles_loaded_entry() {
    let (dir, mut app) = people_open().await;
    let browses = dir.call_count(Op::Browse);
    let people = NodeKey::entry(PEOPLE);

    activate(&mut app, &people);
    assert!(app.visible_rows().len() < 10);
    activate(&mut app, &people);
    assert!(app.visible_rows().len() > 100);
    assert_eq!(dir.call_count(Op::Browse), browses);
}

// Activating Next Page parks the cursor on the parent and loads page 2.
#[tokio::test]
async fn page_control_turns_page() {
    let (dir, mut app) = people_open().await;
    let people = NodeKey::entry(PEOPLE);
    assert_eq!(app.controller.cursors().get(&people), Some(0));

    let next = position_of(&app, |item| matches!(item, TreeItem::PaginationNext { .. }))
        .expect("next page row");
    app.cursor.set_pos(next);
    assert_eq!(app.on_key(key(KeyCode::Enter)), KeyResult::TreeChanged);
    assert_eq!(app.selected_key(), Some(people.clone()));

    settle(&mut app).await;
    assert_eq!(app.controller.cursors().get(&people), Some(1));
    assert_eq!(
        app.status.as_deref(),
        Some("100 entries under ou=people,dc=example,dc=com (page 2)")
    );
    assert!(position_of(&app, |item| matches!(item, TreeItem::PaginationPrev { .. })).is_some());
    assert_eq!(dir.browse_calls().last().map(|c| c.page), Some(1));
}

// Moving the cursor over a page control does not page.
#[tokio::test]
async fn moving_over_page_control_does_not_page() {
    let (dir, mut app) = people_open().await;
    let browses = dir.call_count(Op::Browse);
    let next = position_of(&app, |item| matches!(item, TreeItem::PaginationNext { .. }))
        .expect("next page row");

    app.cursor.set_pos(next - 1);
    assert_eq!(
        app.on_key(key(KeyCode::Char('j'))),
        KeyResult::SelectionChanged
    );
    app.publish_selection();
    assert_eq!(app.controller.in_flight(), 0);
    assert_eq!(dir.call_count(Op::Browse), browses);
    assert_eq!(
        app.controller.cursors().get(&NodeKey::entry(PEOPLE)),
        Some(0)
    );
}

// Entries under the cursor are published to selection subscribers.
#[tokio::test]
async fn selection_is_published_for_entries() {
    let (_dir, mut app) = sample_app().await;
    activate(&mut app, &NodeKey::RootDse);
    assert!(app.selection.borrow().is_none());

    assert_eq!(
        app.on_key(key(KeyCode::Down)),
        KeyResult::SelectionChanged
    );
    app.publish_selection();
    let selected = app.selection.borrow().clone();
    assert_eq!(selected.map(|n| n.dn), Some(Dn::from(BASE)));
}

// A permission failure shows the access-denied message until Esc.
#[tokio::test]
async fn failure_sets_error_until_dismissed() {
    let (dir, mut app) = sample_app().await;
    activate(&mut app, &NodeKey::RootDse);
    activate(&mut app, &NodeKey::entry(BASE));
    settle(&mut app).await;

    dir.fail_next(
        Op::Browse,
        Some(Dn::from(PEOPLE)),
        DirectoryError::Permission("insufficient access".into()),
        1,
    );
    activate(&mut app, &NodeKey::entry(PEOPLE));
    let events = settle(&mut app).await;
    assert!(matches!(events.as_slice(), [TreeEvent::Failed { .. }]));
    let error = app.error.clone().expect("error shown");
    assert!(error.contains("Access denied"), "{error}");

    app.on_key(key(KeyCode::Esc));
    assert!(app.error.is_none());
}

// Collapse-all keeps the cursor inside the shrunken row list.
#[tokio::test]
async fn collapse_all_keeps_cursor_in_range() {
    let (_dir, mut app) = people_open().await;
    app.on_key(key(KeyCode::Char('G')));
    assert!(app.cursor.pos() > 100);

    assert_eq!(app.on_key(key(KeyCode::Char('c'))), KeyResult::TreeChanged);
    assert_eq!(app.visible_rows().len(), 1);
    assert_eq!(app.cursor.len(), 1);
    assert_eq!(app.cursor.pos(), 0);
}

// r reloads from the Root DSE and clears the header.
#[tokio::test]
async fn reload_key_restarts_from_root() {
    let (dir, mut app) = people_open().await;
    app.error = Some("stale".to_string());
    let contexts = dir.call_count(Op::NamingContexts);

    assert_eq!(app.on_key(key(KeyCode::Char('r'))), KeyResult::TreeChanged);
    assert!(app.error.is_none());
    settle(&mut app).await;
    assert_eq!(dir.call_count(Op::NamingContexts), contexts + 1);
    assert_eq!(app.visible_rows().len(), 1);
    assert_eq!(app.cursor.pos(), 0);
    assert!(app.controller.cursors().is_empty());
}

// R re-fetches the children of the selected entry.
#[tokio::test]
async fn reload_children_key_refetches() {
    let (dir, mut app) = people_open().await;
    let browses = dir.call_count(Op::Browse);
    let pos = app
        .visible_rows()
        .position(&NodeKey::entry(PEOPLE))
        .expect("people row");
    app.cursor.set_pos(pos);

    assert_eq!(app.on_key(key(KeyCode::Char('R'))), KeyResult::TreeChanged);
    settle(&mut app).await;
    assert_eq!(dir.call_count(Op::Browse), browses + 1);
    assert_eq!(app.selected_key(), Some(NodeKey::entry(PEOPLE)));
}

// Scrolling follows the cursor past the viewport.
#[tokio::test]
async fn scroll_follows_cursor() {
    let (_dir, mut app) = people_open().await;
    app.tree_viewport_height = 10;
    app.on_key(key(KeyCode::Char('g')));
    app.on_key(key(KeyCode::PageDown));
    app.on_key(key(KeyCode::PageDown));
    assert_eq!(app.cursor.pos(), 20);
    assert_eq!(app.tree_scroll_offset, 11);

    app.on_key(key(KeyCode::Char('g')));
    assert_eq!(app.tree_scroll_offset, 0);
}

// A frame renders the tree, the details and the footer.
#[tokio::test]
async fn renders_a_frame() {
    let (_dir, mut app) = sample_app().await;
    activate(&mut app, &NodeKey::RootDse);
    app.on_key(key(KeyCode::Down));
    app.publish_selection();

    let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
    terminal.draw(|frame| ui(frame, &app)).unwrap();
    let text: String = terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|cell| cell.symbol())
        .collect();
    assert!(text.contains("Root DSE"));
    assert!(text.contains("dc=example"));
    assert!(text.contains("objectClass"));
    assert!(text.contains("q: quit"));
}

// Addresses without a scheme default to plain HTTP.
#[test]
fn addr_parsing() {
    assert_eq!(parse_addr("host:1"), (None, "host:1"));
    assert_eq!(parse_addr("https://host:1"), (Some("https"), "host:1"));
    assert_eq!(base_url("host:1"), "http://host:1");
    assert_eq!(base_url("https://host:1/"), "https://host:1");
}

// A browse after a paging-state clear waits until the clear is done.
#[tokio::test]
async fn browse_waits_for_paging_state_clear() {
    let http = HttpDirectory::connect("127.0.0.1:1").unwrap();
    http.wait_for_clear().await;

    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    http.track_clear(
        async move {
            let _ = done_rx.await;
        }
        .boxed(),
    );
    let waiting = http.wait_for_clear();
    tokio::pin!(waiting);
    assert!(futures::poll!(&mut waiting).is_pending());
    assert!(futures::poll!(&mut waiting).is_pending());

    done_tx.send(()).unwrap();
    waiting.await;
    // A finished clear no longer holds anyone up.
    http.wait_for_clear().await;
}

// `--demo` serves the sample directory, optionally slowed down.
#[tokio::test]
async fn demo_args_build_a_sample_service() {
    let args = Args::try_parse_from(["dit_tui", "--demo", "--demo-latency-ms", "5"]).unwrap();
    assert_eq!(args.demo_latency_ms, Some(5));
    let (service, source) = directory_service(&args).unwrap();
    assert_eq!(source, Labels::en().demo_source);
    assert_eq!(service.naming_contexts().await.unwrap().len(), 1);

    assert!(Args::try_parse_from(["dit_tui", "--demo-latency-ms", "5"]).is_err());
}

// HTTP statuses map onto the directory error taxonomy.
#[test]
fn http_status_mapping() {
    let dn = Dn::from(PEOPLE);
    assert!(matches!(
        status_error(StatusCode::FORBIDDEN, Some(&dn)),
        DirectoryError::Permission(_)
    ));
    assert!(matches!(
        status_error(StatusCode::UNAUTHORIZED, None),
        DirectoryError::Permission(_)
    ));
    assert_eq!(
        status_error(StatusCode::NOT_FOUND, Some(&dn)),
        DirectoryError::NotFound(dn)
    );
    assert!(matches!(
        status_error(StatusCode::NOT_FOUND, None),
        DirectoryError::MalformedResponse(_)
    ));
    assert!(matches!(
        status_error(StatusCode::BAD_GATEWAY, None),
        DirectoryError::Connectivity(_)
    ));
}
