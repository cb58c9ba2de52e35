/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Tests that drive the controllers end to end against an
//! [`InMemoryDirectory`]. Per-module unit tests live in each module's
//! own `#[cfg(test)] mod tests` block.

use std::sync::Arc;

use crate::cache::LoadState;
use crate::config::BrowserConfig;
use crate::expansion::ExpandOutcome;
use crate::expansion::TreeEvent;
use crate::memory::InMemoryDirectory;
use crate::memory::Op;
use crate::memory::sample_directory;
use crate::node::DirectoryNode;
use crate::node::Dn;
use crate::node::OBJECT_CLASS;
use crate::root::RootController;
use crate::service::DirectoryError;
use crate::synthetic::NodeKey;
use crate::synthetic::NodeKind;
use crate::tree::TreeNode;
use crate::tree::collect_expanded;
use crate::tree::fold_tree;

const BASE: &str = "dc=example,dc=com";
const PEOPLE: &str = "ou=people,dc=example,dc=com";

/// `BASE` with an `ou=people` holding `people` inetOrgPersons and an
/// `ou=groups` holding one group.
fn directory(people: usize) -> Arc<InMemoryDirectory> {
    let dir = InMemoryDirectory::new();
    let base = Dn::from(BASE);
    let people_dn = Dn::from(PEOPLE);
    let groups_dn = Dn::from("ou=groups,dc=example,dc=com");
    dir.insert(
        None,
        DirectoryNode::new(BASE).with_attribute(OBJECT_CLASS, "domain"),
    );
    for dn in [&people_dn, &groups_dn] {
        dir.insert(
            Some(&base),
            DirectoryNode::new(dn.clone()).with_attribute(OBJECT_CLASS, "organizationalUnit"),
        );
    }
    dir.insert(
        Some(&groups_dn),
        DirectoryNode::new("cn=staff,ou=groups,dc=example,dc=com")
            .with_attribute(OBJECT_CLASS, "groupOfNames"),
    );
    for i in 0..people {
        dir.insert(
            Some(&people_dn),
            DirectoryNode::new(format!("uid=u{},{}", i, PEOPLE))
                .with_attribute(OBJECT_CLASS, "inetOrgPerson")
                .with_attribute("uid", &format!("u{}", i)),
        );
    }
    dir.add_naming_context(BASE);
    Arc::new(dir)
}

/// A controller seeded with `BASE`'s children as top-level rows.
async fn loaded(dir: &Arc<InMemoryDirectory>) -> RootController {
    let mut ctl = RootController::new(dir.clone(), BrowserConfig::default());
    ctl.load_roots(Dn::from(BASE));
    ctl.settle().await;
    ctl
}

fn children<'a>(ctl: &'a RootController, key: &NodeKey) -> &'a [TreeNode] {
    &ctl.cache().get(key).unwrap().children
}

fn count_kind(ctl: &RootController, key: &NodeKey, kind: NodeKind) -> usize {
    children(ctl, key)
        .iter()
        .filter(|c| c.item.kind() == kind)
        .count()
}

fn find_kind(ctl: &RootController, key: &NodeKey, kind: NodeKind) -> NodeKey {
    children(ctl, key)
        .iter()
        .find(|c| c.item.kind() == kind)
        .map(|c| c.key.clone())
        .unwrap()
}

/// Placeholders are childless and never sit under an empty parent.
fn assert_placeholder_invariant(ctl: &RootController) {
    let cache = ctl.cache();
    fold_tree(cache.root(), &|node: &TreeNode, _: Vec<()>| {
        for child in &node.children {
            if child.item.kind() == NodeKind::Placeholder {
                assert!(child.children.is_empty(), "placeholder under {}", node.key);
                assert_ne!(cache.state(&node.key), LoadState::Empty, "{}", node.key);
            }
        }
    });
}

// First page of a large child set: 100 entries, next + info rows, no
// previous row.
#[tokio::test]
async fn first_page_gets_next_and_info_rows() {
    let dir = directory(150);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);

    assert_eq!(ctl.expand(&people), ExpandOutcome::Dispatched);
    ctl.settle().await;

    assert_eq!(count_kind(&ctl, &people, NodeKind::Real), 100);
    assert_eq!(count_kind(&ctl, &people, NodeKind::PaginationNext), 1);
    assert_eq!(count_kind(&ctl, &people, NodeKind::PaginationInfo), 1);
    assert_eq!(count_kind(&ctl, &people, NodeKind::PaginationPrev), 0);
    let info = children(&ctl, &people).last().unwrap();
    assert_eq!(info.item.label(), "— Page 1 —");

    let call = dir.browse_calls().pop().unwrap();
    assert_eq!((call.dn.as_str(), call.page, call.page_size), (PEOPLE, 0, 100));
    assert_placeholder_invariant(&ctl);
}

// Next page: browse page 1, previous row only, cursor moves to 1.
#[tokio::test]
async fn next_page_replaces_children_and_moves_cursor() {
    let dir = directory(150);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);
    ctl.expand(&people);
    ctl.settle().await;

    let next = find_kind(&ctl, &people, NodeKind::PaginationNext);
    assert!(ctl.activate_pagination(&next));
    assert_eq!(ctl.cache().state(&people), LoadState::Loading);
    ctl.settle().await;

    let call = dir.browse_calls().pop().unwrap();
    assert_eq!((call.dn.as_str(), call.page), (PEOPLE, 1));
    assert_eq!(count_kind(&ctl, &people, NodeKind::Real), 50);
    assert_eq!(count_kind(&ctl, &people, NodeKind::PaginationPrev), 1);
    assert_eq!(count_kind(&ctl, &people, NodeKind::PaginationNext), 0);
    assert_eq!(ctl.cursors().get(&people), Some(1));
    assert!(!ctl.cache().contains(&next));
    // A page change skips the has-children check.
    assert_eq!(dir.call_count(Op::CheckHasChildren), 1);

    let prev = find_kind(&ctl, &people, NodeKind::PaginationPrev);
    ctl.activate_pagination(&prev);
    ctl.settle().await;
    assert_eq!(ctl.cursors().get(&people), Some(0));
    assert_eq!(count_kind(&ctl, &people, NodeKind::Real), 100);
}

// The info row is not a control.
#[tokio::test]
async fn info_row_is_inert() {
    let dir = directory(150);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);
    ctl.expand(&people);
    ctl.settle().await;

    let info = find_kind(&ctl, &people, NodeKind::PaginationInfo);
    assert!(!ctl.activate_pagination(&info));
    assert_eq!(ctl.in_flight(), 0);
    assert_eq!(ctl.cache().state(&people), LoadState::Loaded);
}

// A leaf-typed entry with no children expands to nothing and loses
// its affordance.
#[tokio::test]
async fn leaf_expands_to_empty() {
    let dir = directory(3);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);
    ctl.expand(&people);
    ctl.settle().await;

    let user = NodeKey::entry(format!("uid=u0,{}", PEOPLE));
    assert!(!ctl.cache().get(&user).unwrap().has_affordance());
    ctl.expand(&user);
    assert_eq!(ctl.settle().await, [TreeEvent::Empty { key: user.clone() }]);

    let node = ctl.cache().get(&user).unwrap();
    assert!(node.children.is_empty());
    assert!(!node.has_affordance());
    assert_eq!(ctl.cache().state(&user), LoadState::Empty);
    assert_placeholder_invariant(&ctl);
}

// Reloading the Root DSE with private contexts replaces the first
// materialization.
#[tokio::test]
async fn naming_context_reload_discards_previous_nodes() {
    let dir = Arc::new(sample_directory());
    let mut ctl = RootController::new(dir.clone(), BrowserConfig::default());

    ctl.load_root_with_naming_contexts(false);
    ctl.settle().await;
    ctl.expand(&NodeKey::RootDse);
    ctl.expand(&NodeKey::entry(BASE));
    ctl.settle().await;

    ctl.load_root_with_naming_contexts(true);
    ctl.settle().await;

    assert_eq!(ctl.cache().root().children.len(), 1);
    let contexts: Vec<_> = children(&ctl, &NodeKey::RootDse)
        .iter()
        .map(|c| c.key.to_string())
        .collect();
    assert_eq!(contexts, ["dc=example,dc=com", "cn=config"]);
    // The previously expanded context is back to a placeholder.
    assert_eq!(
        count_kind(&ctl, &NodeKey::entry(BASE), NodeKind::Placeholder),
        1
    );
    assert!(collect_expanded(ctl.cache().root()).is_empty());
}

// A reload issued while the previous one is still in flight wins.
#[tokio::test]
async fn overlapping_reloads_apply_only_the_latest() {
    let dir = Arc::new(sample_directory());
    let mut ctl = RootController::new(dir.clone(), BrowserConfig::default());
    dir.hold();
    ctl.load_root_with_naming_contexts(false);
    ctl.load_root_with_naming_contexts(true);
    dir.open();

    let events = ctl.settle().await;
    assert_eq!(events.len(), 2);
    assert!(events.contains(&TreeEvent::Discarded {
        key: NodeKey::RootDse
    }));
    assert!(events.contains(&TreeEvent::NamingContextsLoaded { count: 2 }));
    assert_eq!(children(&ctl, &NodeKey::RootDse).len(), 2);
}

// clear() empties the cache and cursors and clears server paging
// state exactly once.
#[tokio::test]
async fn clear_resets_everything_once() {
    let dir = directory(150);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);
    ctl.expand(&people);
    ctl.settle().await;
    assert_eq!(ctl.cursors().len(), 1);
    let before = dir.call_count(Op::ClearPagingState);

    ctl.clear();

    assert!(ctl.cache().is_empty());
    assert!(ctl.cursors().is_empty());
    assert_eq!(dir.call_count(Op::ClearPagingState), before + 1);
    assert_eq!(dir.cleared_connections().last().unwrap(), "default");
}

// Repeated reloads never accumulate pagination rows.
#[tokio::test]
async fn pagination_rows_are_regenerated() {
    let dir = directory(150);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);
    ctl.expand(&people);
    ctl.settle().await;

    for _ in 0..3 {
        assert_eq!(ctl.reload_children(&people), ExpandOutcome::Dispatched);
        ctl.settle().await;
        assert_eq!(count_kind(&ctl, &people, NodeKind::PaginationNext), 1);
        assert_eq!(count_kind(&ctl, &people, NodeKind::PaginationInfo), 1);
        assert_eq!(children(&ctl, &people).len(), 102);
    }
}

// Two expands before the fetch lands: one fetch, one transition.
#[tokio::test]
async fn rapid_double_expand_fetches_once() {
    let dir = directory(3);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);
    dir.hold();

    assert_eq!(ctl.expand(&people), ExpandOutcome::Dispatched);
    tokio::task::yield_now().await;
    assert_eq!(ctl.expand(&people), ExpandOutcome::Ignored);
    dir.open();

    let events = ctl.settle().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], TreeEvent::Loaded { count: 3, .. }));
    let browses = dir
        .browse_calls()
        .iter()
        .filter(|c| c.dn.as_str() == PEOPLE)
        .count();
    assert_eq!(browses, 1);
}

// collapseAll + loadRoots leaves exactly the latest top-level result,
// nothing expanded.
#[tokio::test]
async fn collapse_all_then_load_roots_round_trip() {
    let dir = directory(150);
    let mut ctl = loaded(&dir).await;
    for dn in [PEOPLE, "ou=groups,dc=example,dc=com"] {
        ctl.expand(&NodeKey::entry(dn));
    }
    ctl.settle().await;
    assert!(ctl.visible_rows().len() > 100);

    dir.insert(
        Some(&Dn::from(BASE)),
        DirectoryNode::new("ou=hosts,dc=example,dc=com"),
    );
    ctl.collapse_all();
    ctl.load_roots(Dn::from(BASE));
    ctl.settle().await;

    let entries: Vec<_> = ctl
        .cache()
        .entries()
        .iter()
        .map(|e| e.dn.to_string())
        .collect();
    assert_eq!(
        entries,
        [
            PEOPLE,
            "ou=groups,dc=example,dc=com",
            "ou=hosts,dc=example,dc=com"
        ]
    );
    assert!(collect_expanded(ctl.cache().root()).is_empty());
    assert_eq!(ctl.visible_rows().len(), 3);
    assert!(ctl.cursors().is_empty());
}

// A failed page change falls back to UNEXPANDED without a stale
// cursor; the next expand starts from the first page.
#[tokio::test]
async fn failed_page_change_drops_cursor() {
    let dir = directory(150);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);
    ctl.expand(&people);
    ctl.settle().await;

    dir.fail_next(
        Op::Browse,
        Some(Dn::from(PEOPLE)),
        DirectoryError::Connectivity("reset by peer".into()),
        1,
    );
    let next = find_kind(&ctl, &people, NodeKind::PaginationNext);
    ctl.activate_pagination(&next);
    let events = ctl.settle().await;
    assert!(matches!(events[0], TreeEvent::Failed { .. }));

    assert_eq!(ctl.cache().state(&people), LoadState::Unexpanded);
    assert_eq!(ctl.cursors().get(&people), None);
    assert!(!ctl.is_loading(&people));
    assert_eq!(
        children(&ctl, &people)
            .iter()
            .map(|c| c.item.kind())
            .collect::<Vec<_>>(),
        [NodeKind::Placeholder]
    );
    assert_placeholder_invariant(&ctl);

    ctl.expand(&people);
    ctl.settle().await;
    assert_eq!(dir.browse_calls().pop().unwrap().page, 0);
}

// Permission failures revert like connectivity failures but read
// differently.
#[tokio::test]
async fn permission_failure_reverts_with_distinct_message() {
    let dir = directory(3);
    let mut ctl = loaded(&dir).await;
    let groups = NodeKey::entry("ou=groups,dc=example,dc=com");
    dir.fail_next(
        Op::CheckHasChildren,
        None,
        DirectoryError::Permission("insufficientAccessRights".into()),
        1,
    );
    ctl.expand(&groups);
    let events = ctl.settle().await;
    let TreeEvent::Failed { error, .. } = &events[0] else {
        panic!("unexpected {:?}", events);
    };
    assert!(error.user_message().starts_with("Access denied"));
    assert_ne!(
        error.user_message(),
        DirectoryError::Connectivity("insufficientAccessRights".into()).user_message()
    );
    assert_eq!(ctl.cache().state(&groups), LoadState::Unexpanded);
    assert!(ctl.cache().get(&groups).unwrap().has_affordance());
}

// An entry deleted remotely is pruned along with its cached subtree
// and cursor.
#[tokio::test]
async fn removed_entry_is_pruned_on_reload() {
    let dir = directory(150);
    let mut ctl = loaded(&dir).await;
    let people = NodeKey::entry(PEOPLE);
    ctl.expand(&people);
    ctl.settle().await;
    assert_eq!(ctl.cursors().get(&people), Some(0));

    dir.remove(&Dn::from(PEOPLE));
    ctl.reload_children(&people);
    let events = ctl.settle().await;

    assert!(matches!(&events[0], TreeEvent::Pruned { key, .. } if *key == people));
    assert!(!ctl.cache().contains(&people));
    assert!(ctl.cursors().is_empty());
    assert_eq!(ctl.cache().entries().len(), 1);
}

// A child fetch that outlives its parent's page is discarded.
#[tokio::test]
async fn child_fetch_dropped_by_page_change_is_discarded() {
    let dir = directory(150);
    let mut ctl = RootController::new(
        dir.clone(),
        BrowserConfig {
            page_size: 1,
            ..BrowserConfig::default()
        },
    );
    ctl.load_roots(Dn::from(BASE));
    ctl.settle().await;
    // With a page size of 1 only ou=people is on the first page.
    let people = NodeKey::entry(PEOPLE);
    ctl.expand(&people);
    ctl.settle().await;

    let user = NodeKey::entry(format!("uid=u0,{}", PEOPLE));
    ctl.expand(&user);
    let next = find_kind(&ctl, &people, NodeKind::PaginationNext);
    assert!(ctl.activate_pagination(&next));

    // Apply the page change before the child's own fetch.
    let mut completions = Vec::new();
    for _ in 0..2 {
        completions.push(ctl.next_completion().await.unwrap());
    }
    completions.sort_by_key(|c| c.key != people);
    let events: Vec<_> = completions.into_iter().map(|c| ctl.apply(c)).collect();
    assert!(matches!(events[0], TreeEvent::Loaded { page: 1, .. }));
    assert_eq!(events[1], TreeEvent::Discarded { key: user.clone() });
    assert!(!ctl.cache().contains(&user));
    assert!(!ctl.is_loading(&people));
    assert_eq!(ctl.cursors().get(&people), Some(1));
}

// The loading marker never survives a completion, whatever it was.
#[tokio::test]
async fn loading_marker_is_always_cleared() {
    let dir = directory(3);
    let mut ctl = loaded(&dir).await;
    let keys = [
        NodeKey::entry(PEOPLE),
        NodeKey::entry("ou=groups,dc=example,dc=com"),
    ];
    dir.fail_next(
        Op::Browse,
        Some(Dn::from(PEOPLE)),
        DirectoryError::MalformedResponse("bad page".into()),
        1,
    );
    for key in &keys {
        ctl.expand(key);
    }
    ctl.settle().await;

    let loading = fold_tree(ctl.cache().root(), &|n: &TreeNode, kids: Vec<usize>| {
        kids.iter().sum::<usize>() + usize::from(ctl.cache().state(&n.key) == LoadState::Loading)
    });
    assert_eq!(loading, 0);
    for key in &keys {
        assert!(!ctl.is_loading(key));
    }
}
