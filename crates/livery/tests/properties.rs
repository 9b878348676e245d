//! Property tests for mode detection and watch isolation.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::ThemeTree;
use livery::watch::{classify_event, WatchAction, WatchEventKind};
use livery::{DiscoveryMode, FsSource, ThemeDiscovery, TEMPLATE_EXTENSIONS};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Child {
    Valid,
    MissingSingles,
    NotesOnly,
}

fn child_strategy() -> impl Strategy<Value = Child> {
    prop_oneof![
        Just(Child::Valid),
        Just(Child::MissingSingles),
        Just(Child::NotesOnly),
    ]
}

fn build(children: &[Child], legacy: bool) -> ThemeTree {
    let tree = ThemeTree::new();
    if legacy {
        tree.legacy("root");
    }
    for (i, child) in children.iter().enumerate() {
        let name = format!("t{}", i);
        match child {
            Child::Valid => {
                tree.theme(&name, "ok");
            }
            Child::MissingSingles => {
                tree.theme(&name, "ok");
                tree.remove(&format!("{}/singles", name));
            }
            Child::NotesOnly => {
                tree.write(&format!("{}/README.md", name), "notes");
            }
        }
    }
    tree
}

fn template_path() -> impl Strategy<Value = (Vec<String>, String)> {
    (
        prop::collection::vec("[a-z]{1,8}", 0..3),
        "[a-z]{1,8}",
        prop::sample::select(TEMPLATE_EXTENSIONS.to_vec()),
    )
        .prop_map(|(dirs, stem, ext)| (dirs, format!("{}{}", stem, ext)))
}

fn content_event() -> impl Strategy<Value = WatchEventKind> {
    prop::sample::select(vec![
        WatchEventKind::Create,
        WatchEventKind::Write,
        WatchEventKind::Remove,
        WatchEventKind::Rename,
    ])
}

fn under(root: &str, dirs: &[String], file: &str) -> PathBuf {
    let mut path = PathBuf::from(root).join("pages");
    for dir in dirs {
        path.push(dir);
    }
    path.join(file)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn mode_follows_valid_children(
        children in prop::collection::vec(child_strategy(), 0..4),
        legacy in any::<bool>(),
    ) {
        let tree = build(&children, legacy);
        let discovery = ThemeDiscovery::new(Arc::new(FsSource), tree.path());

        let first = discovery.detect_mode().unwrap();
        let second = discovery.detect_mode().unwrap();
        prop_assert_eq!(first, second);

        let expected = if children.contains(&Child::Valid) {
            DiscoveryMode::MultiTheme
        } else {
            DiscoveryMode::Legacy
        };
        prop_assert_eq!(first, expected);
    }
}

proptest! {
    #[test]
    fn events_in_inactive_theme_never_reload(
        (dirs, file) in template_path(),
        kind in content_event(),
    ) {
        let active = PathBuf::from("/tpl/a");
        let inactive = under("/tpl/b", &dirs, &file);
        let sibling = under("/tpl/a-old", &dirs, &file);

        prop_assert_eq!(classify_event(kind, &inactive, &active, false), WatchAction::Ignore);
        prop_assert_eq!(classify_event(kind, &sibling, &active, false), WatchAction::Ignore);
    }

    #[test]
    fn template_events_in_active_theme_always_reload(
        (dirs, file) in template_path(),
        kind in content_event(),
    ) {
        let active = PathBuf::from("/tpl/a");
        let path = under("/tpl/a", &dirs, &file);

        prop_assert_eq!(classify_event(kind, &path, &active, false), WatchAction::Reload);
        prop_assert_eq!(
            classify_event(WatchEventKind::PermissionChange, &path, &active, false),
            WatchAction::Ignore
        );
    }

    #[test]
    fn isolation_follows_the_root_after_a_switch(
        (dirs, file) in template_path(),
        kind in content_event(),
    ) {
        let old_root = PathBuf::from("/tpl/a");
        let new_root = PathBuf::from("/tpl/b");
        let old_event = under("/tpl/a", &dirs, &file);
        let new_event = under("/tpl/b", &dirs, &file);

        prop_assert_eq!(classify_event(kind, &old_event, &new_root, false), WatchAction::Ignore);
        prop_assert_eq!(classify_event(kind, &new_event, &new_root, false), WatchAction::Reload);
        prop_assert_eq!(classify_event(kind, &new_event, &old_root, false), WatchAction::Ignore);
    }
}
