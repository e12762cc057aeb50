//! Property-based testing for dirdelta
//!
//! Uses proptest to verify the classification invariants across randomly
//! generated pairs of trees.

use ::dirdelta::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

type Tree = BTreeMap<PathBuf, Vec<u8>>;

/// Files plus directories created with nothing inside
#[derive(Debug, Clone)]
struct Layout {
    files: Tree,
    empty_dirs: BTreeSet<PathBuf>,
}

/// Generate random file paths
///
/// Directory names start with `d` and file names with `f`, so a path can
/// never be a file in one tree and a directory in the other.
fn path_strategy() -> impl Strategy<Value = PathBuf> {
    let dir_strategy = prop::collection::vec("d[a-c]{1,2}", 0..=3);
    let filename_strategy = "f[a-d]{1,2}\\.(txt|bin)";

    (dir_strategy, filename_strategy).prop_map(|(dirs, filename)| {
        let mut path = PathBuf::new();
        for dir in dirs {
            path.push(dir);
        }
        path.join(filename)
    })
}

/// Generate directory paths, one to three levels deep
fn dir_path_strategy() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec("d[a-c]{1,2}", 1..=3).prop_map(|dirs| dirs.iter().collect())
}

/// Generate random file content
fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-z ]{0,40}".prop_map(|s| s.into_bytes()),
        prop::collection::vec(any::<u8>(), 0..256),
    ]
}

/// Generate a previous tree and a next tree derived from it
///
/// Each previous file is kept, edited or dropped, then extra files are
/// layered on top, so the pair shares a realistic amount of content. Empty
/// directories are sprinkled on both sides, some shared and some one-sided.
fn tree_pair_strategy() -> impl Strategy<Value = (Layout, Layout)> {
    (
        prop::collection::btree_map(path_strategy(), content_strategy(), 0..16),
        prop::collection::vec(0u8..3, 16),
        prop::collection::btree_map(path_strategy(), content_strategy(), 0..6),
        prop::collection::btree_set(dir_path_strategy(), 0..3),
        prop::collection::btree_set(dir_path_strategy(), 0..3),
        prop::collection::btree_set(dir_path_strategy(), 0..3),
    )
        .prop_map(|(prev, actions, extra, shared_dirs, prev_dirs, next_dirs)| {
            let mut next = Tree::new();
            for (idx, (path, content)) in prev.iter().enumerate() {
                match actions[idx % actions.len()] {
                    0 => {
                        next.insert(path.clone(), content.clone());
                    }
                    1 => {
                        let mut edited = content.clone();
                        edited.push(0xAA);
                        next.insert(path.clone(), edited);
                    }
                    _ => {}
                }
            }
            next.extend(extra);
            (
                Layout {
                    files: prev,
                    empty_dirs: shared_dirs.union(&prev_dirs).cloned().collect(),
                },
                Layout {
                    files: next,
                    empty_dirs: shared_dirs.union(&next_dirs).cloned().collect(),
                },
            )
        })
}

fn write_tree(root: &Path, layout: &Layout) {
    for dir in &layout.empty_dirs {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    for (path, content) in &layout.files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

fn as_set(paths: &[PathBuf]) -> BTreeSet<PathBuf> {
    paths.iter().cloned().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_classification_matches_model((prev, next) in tree_pair_strategy()) {
        let prev_dir = TempDir::new().unwrap();
        let next_dir = TempDir::new().unwrap();
        write_tree(prev_dir.path(), &prev);
        write_tree(next_dir.path(), &next);

        let result = compare(prev_dir.path(), next_dir.path()).unwrap();

        let (prev, next) = (&prev.files, &next.files);
        let mut expected: BTreeMap<Category, BTreeSet<PathBuf>> = BTreeMap::new();
        for (path, content) in prev {
            let category = match next.get(path) {
                Some(other) if other == content => Category::Unchanged,
                Some(_) => Category::Modified,
                None => Category::Removed,
            };
            expected.entry(category).or_default().insert(path.clone());
        }
        for path in next.keys().filter(|p| !prev.contains_key(*p)) {
            expected.entry(Category::Added).or_default().insert(path.clone());
        }

        for category in [Category::Unchanged, Category::Modified, Category::Added, Category::Removed] {
            prop_assert_eq!(
                as_set(result.paths(category)),
                expected.remove(&category).unwrap_or_default()
            );
        }
    }

    #[test]
    fn prop_categories_cover_both_trees_exactly_once((prev, next) in tree_pair_strategy()) {
        let prev_dir = TempDir::new().unwrap();
        let next_dir = TempDir::new().unwrap();
        write_tree(prev_dir.path(), &prev);
        write_tree(next_dir.path(), &next);

        let result = compare(prev_dir.path(), next_dir.path()).unwrap();

        let all: Vec<&Path> = result.iter().map(|(_, path)| path).collect();
        let unique: BTreeSet<&Path> = all.iter().copied().collect();
        prop_assert_eq!(all.len(), unique.len());

        let reachable: BTreeSet<PathBuf> = list_tree(prev_dir.path(), true)
            .unwrap()
            .into_iter()
            .chain(list_tree(next_dir.path(), true).unwrap())
            .collect();
        prop_assert_eq!(unique.into_iter().map(Path::to_path_buf).collect::<BTreeSet<_>>(), reachable.clone());

        // Empty directories are never entries, so only files are reachable
        let files: BTreeSet<PathBuf> = prev.files.keys().chain(next.files.keys()).cloned().collect();
        prop_assert_eq!(reachable, files);
    }

    #[test]
    fn prop_self_comparison_is_all_unchanged((tree, _) in tree_pair_strategy()) {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path(), &tree);

        let result = compare(dir.path(), dir.path()).unwrap();

        prop_assert!(!result.has_changes());
        prop_assert_eq!(as_set(result.unchanged()), tree.files.keys().cloned().collect::<BTreeSet<_>>());
    }

    #[test]
    fn prop_swapping_roots_mirrors_result((prev, next) in tree_pair_strategy()) {
        let prev_dir = TempDir::new().unwrap();
        let next_dir = TempDir::new().unwrap();
        write_tree(prev_dir.path(), &prev);
        write_tree(next_dir.path(), &next);

        let forward = compare(prev_dir.path(), next_dir.path()).unwrap();
        let backward = compare(next_dir.path(), prev_dir.path()).unwrap();

        prop_assert_eq!(forward.added(), backward.removed());
        prop_assert_eq!(forward.removed(), backward.added());
        prop_assert_eq!(forward.modified(), backward.modified());
        prop_assert_eq!(forward.unchanged(), backward.unchanged());
    }

    #[test]
    fn prop_parallel_compare_is_deterministic((prev, next) in tree_pair_strategy()) {
        let prev_dir = TempDir::new().unwrap();
        let next_dir = TempDir::new().unwrap();
        write_tree(prev_dir.path(), &prev);
        write_tree(next_dir.path(), &next);

        let sequential = TreeComparator::new().compare(prev_dir.path(), next_dir.path()).unwrap();
        let parallel = TreeComparator::new()
            .parallel_workers(3)
            .compare(prev_dir.path(), next_dir.path())
            .unwrap();

        prop_assert_eq!(sequential, parallel);
    }
}
