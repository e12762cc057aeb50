//! Chaos testing for dirdelta
//!
//! Mutates the compared trees between classification and copying to make
//! sure individual copy failures are collected instead of aborting the run.

use ::dirdelta::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use tracing::info;

/// Chaos test fixture
pub struct DeltaChaosTest {
    pub temp_dir: TempDir,
    pub prev: PathBuf,
    pub next: PathBuf,
    pub chaos_engine: ChaosEngine,
}

/// Seeded source of destructive actions
pub struct ChaosEngine {
    rng: StdRng,
}

impl ChaosEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick roughly `ratio` of `paths`, always at least one when non-empty
    pub fn choose_victims(&mut self, paths: &[PathBuf], ratio: f64) -> BTreeSet<PathBuf> {
        let mut victims: BTreeSet<PathBuf> = paths
            .iter()
            .filter(|_| self.rng.random_bool(ratio))
            .cloned()
            .collect();
        if victims.is_empty() {
            if let Some(first) = paths.first() {
                victims.insert(first.clone());
            }
        }
        victims
    }

    /// Remove each victim below `root`
    pub fn delete_sources(&self, root: &Path, victims: &BTreeSet<PathBuf>) {
        for victim in victims {
            let path = root.join(victim);
            if path.is_dir() {
                fs::remove_dir_all(&path).unwrap();
            } else {
                fs::remove_file(&path).unwrap();
            }
        }
    }
}

impl DeltaChaosTest {
    pub fn new(files: usize) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let prev = temp_dir.path().join("before");
        let next = temp_dir.path().join("after");

        for idx in 0..files {
            let dir = format!("pkg_{}", idx % 5);
            write(&prev, &format!("{dir}/mod_{idx}.rs"), &format!("v1 {idx}"));
            match idx % 3 {
                0 => write(&next, &format!("{dir}/mod_{idx}.rs"), &format!("v2 {idx}")),
                1 => write(&next, &format!("{dir}/extra_{idx}.rs"), &format!("new {idx}")),
                _ => {}
            }
        }
        fs::create_dir_all(&next).unwrap();

        Self {
            temp_dir,
            prev,
            next,
            chaos_engine: ChaosEngine::new(7),
        }
    }

    pub fn out_root(&self) -> PathBuf {
        self.temp_dir.path().join("changes")
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_vanished_sources_are_reported_not_fatal() {
    let mut chaos = DeltaChaosTest::new(40);
    let result = compare(&chaos.prev, &chaos.next).unwrap();
    assert!(result.total_changes() > 0);

    let victims = chaos.chaos_engine.choose_victims(result.added(), 0.3);
    chaos.chaos_engine.delete_sources(&chaos.next, &victims);
    info!("Deleted {} added sources after comparing", victims.len());

    let report = materialize(&result, &chaos.prev, &chaos.next, &chaos.out_root(), false).unwrap();

    assert_eq!(report.total_attempted(), result.total_changes());
    assert_eq!(report.added.failed, victims.len());
    assert_eq!(report.modified.failed, 0);
    assert_eq!(report.removed.failed, 0);
    assert_eq!(report.total_copied() + report.total_failed(), report.total_attempted());

    let failed: BTreeSet<PathBuf> = report.failed_paths().into_iter().map(Path::to_path_buf).collect();
    assert_eq!(failed, victims);
    for failure in &report.failures {
        assert_eq!(failure.category, Category::Added);
        assert!(!failure.error.is_empty());
    }

    for path in result.added().iter().filter(|p| !victims.contains(*p)) {
        assert!(chaos.out_root().join("Added").join(path).is_file());
    }
}

#[test]
fn test_parallel_failures_collected_independently() {
    let mut chaos = DeltaChaosTest::new(60);
    let result = compare(&chaos.prev, &chaos.next).unwrap();

    let removed_victims = chaos.chaos_engine.choose_victims(result.removed(), 0.5);
    let modified_victims = chaos.chaos_engine.choose_victims(result.modified(), 0.5);
    chaos.chaos_engine.delete_sources(&chaos.prev, &removed_victims);
    chaos.chaos_engine.delete_sources(&chaos.next, &modified_victims);

    let seen = Mutex::new(Vec::new());
    let report = ChangeMaterializer::new(chaos.out_root())
        .parallel_workers(4)
        .materialize_with_progress(
            &result,
            &chaos.prev,
            &chaos.next,
            Some(|info: ProgressInfo| seen.lock().unwrap().push(info.processed)),
        )
        .unwrap();

    assert_eq!(report.removed.failed, removed_victims.len());
    assert_eq!(report.modified.failed, modified_victims.len());
    assert_eq!(report.added.failed, 0);
    assert_eq!(report.failures.len(), removed_victims.len() + modified_victims.len());

    // Every entry reports progress, failed or not
    let mut seen = seen.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, (1..=result.total_changes()).collect::<Vec<_>>());
}

#[test]
fn test_stale_classification_against_empty_roots() {
    let chaos = DeltaChaosTest::new(12);
    let result = compare(&chaos.prev, &chaos.next).unwrap();

    let empty_prev = chaos.temp_dir.path().join("empty_prev");
    let empty_next = chaos.temp_dir.path().join("empty_next");
    fs::create_dir_all(&empty_prev).unwrap();
    fs::create_dir_all(&empty_next).unwrap();

    let report = materialize(&result, &empty_prev, &empty_next, &chaos.out_root(), false).unwrap();

    assert_eq!(report.total_copied(), 0);
    assert_eq!(report.total_failed(), result.total_changes());
    assert!(!report.is_complete());

    // Category folders exist for every non-empty category even if nothing landed
    for category in Category::CHANGES {
        let folder = chaos.out_root().join(category.folder_name().unwrap());
        assert_eq!(folder.is_dir(), !result.paths(category).is_empty());
    }
}

#[test]
fn test_source_rewritten_after_compare_copies_current_content() {
    let chaos = DeltaChaosTest::new(6);
    let result = compare(&chaos.prev, &chaos.next).unwrap();
    let target = result.modified()[0].clone();

    fs::write(chaos.next.join(&target), "rewritten after compare").unwrap();

    let report = materialize(&result, &chaos.prev, &chaos.next, &chaos.out_root(), false).unwrap();
    assert!(report.is_complete());
    assert_eq!(
        fs::read_to_string(chaos.out_root().join("Modified").join(&target)).unwrap(),
        "rewritten after compare"
    );
}

#[test]
fn test_file_turned_into_directory_after_compare() {
    let chaos = DeltaChaosTest::new(6);
    let result = compare(&chaos.prev, &chaos.next).unwrap();
    let target = result.added()[0].clone();

    let source = chaos.next.join(&target);
    fs::remove_file(&source).unwrap();
    write(&source, "inner.txt", "now a directory");

    let report = materialize(&result, &chaos.prev, &chaos.next, &chaos.out_root(), false).unwrap();
    assert!(report.is_complete());
    assert_eq!(
        fs::read_to_string(chaos.out_root().join("Added").join(&target).join("inner.txt")).unwrap(),
        "now a directory"
    );
}
