//! Synchronization of the project index against GitLab.
//!
//! A pass brings a requested list of project paths into memory with as few
//! remote calls as possible: projects already in the persisted snapshot are
//! refreshed incrementally (only objects updated since their last sync),
//! the rest are fetched in full via one catalog scan. The resulting set is
//! written back as the new snapshot.

use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::gitlab::api_types::ApiObject;
use crate::gitlab::types::{GitlabObject, GitlabProject, ProjectSet};
use crate::gitlab::RemoteSource;
use crate::store::IndexStore;

/// Destination for sync progress updates.
///
/// The editor transport maps these onto work-done progress notifications;
/// the engine itself only knows about discrete steps.
pub trait ProgressSink {
  fn begin(&mut self, title: &str, message: &str);
  fn report(&mut self, message: &str, percent: u32);
  fn end(&mut self, message: &str);
}

/// Progress sink that writes to the log, used by the sync binary.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
  fn begin(&mut self, title: &str, message: &str) {
    tracing::info!("{}: {}", title, message);
  }

  fn report(&mut self, message: &str, percent: u32) {
    tracing::info!("[{:3}%] {}", percent, message);
  }

  fn end(&mut self, message: &str) {
    tracing::info!("{}", message);
  }
}

/// Even-split progress accounting: one step per requested project.
///
/// Increments are `100 / requested_count` with integer division, so the
/// final report may land short of 100%.
struct WorkProgress {
  increment: u32,
  percent: u32,
}

impl WorkProgress {
  fn new(steps: usize) -> Self {
    Self {
      increment: 100 / steps as u32,
      percent: 0,
    }
  }

  fn advance(&mut self) {
    self.percent += self.increment;
  }
}

/// Merge freshly fetched records into an existing mapping, last write wins
/// by IID.
///
/// Records the new batch doesn't mention are carried over untouched; an
/// object deleted upstream therefore lingers until a full fetch replaces
/// the project.
pub fn merge(
  old: &BTreeMap<u64, GitlabObject>,
  new: BTreeMap<u64, GitlabObject>,
) -> BTreeMap<u64, GitlabObject> {
  let mut merged = old.clone();
  merged.extend(new);
  merged
}

/// Current local time, second precision, as stored in `last_update`.
fn timestamp() -> String {
  Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn record_map(objects: Vec<ApiObject>) -> BTreeMap<u64, GitlabObject> {
  objects
    .into_iter()
    .map(|object| (object.iid, object.into_record()))
    .collect()
}

/// Reconciles requested projects against the persisted snapshot and the
/// remote instance.
pub struct SyncEngine<R> {
  remote: R,
  store: IndexStore,
}

impl<R: RemoteSource> SyncEngine<R> {
  pub fn new(remote: R, store: IndexStore) -> Self {
    Self { remote, store }
  }

  /// Run one synchronization pass and return the populated project set.
  ///
  /// Requested paths found in the snapshot are refreshed incrementally;
  /// the remainder is fetched fresh through the project catalog. Paths
  /// with no remote match are dropped without error. A remote failure
  /// aborts the whole pass.
  pub async fn sync<P: ProgressSink>(
    &self,
    requested: &[String],
    progress: &mut P,
  ) -> Result<ProjectSet> {
    if requested.is_empty() {
      return Err(eyre!("No projects configured; nothing to synchronize"));
    }

    let mut work = WorkProgress::new(requested.len());
    progress.begin("Database load", "Starting progress");

    let cache = self.store.load()?;
    let mut projects = ProjectSet::new();
    let mut cached_paths = HashSet::new();

    // Cache pass: refresh every requested project that already has a
    // snapshot entry. Iterates store entries and checks membership in the
    // requested list, so the list itself is never mutated mid-iteration.
    for (path, raw) in cache {
      if !requested.iter().any(|p| *p == path) {
        continue;
      }
      debug!(project = %path, "found project in cache");

      let mut project: GitlabProject = serde_json::from_value(raw)
        .map_err(|e| eyre!("Invalid index entry for {}: {}", path, e))?;

      progress.report(&format!("Updating {}", project.path), work.percent);
      self.refresh(&mut project).await?;
      work.advance();
      progress.report(&format!("Updated {}", project.path), work.percent);

      cached_paths.insert(path.clone());
      projects.insert(path, project);
    }

    // Fetch pass: whatever the cache didn't cover comes from a full
    // catalog scan.
    let missing: Vec<&String> = requested
      .iter()
      .filter(|p| !cached_paths.contains(*p))
      .collect();
    if !missing.is_empty() {
      self
        .fetch_missing(&missing, &mut projects, &mut work, progress)
        .await?;
    }

    self.store.save(&projects)?;
    progress.end("Database loaded!");

    Ok(projects)
  }

  /// Incrementally refresh a cached project.
  ///
  /// Only objects updated after the project's `last_update` are requested;
  /// the merged mappings are swapped in together so a reader never sees a
  /// half-updated project. `last_update` advances to the refresh completion
  /// time, not any remote timestamp.
  async fn refresh(&self, project: &mut GitlabProject) -> Result<()> {
    let since = project.last_update.clone();
    debug!(project = %project.path, %since, "refreshing project");

    let new_issues = record_map(self.remote.list_issues(project.id, Some(&since)).await?);
    let new_merge_requests = record_map(
      self
        .remote
        .list_merge_requests(project.id, Some(&since))
        .await?,
    );

    let issues = merge(&project.issues, new_issues);
    let merge_requests = merge(&project.merge_requests, new_merge_requests);

    project.issues = issues;
    project.merge_requests = merge_requests;
    project.last_update = timestamp();
    Ok(())
  }

  /// Fetch projects absent from the snapshot by scanning the full remote
  /// catalog once.
  async fn fetch_missing<P: ProgressSink>(
    &self,
    missing: &[&String],
    projects: &mut ProjectSet,
    work: &mut WorkProgress,
    progress: &mut P,
  ) -> Result<()> {
    progress.report("Fetching missing projects", work.percent);

    for remote_project in self.remote.list_projects().await? {
      let path = &remote_project.path_with_namespace;
      if !missing.iter().any(|p| **p == *path) {
        continue;
      }
      debug!(project = %path, "found project in catalog");
      progress.report(&format!("Fetching missing project: {}", path), work.percent);

      let issues = record_map(self.remote.list_issues(remote_project.id, None).await?);
      let merge_requests = record_map(
        self
          .remote
          .list_merge_requests(remote_project.id, None)
          .await?,
      );

      let project = GitlabProject {
        id: remote_project.id,
        path: path.clone(),
        last_update: timestamp(),
        issues,
        merge_requests,
      };
      work.advance();
      progress.report(&format!("Fetched project {}", project.path), work.percent);
      projects.insert(project.path.clone(), project);
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gitlab::api_types::{ApiProject, ApiUser};
  use crate::gitlab::types::ObjectState;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn api_object(iid: u64, state: &str) -> ApiObject {
    ApiObject {
      iid,
      title: format!("Object {}", iid),
      author: ApiUser {
        name: "alice".to_string(),
      },
      state: state.to_string(),
      description: Some("details".to_string()),
    }
  }

  /// Remote fake: `full_*` listings answer unfiltered fetches, `fresh_*`
  /// listings answer time-filtered refreshes.
  #[derive(Default)]
  struct FakeRemote {
    catalog: Vec<ApiProject>,
    full_issues: HashMap<u64, Vec<ApiObject>>,
    full_merge_requests: HashMap<u64, Vec<ApiObject>>,
    fresh_issues: HashMap<u64, Vec<ApiObject>>,
    fresh_merge_requests: HashMap<u64, Vec<ApiObject>>,
    full_fetches: AtomicUsize,
  }

  impl RemoteSource for FakeRemote {
    async fn list_projects(&self) -> Result<Vec<ApiProject>> {
      Ok(self.catalog.clone())
    }

    async fn list_issues(
      &self,
      project_id: u64,
      updated_after: Option<&str>,
    ) -> Result<Vec<ApiObject>> {
      let source = if updated_after.is_some() {
        &self.fresh_issues
      } else {
        self.full_fetches.fetch_add(1, Ordering::SeqCst);
        &self.full_issues
      };
      Ok(source.get(&project_id).cloned().unwrap_or_default())
    }

    async fn list_merge_requests(
      &self,
      project_id: u64,
      updated_after: Option<&str>,
    ) -> Result<Vec<ApiObject>> {
      let source = if updated_after.is_some() {
        &self.fresh_merge_requests
      } else {
        &self.full_merge_requests
      };
      Ok(source.get(&project_id).cloned().unwrap_or_default())
    }
  }

  #[derive(Default)]
  struct RecordingProgress {
    reports: Vec<(String, u32)>,
    ended: bool,
  }

  impl ProgressSink for RecordingProgress {
    fn begin(&mut self, _title: &str, _message: &str) {}

    fn report(&mut self, message: &str, percent: u32) {
      self.reports.push((message.to_string(), percent));
    }

    fn end(&mut self, _message: &str) {
      self.ended = true;
    }
  }

  fn store_in(dir: &tempfile::TempDir) -> IndexStore {
    IndexStore::with_path(dir.path().join("index.json"))
  }

  fn cached_project(path: &str, id: u64, issues: &[(u64, ObjectState)]) -> GitlabProject {
    GitlabProject {
      id,
      path: path.to_string(),
      last_update: "2024-01-01T00:00:00".to_string(),
      issues: issues
        .iter()
        .map(|(iid, state)| {
          (
            *iid,
            GitlabObject {
              id: *iid,
              title: format!("Object {}", iid),
              author: "alice".to_string(),
              state: *state,
              description: "details".to_string(),
            },
          )
        })
        .collect(),
      merge_requests: BTreeMap::new(),
    }
  }

  #[test]
  fn merge_overlays_by_iid_and_keeps_the_rest() {
    let mut old = BTreeMap::new();
    old.insert(7, api_object(7, "closed").into_record());
    old.insert(8, api_object(8, "opened").into_record());

    let mut new = BTreeMap::new();
    new.insert(7, api_object(7, "opened").into_record());
    new.insert(9, api_object(9, "opened").into_record());

    let merged = merge(&old, new);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged[&7].state, ObjectState::Opened);
    assert_eq!(merged[&8].state, ObjectState::Opened);
    assert_eq!(merged[&9].state, ObjectState::Opened);
  }

  #[tokio::test]
  async fn empty_request_list_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SyncEngine::new(FakeRemote::default(), store_in(&dir));
    let result = engine.sync(&[], &mut RecordingProgress::default()).await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn fresh_fetch_builds_index_from_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let remote = FakeRemote {
      catalog: vec![
        ApiProject {
          id: 1,
          path_with_namespace: "group/proj".to_string(),
        },
        ApiProject {
          id: 2,
          path_with_namespace: "group/other".to_string(),
        },
      ],
      full_issues: HashMap::from([(1, vec![api_object(42, "opened")])]),
      full_merge_requests: HashMap::from([(1, vec![api_object(5, "merged")])]),
      ..Default::default()
    };
    let engine = SyncEngine::new(remote, store_in(&dir));

    let requested = vec!["group/proj".to_string()];
    let projects = engine
      .sync(&requested, &mut RecordingProgress::default())
      .await
      .unwrap();

    assert_eq!(projects.len(), 1);
    let project = &projects["group/proj"];
    assert_eq!(project.id, 1);
    assert_eq!(project.issues[&42].state, ObjectState::Opened);
    assert_eq!(project.merge_requests[&5].state, ObjectState::Merged);
    assert!(!project.last_update.is_empty());
  }

  #[tokio::test]
  async fn unknown_project_path_is_silently_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let engine = SyncEngine::new(FakeRemote::default(), store_in(&dir));

    let requested = vec!["no/such".to_string()];
    let projects = engine
      .sync(&requested, &mut RecordingProgress::default())
      .await
      .unwrap();
    assert!(projects.is_empty());
  }

  #[tokio::test]
  async fn cached_project_is_never_refetched_from_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let mut seeded = ProjectSet::new();
    seeded.insert(
      "group/proj".to_string(),
      cached_project("group/proj", 1, &[(7, ObjectState::Closed)]),
    );
    store.save(&seeded).unwrap();

    // The catalog also knows group/proj; a full fetch for it would bump
    // full_fetches.
    let remote = FakeRemote {
      catalog: vec![ApiProject {
        id: 1,
        path_with_namespace: "group/proj".to_string(),
      }],
      full_issues: HashMap::from([(1, vec![api_object(7, "opened")])]),
      ..Default::default()
    };
    let engine = SyncEngine::new(remote, store_in(&dir));

    let requested = vec!["group/proj".to_string()];
    let projects = engine
      .sync(&requested, &mut RecordingProgress::default())
      .await
      .unwrap();

    assert_eq!(engine.remote.full_fetches.load(Ordering::SeqCst), 0);
    // untouched by the (empty) refresh window
    assert_eq!(projects["group/proj"].issues[&7].state, ObjectState::Closed);
  }

  #[tokio::test]
  async fn refresh_overlays_and_advances_last_update() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let mut seeded = ProjectSet::new();
    seeded.insert(
      "a/b".to_string(),
      cached_project("a/b", 9, &[(7, ObjectState::Closed)]),
    );
    store.save(&seeded).unwrap();

    let remote = FakeRemote {
      fresh_issues: HashMap::from([(
        9,
        vec![api_object(7, "opened"), api_object(9, "opened")],
      )]),
      ..Default::default()
    };
    let engine = SyncEngine::new(remote, store_in(&dir));

    let requested = vec!["a/b".to_string()];
    let projects = engine
      .sync(&requested, &mut RecordingProgress::default())
      .await
      .unwrap();

    let project = &projects["a/b"];
    assert_eq!(project.issues.len(), 2);
    assert_eq!(project.issues[&7].state, ObjectState::Opened);
    assert_eq!(project.issues[&9].state, ObjectState::Opened);
    assert!(project.last_update.as_str() > "2024-01-01T00:00:00");
  }

  #[tokio::test]
  async fn sync_is_idempotent_without_remote_changes() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = vec![ApiProject {
      id: 1,
      path_with_namespace: "group/proj".to_string(),
    }];
    let full_issues = HashMap::from([(1, vec![api_object(42, "opened")])]);

    let requested = vec!["group/proj".to_string()];

    let first = {
      let remote = FakeRemote {
        catalog: catalog.clone(),
        full_issues: full_issues.clone(),
        ..Default::default()
      };
      let engine = SyncEngine::new(remote, store_in(&dir));
      engine
        .sync(&requested, &mut RecordingProgress::default())
        .await
        .unwrap()
    };

    // Second pass over the same store: the project comes from cache and the
    // refresh window returns nothing.
    let second = {
      let remote = FakeRemote {
        catalog,
        full_issues,
        ..Default::default()
      };
      let engine = SyncEngine::new(remote, store_in(&dir));
      engine
        .sync(&requested, &mut RecordingProgress::default())
        .await
        .unwrap()
    };

    assert_eq!(first["group/proj"].issues, second["group/proj"].issues);
    assert_eq!(
      first["group/proj"].merge_requests,
      second["group/proj"].merge_requests
    );
    assert_eq!(first["group/proj"].id, second["group/proj"].id);
  }

  #[tokio::test]
  async fn percent_sequence_is_floor_100_over_n_times_step() {
    let dir = tempfile::tempdir().unwrap();
    let catalog: Vec<ApiProject> = (1..=3)
      .map(|id| ApiProject {
        id,
        path_with_namespace: format!("group/p{}", id),
      })
      .collect();
    let engine = SyncEngine::new(
      FakeRemote {
        catalog,
        ..Default::default()
      },
      store_in(&dir),
    );

    let requested: Vec<String> = (1..=3).map(|id| format!("group/p{}", id)).collect();
    let mut progress = RecordingProgress::default();
    engine.sync(&requested, &mut progress).await.unwrap();

    // One "Fetched project ..." report per completed step; percent after
    // step k is floor(100/3) * k, never reaching 100.
    let completed: Vec<u32> = progress
      .reports
      .iter()
      .filter(|(message, _)| message.starts_with("Fetched project"))
      .map(|(_, percent)| *percent)
      .collect();
    assert_eq!(completed, vec![33, 66, 99]);
    assert!(progress.ended);
  }

  #[tokio::test]
  async fn pass_persists_the_full_project_set() {
    let dir = tempfile::tempdir().unwrap();
    let remote = FakeRemote {
      catalog: vec![ApiProject {
        id: 1,
        path_with_namespace: "group/proj".to_string(),
      }],
      full_issues: HashMap::from([(1, vec![api_object(42, "opened")])]),
      ..Default::default()
    };
    let engine = SyncEngine::new(remote, store_in(&dir));

    let requested = vec!["group/proj".to_string()];
    engine
      .sync(&requested, &mut RecordingProgress::default())
      .await
      .unwrap();

    let raw = store_in(&dir).load().unwrap();
    assert!(raw.contains_key("group/proj"));
    let saved: GitlabProject = serde_json::from_value(raw["group/proj"].clone()).unwrap();
    assert_eq!(saved.issues[&42].state, ObjectState::Opened);
  }
}
