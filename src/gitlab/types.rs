use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State of an issue or merge request.
///
/// `Merged` only occurs for merge requests; issues are either opened or
/// closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectState {
  Opened,
  Closed,
  Merged,
}

impl ObjectState {
  /// Map a raw GitLab state string to the cached representation.
  ///
  /// GitLab reports a few extra states (e.g. "locked" on merge requests);
  /// anything that is not opened or merged counts as closed.
  pub fn from_api(state: &str) -> Self {
    match state {
      "opened" => ObjectState::Opened,
      "merged" => ObjectState::Merged,
      _ => ObjectState::Closed,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ObjectState::Opened => "opened",
      ObjectState::Closed => "closed",
      ObjectState::Merged => "merged",
    }
  }
}

/// One issue or merge request, as held in the index.
///
/// Records are immutable once fetched and replaced wholesale on refresh;
/// there is no field-level merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitlabObject {
  /// Project-scoped IID, unique within its kind and project
  pub id: u64,
  pub title: String,
  pub author: String,
  pub state: ObjectState,
  pub description: String,
}

/// Per-project slice of the index: all known issues and merge requests
/// plus the timestamp of the last successful synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitlabProject {
  /// Global GitLab project id
  pub id: u64,
  /// path_with_namespace, the primary index key
  pub path: String,
  /// ISO-8601 local timestamp (second precision) of the last sync pass
  pub last_update: String,
  pub issues: BTreeMap<u64, GitlabObject>,
  pub merge_requests: BTreeMap<u64, GitlabObject>,
}

/// The in-memory project set, keyed by project path.
pub type ProjectSet = BTreeMap<String, GitlabProject>;
