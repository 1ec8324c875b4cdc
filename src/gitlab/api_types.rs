//! Serde-deserializable types matching GitLab API responses.
//!
//! These types are separate from the index types so that wire-format quirks
//! (nullable descriptions, nested author objects, extra states) stay at the
//! boundary.

use serde::Deserialize;

use super::types::{GitlabObject, ObjectState};

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
  pub name: String,
}

/// Issue or merge request as returned by the list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiObject {
  pub iid: u64,
  pub title: String,
  pub author: ApiUser,
  pub state: String,
  pub description: Option<String>,
}

impl ApiObject {
  pub fn into_record(self) -> GitlabObject {
    GitlabObject {
      id: self.iid,
      title: self.title,
      author: self.author.name,
      state: ObjectState::from_api(&self.state),
      description: self.description.unwrap_or_default(),
    }
  }
}

/// Project entry from the catalog listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiProject {
  pub id: u64,
  pub path_with_namespace: String,
}
