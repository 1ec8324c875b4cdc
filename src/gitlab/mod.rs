pub mod api_types;
pub mod client;
pub mod types;

use color_eyre::Result;

use api_types::{ApiObject, ApiProject};

/// Seam over the remote GitLab API.
///
/// The synchronization engine only needs these three listings; the real
/// implementation is [`client::GitlabClient`], tests substitute a fake.
/// `updated_after` is an ISO-8601 timestamp restricting the result to
/// objects touched after that instant; `None` means a full listing.
#[allow(async_fn_in_trait)]
pub trait RemoteSource {
  async fn list_projects(&self) -> Result<Vec<ApiProject>>;

  async fn list_issues(
    &self,
    project_id: u64,
    updated_after: Option<&str>,
  ) -> Result<Vec<ApiObject>>;

  async fn list_merge_requests(
    &self,
    project_id: u64,
    updated_after: Option<&str>,
  ) -> Result<Vec<ApiObject>>;
}
