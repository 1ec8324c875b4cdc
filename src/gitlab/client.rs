use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::api_types::{ApiObject, ApiProject};
use super::RemoteSource;

const PER_PAGE: usize = 100;

/// GitLab REST API (v4) client wrapper
#[derive(Clone)]
pub struct GitlabClient {
  base_url: Url,
  client: reqwest::Client,
}

impl GitlabClient {
  pub fn new(base_url: &str, token: &str) -> Result<Self> {
    let base_url = Url::parse(base_url)
      .map_err(|e| eyre!("Invalid GitLab URL {}: {}", base_url, e))?;

    let mut headers = reqwest::header::HeaderMap::new();
    let mut token_value = reqwest::header::HeaderValue::from_str(token)
      .map_err(|_| eyre!("GitLab token contains invalid header characters"))?;
    token_value.set_sensitive(true);
    headers.insert("PRIVATE-TOKEN", token_value);

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create GitLab client: {}", e))?;

    Ok(Self { base_url, client })
  }

  /// The URL the client was configured with, used to anchor reference
  /// patterns.
  pub fn base_url(&self) -> &str {
    self.base_url.as_str().trim_end_matches('/')
  }

  /// Fetch every page of a list endpoint.
  ///
  /// GitLab paginates all list responses; a short page means we reached
  /// the end.
  async fn get_paged<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, &str)],
  ) -> Result<Vec<T>> {
    let url = self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))?;

    let mut results = Vec::new();
    let mut page = 1usize;

    loop {
      let page_str = page.to_string();
      let per_page_str = PER_PAGE.to_string();
      let response = self
        .client
        .get(url.clone())
        .query(query)
        .query(&[("page", page_str.as_str()), ("per_page", per_page_str.as_str())])
        .send()
        .await
        .map_err(|e| eyre!("GitLab request to {} failed: {}", path, e))?
        .error_for_status()
        .map_err(|e| eyre!("GitLab request to {} failed: {}", path, e))?;

      let batch: Vec<T> = response
        .json()
        .await
        .map_err(|e| eyre!("Failed to parse GitLab response from {}: {}", path, e))?;

      let len = batch.len();
      results.extend(batch);

      if len < PER_PAGE {
        break;
      }
      page += 1;
    }

    Ok(results)
  }

  async fn list_objects(
    &self,
    project_id: u64,
    kind: &str,
    updated_after: Option<&str>,
  ) -> Result<Vec<ApiObject>> {
    debug!(project_id, kind, ?updated_after, "listing remote objects");

    let path = format!("api/v4/projects/{}/{}", project_id, kind);
    let mut query = vec![("scope", "all")];
    if let Some(since) = updated_after {
      query.push(("updated_after", since));
    }

    let objects = self.get_paged(&path, &query).await?;
    debug!(project_id, kind, count = objects.len(), "got results");
    Ok(objects)
  }
}

impl RemoteSource for GitlabClient {
  async fn list_projects(&self) -> Result<Vec<ApiProject>> {
    self
      .get_paged("api/v4/projects", &[("simple", "true"), ("membership", "true")])
      .await
  }

  async fn list_issues(
    &self,
    project_id: u64,
    updated_after: Option<&str>,
  ) -> Result<Vec<ApiObject>> {
    self.list_objects(project_id, "issues", updated_after).await
  }

  async fn list_merge_requests(
    &self,
    project_id: u64,
    updated_after: Option<&str>,
  ) -> Result<Vec<ApiObject>> {
    self
      .list_objects(project_id, "merge_requests", updated_after)
      .await
  }
}
