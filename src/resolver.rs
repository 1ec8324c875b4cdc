//! Pattern matching for textual references to issues and merge requests.

use color_eyre::{eyre::eyre, Result};
use regex::Regex;

use crate::gitlab::types::{GitlabObject, ProjectSet};

/// Locates GitLab object URLs in text and resolves them against the
/// in-memory project set.
///
/// The pattern is anchored to the base URL of the session's GitLab
/// instance and captures `(project path, issues|merge_requests, iid)`,
/// word-bounded on both ends so a match never spans extra path segments.
pub struct ReferenceResolver {
  /// Scans anywhere in a line
  scan_re: Regex,
  /// Anchored at the start of the string, for pre-isolated tokens
  head_re: Regex,
}

impl ReferenceResolver {
  pub fn new(base_url: &str) -> Result<Self> {
    let base = regex::escape(base_url.trim_end_matches('/'));
    let pattern = format!(r"{}/([^ ]+)/-/(issues|merge_requests)/(\d+)\b", base);

    let scan_re = Regex::new(&format!(r"\b{}", pattern))
      .map_err(|e| eyre!("Failed to compile reference pattern: {}", e))?;
    let head_re = Regex::new(&format!(r"^{}", pattern))
      .map_err(|e| eyre!("Failed to compile reference pattern: {}", e))?;

    Ok(Self { scan_re, head_re })
  }

  /// All resolvable references in a line, with their byte offsets, in
  /// left-to-right order.
  ///
  /// Matches that don't resolve (unknown project, missing IID) are
  /// silently omitted.
  pub fn find_references<'a>(
    &self,
    line: &str,
    projects: &'a ProjectSet,
  ) -> Vec<(&'a GitlabObject, usize, usize)> {
    self
      .scan_re
      .captures_iter(line)
      .filter_map(|captures| {
        let whole = captures.get(0)?;
        let record = resolve_captures(&captures, projects)?;
        Some((record, whole.start(), whole.end()))
      })
      .collect()
  }

  /// Resolve a pre-isolated token as a reference URL.
  ///
  /// Unlike [`find_references`](Self::find_references) the pattern must
  /// match at the start of the string.
  pub fn resolve_url<'a>(&self, url: &str, projects: &'a ProjectSet) -> Option<&'a GitlabObject> {
    let captures = self.head_re.captures(url)?;
    resolve_captures(&captures, projects)
  }
}

fn resolve_captures<'a>(
  captures: &regex::Captures<'_>,
  projects: &'a ProjectSet,
) -> Option<&'a GitlabObject> {
  let project = projects.get(&captures[1])?;
  let records = match &captures[2] {
    "issues" => &project.issues,
    _ => &project.merge_requests,
  };
  let iid: u64 = captures[3].parse().ok()?;
  records.get(&iid)
}
