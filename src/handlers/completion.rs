use lsp_types::{
  CompletionItem, CompletionItemKind, CompletionItemLabelDetails,
};

use crate::gitlab::types::{GitlabObject, ObjectState};

use super::FeatureContext;

/// Completion candidates for a trigger character.
///
/// `#` offers every known issue, `!` every known merge request, across all
/// indexed projects. Any other trigger yields nothing.
pub fn completion(ctx: &FeatureContext, trigger: char) -> Vec<CompletionItem> {
  let mut items = Vec::new();
  match trigger {
    '!' => {
      for project in ctx.projects.values() {
        for merge_request in project.merge_requests.values() {
          items.push(completion_item(merge_request, '!', &project.path));
        }
      }
    }
    '#' => {
      for project in ctx.projects.values() {
        for issue in project.issues.values() {
          items.push(completion_item(issue, '#', &project.path));
        }
      }
    }
    _ => {}
  }
  items
}

fn completion_item(record: &GitlabObject, prefix: char, project_path: &str) -> CompletionItem {
  let kind = if record.state == ObjectState::Opened {
    CompletionItemKind::METHOD
  } else {
    CompletionItemKind::TEXT
  };
  CompletionItem {
    label: format!("{}{} {}", prefix, record.id, record.title),
    kind: Some(kind),
    label_details: Some(CompletionItemLabelDetails {
      detail: Some(project_path.to_string()),
      description: None,
    }),
    ..Default::default()
  }
}
