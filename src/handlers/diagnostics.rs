use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::gitlab::types::ObjectState;

use super::FeatureContext;

/// One diagnostic per resolvable reference in the document, carrying the
/// object's state as the message.
///
/// Opened objects are hints, merged ones informational, everything else
/// (closed) an error.
pub fn diagnostics(ctx: &FeatureContext, text: &str) -> Vec<Diagnostic> {
  let mut diagnostics = Vec::new();
  for (line_nr, line) in text.lines().enumerate() {
    for (record, start, end) in ctx.resolver.find_references(line, &ctx.projects) {
      let severity = match record.state {
        ObjectState::Opened => DiagnosticSeverity::HINT,
        ObjectState::Merged => DiagnosticSeverity::INFORMATION,
        ObjectState::Closed => DiagnosticSeverity::ERROR,
      };
      diagnostics.push(Diagnostic {
        range: Range {
          start: Position {
            line: line_nr as u32,
            character: start as u32,
          },
          end: Position {
            line: line_nr as u32,
            character: end as u32,
          },
        },
        severity: Some(severity),
        message: record.state.as_str().to_string(),
        ..Default::default()
      });
    }
  }
  diagnostics
}
