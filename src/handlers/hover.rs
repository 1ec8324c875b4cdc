use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range};

use super::FeatureContext;

/// Hover text for the reference URL under the cursor, if any.
///
/// The document source supplies the line's text; the bare word around the
/// cursor is resolved as an anchored URL. The returned range covers the
/// hovered line.
pub fn hover(ctx: &FeatureContext, line: &str, position: Position) -> Option<Hover> {
  let word = word_at(line, position.character as usize);
  let record = ctx.resolver.resolve_url(word, &ctx.projects)?;

  Some(Hover {
    contents: HoverContents::Markup(MarkupContent {
      kind: MarkupKind::Markdown,
      value: format!("{}\n-----\n{}", record.title, record.description),
    }),
    range: Some(Range {
      start: Position {
        line: position.line,
        character: 0,
      },
      end: Position {
        line: position.line + 1,
        character: 0,
      },
    }),
  })
}

/// The maximal run of non-whitespace around a cursor offset.
pub fn word_at(line: &str, character: usize) -> &str {
  let mut idx = character.min(line.len());
  while !line.is_char_boundary(idx) {
    idx -= 1;
  }

  let start = line[..idx]
    .char_indices()
    .rev()
    .find(|(_, c)| c.is_whitespace())
    .map(|(i, c)| i + c.len_utf8())
    .unwrap_or(0);
  let end = line[idx..]
    .find(char::is_whitespace)
    .map(|i| idx + i)
    .unwrap_or(line.len());

  &line[start..end]
}
