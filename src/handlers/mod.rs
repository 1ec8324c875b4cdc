//! Editor-feature handlers: completion, diagnostics, hover.
//!
//! Thin consumers of the reference resolver and the in-memory index. The
//! protocol transport hands them document text and cursor context and maps
//! the returned lsp-types values onto the wire.

pub mod completion;
pub mod diagnostics;
pub mod hover;

use crate::gitlab::types::ProjectSet;
use crate::resolver::ReferenceResolver;

/// State shared by every feature handler for one session.
///
/// Owned by the caller and passed into each handler explicitly; the project
/// set is read-only here, only the sync engine mutates it.
pub struct FeatureContext {
  pub projects: ProjectSet,
  pub resolver: ReferenceResolver,
}

impl FeatureContext {
  pub fn new(projects: ProjectSet, resolver: ReferenceResolver) -> Self {
    Self { projects, resolver }
  }
}
