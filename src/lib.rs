//! Editor-integrated awareness of GitLab issues and merge requests.
//!
//! The core is a per-project incremental index of remote objects: loaded
//! from a persisted snapshot, reconciled against GitLab by [`sync::SyncEngine`],
//! and queried by [`resolver::ReferenceResolver`] on behalf of the
//! completion/hover/diagnostics handlers. The editor-protocol transport is
//! an external collaborator; it drives the handlers with document text and
//! cursor context and forwards progress notifications.

pub mod config;
pub mod gitlab;
pub mod handlers;
pub mod resolver;
pub mod store;
pub mod sync;
