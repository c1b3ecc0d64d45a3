//! Storage backends.
//!
//! Backends implement [`Backend`](crate::Backend) for different storage types.

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

use globset::{GlobBuilder, GlobMatcher};
use strata_core::{BackendError, BackendResult};

/// Compile a `find` query into a case-insensitive file name matcher.
///
/// A query without glob metacharacters matches names containing it.
fn query_matcher(query: &str) -> BackendResult<GlobMatcher> {
    let pattern = if query.contains(['*', '?', '[', '{']) {
        query.to_string()
    } else {
        format!("*{query}*")
    };
    GlobBuilder::new(&pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| BackendError::other(format!("invalid query '{query}': {e}")))
}
