//! Error types for the dispatch engine.
//!
//! These cover purely structural failures: malformed templates, and
//! OpenAPI documents missing the shape the ingestor expects. Transport
//! failures (HTTP, MQTT) live in `bridge-transport` and are surfaced to
//! callers of this crate through the response envelope, not as
//! `BridgeCoreError` variants — the trie and route types never touch the
//! network.

use thiserror::Error;

/// Errors raised while parsing templates or ingesting an OpenAPI document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeCoreError {
    /// A path segment used `{}` with an empty placeholder name.
    #[error("malformed template '{0}': empty placeholder")]
    MalformedTemplate(String),

    /// A path contained an empty intermediate segment (from `//`).
    #[error("malformed template '{0}': empty segment")]
    EmptySegment(String),

    /// The parsed OpenAPI document did not contain a `paths` object.
    #[error("OpenAPI document missing 'paths' object")]
    MissingPaths,

    /// A path entry in the OpenAPI document was not a JSON object of methods.
    #[error("OpenAPI path '{0}' is not an object of methods")]
    MalformedPathEntry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_stable() {
        let e = BridgeCoreError::MalformedTemplate("/api/{}/x".to_string());
        assert_eq!(
            e.to_string(),
            "malformed template '/api/{}/x': empty placeholder"
        );
    }
}
