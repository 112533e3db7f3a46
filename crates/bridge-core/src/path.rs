//! Template paths: ordered sequences of static/dynamic segments.
//!
//! A template path is the shared vocabulary of both HTTP path templates
//! (`/api/v1/iface/{name}/stats`) and MQTT template topics
//! (`wlan-pi/d1/api/v1/iface/{name}/stats/get`) — both are split on `/`
//! and matched segment-by-segment.

use crate::error::BridgeCoreError;

/// A single path segment: either a literal token or a `{name}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal path component, matched exactly.
    Static(String),
    /// A `{name}` placeholder. `literal` retains the original `{name}`
    /// token (used when rendering back to a string); `placeholder` is the
    /// bare name.
    Dynamic { literal: String, placeholder: String },
}

impl Segment {
    /// The original token as it appeared in the template.
    pub fn literal(&self) -> &str {
        match self {
            Segment::Static(s) => s,
            Segment::Dynamic { literal, .. } => literal,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Segment::Dynamic { .. })
    }
}

/// An ordered sequence of [`Segment`]s parsed from a path or topic string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplatePath {
    pub segments: Vec<Segment>,
}

impl TemplatePath {
    /// Parse a path string, splitting on `/` and tagging each token as
    /// static or dynamic. A leading `/` is discarded; any other empty
    /// segment (from `//`) is rejected.
    pub fn parse(s: &str) -> Result<Self, BridgeCoreError> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);

        if trimmed.is_empty() {
            return Ok(TemplatePath { segments: Vec::new() });
        }

        let mut segments = Vec::new();
        for token in trimmed.split('/') {
            if token.is_empty() {
                return Err(BridgeCoreError::EmptySegment(s.to_string()));
            }
            segments.push(parse_token(token, s)?);
        }
        Ok(TemplatePath { segments })
    }

    /// Render the segments back into a `/`-joined path string (the
    /// inverse of [`TemplatePath::parse`], modulo the leading slash).
    pub fn join(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.literal())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn parse_token(token: &str, whole: &str) -> Result<Segment, BridgeCoreError> {
    if let Some(inner) = token.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        if inner.is_empty() {
            return Err(BridgeCoreError::MalformedTemplate(whole.to_string()));
        }
        Ok(Segment::Dynamic {
            literal: token.to_string(),
            placeholder: inner.to_string(),
        })
    } else {
        Ok(Segment::Static(token.to_string()))
    }
}
