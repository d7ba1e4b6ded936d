//! Path pattern matching.
//!
//! # Responsibilities
//! - Split a route pattern into literal and parameter segments
//! - Compare a request path segment by segment
//! - Bind `:name` segments to the literal request text
//!
//! # Design Decisions
//! - Byte-exact comparison, case-sensitive
//! - Segment counts must be equal (no prefix or catch-all matching)
//! - Parameter values are never decoded, trimmed or coerced
//! - No regex: a pattern is a flat list of segments

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A `/`-delimited route template such as `/users/:id/posts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Split the pattern on `/`. Any segment starting with `:` is a parameter.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = raw
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Literal(segment.to_owned()),
            })
            .collect();

        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of `/`-separated segments, including empty ones.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Names of the parameter segments, in pattern order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns true if `path` has the same number of segments and every
    /// literal segment is byte-equal to the corresponding path segment.
    pub fn matches(&self, path: &str) -> bool {
        let mut parts = path.split('/');

        for segment in &self.segments {
            let Some(part) = parts.next() else {
                return false;
            };
            if let Segment::Literal(literal) = segment {
                if literal != part {
                    return false;
                }
            }
        }

        parts.next().is_none()
    }

    /// Bind every parameter segment to the literal text of `path` at the same
    /// position. A path with a different segment count yields no parameters.
    ///
    /// When a name appears twice, the rightmost binding wins.
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return HashMap::new();
        }

        self.segments
            .iter()
            .zip(parts)
            .filter_map(|(segment, part)| match segment {
                Segment::Param(name) => Some((name.clone(), part.to_owned())),
                Segment::Literal(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
