//! Route template parsing.
//!
//! A deliberately small, total parser for route patterns like
//! `/todos/{id:int}`. Every input string parses to some template; malformed
//! braces degrade to literal segments rather than failing, because route
//! strings reach this engine unvalidated.

use std::fmt;

/// One `/`-delimited piece of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain text, e.g. `todos`.
    Literal(String),
    /// A brace parameter. `name` excludes the constraint and any
    /// optional/catch-all markers, so `{id:int?}` yields `id`.
    Parameter { name: String, raw: String },
}

impl Segment {
    /// The text of a literal segment.
    pub fn literal(&self) -> Option<&str> {
        match self {
            Segment::Literal(text) => Some(text),
            Segment::Parameter { .. } => None,
        }
    }

    /// The parameter name, when this segment is one.
    pub fn parameter_name(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Parameter { name, .. } => Some(name),
        }
    }
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    /// Whether the pattern began with `/`.
    pub rooted: bool,
    /// Segments in order. Empty segments from `//` or a trailing `/` are
    /// dropped.
    pub segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Parse a route pattern. Total: never fails.
    pub fn parse(pattern: &str) -> RouteTemplate {
        let rooted = pattern.starts_with('/');
        let segments = pattern
            .split('/')
            .filter(|piece| !piece.is_empty())
            .map(parse_segment)
            .collect();
        RouteTemplate { rooted, segments }
    }

    /// First segment, when any.
    pub fn first_segment(&self) -> Option<&Segment> {
        self.segments.first()
    }

    /// Last literal segment, scanning from the end. This is the resource
    /// noun of patterns like `/api/todos/{id}`.
    pub fn resource_segment(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(Segment::literal)
    }

    /// Last parameter segment's name, scanning from the end.
    pub fn last_parameter(&self) -> Option<&str> {
        self.segments
            .iter()
            .rev()
            .find_map(Segment::parameter_name)
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rooted {
            write!(f, "/")?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            match segment {
                Segment::Literal(text) => write!(f, "{text}")?,
                Segment::Parameter { raw, .. } => write!(f, "{{{raw}}}")?,
            }
        }
        Ok(())
    }
}

fn parse_segment(piece: &str) -> Segment {
    let inner = match piece.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
        Some(inner) if !inner.is_empty() => inner,
        _ => return Segment::Literal(piece.to_string()),
    };
    // Strip catch-all marker, constraint, default, and optional marker:
    // {*path}, {id:int}, {id=7}, {id?}.
    let name = inner
        .trim_start_matches(['*', '{'])
        .split([':', '=', '?'])
        .next()
        .unwrap_or("")
        .to_string();
    Segment::Parameter {
        name,
        raw: inner.to_string(),
    }
}
