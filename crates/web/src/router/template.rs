use std::collections::HashSet;

use crate::error::RegistrationError;
use crate::PathParams;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
    /// Absorbs the remaining segments, optionally capturing them
    Wildcard(Option<String>),
}

/// A compiled route template such as `/users/{id}/files/{rest:*}`.
///
/// Empty segments are ignored, so `/a//b/` and `/a/b` are the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, RegistrationError> {
        let mut segments = Vec::new();
        let mut names = HashSet::new();
        let parts: Vec<&str> = split_path(template).collect();

        for (index, part) in parts.iter().enumerate() {
            let segment = parse_segment(template, part)?;

            if matches!(segment, Segment::Wildcard(_)) && index + 1 != parts.len() {
                return Err(RegistrationError::invalid_template(template, "wildcard must be the last segment"));
            }

            if let Segment::Capture(name) | Segment::Wildcard(Some(name)) = &segment
                && !names.insert(name.clone())
            {
                return Err(RegistrationError::invalid_template(template, format!("duplicate capture name '{name}'")));
            }

            segments.push(segment);
        }

        Ok(Self { raw: template.to_owned(), segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of literal segments; more literals means a more specific template.
    pub fn literal_count(&self) -> usize {
        self.segments.iter().filter(|segment| matches!(segment, Segment::Literal(_))).count()
    }

    /// Matches `path`, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut parts = split_path(path);
        let mut params = PathParams::empty();

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    if parts.next()? != literal {
                        return None;
                    }
                }
                Segment::Capture(name) => params.push(name, parts.next()?.to_owned()),
                Segment::Wildcard(name) => {
                    let rest = parts.by_ref().collect::<Vec<_>>().join("/");
                    if let Some(name) = name {
                        params.push(name, rest);
                    }
                    return Some(params);
                }
            }
        }

        parts.next().is_none().then_some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

fn parse_segment(template: &str, part: &str) -> Result<Segment, RegistrationError> {
    if part == "*" {
        return Ok(Segment::Wildcard(None));
    }

    let Some(inner) = part.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) else {
        if part.contains(['{', '}']) {
            return Err(RegistrationError::invalid_template(template, format!("malformed segment '{part}'")));
        }
        return Ok(Segment::Literal(part.to_owned()));
    };

    let (name, wildcard) = match inner.strip_suffix(":*") {
        Some(name) => (name.trim(), true),
        None => (inner.trim(), false),
    };

    if name.is_empty() {
        return Err(RegistrationError::invalid_template(template, "empty capture name"));
    }
    if name.contains(['{', '}', ':', '*']) {
        return Err(RegistrationError::invalid_template(template, format!("invalid capture name '{name}'")));
    }

    let name = name.to_owned();
    Ok(if wildcard { Segment::Wildcard(Some(name)) } else { Segment::Capture(name) })
}
