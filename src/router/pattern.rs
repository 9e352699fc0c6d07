//! Path pattern parsing and segment-wise matching.
//!
//! A pattern such as `/posts/{id}` or `/archive/{year}/{slug}.{_format}` is
//! split on `/` into segments. Segments without placeholders compare
//! literally; segments with placeholders compile to an anchored regex with one
//! named group per variable, constrained by the variable's requirement (or
//! any non-empty text when unconstrained).
//!
//! Matching runs against percent-decoded segments, and expansion percent-encodes
//! values, so a value containing `/` still lands in a single segment.

use super::core::ParamVec;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

static VARIABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
});

const DEFAULT_REQUIREMENT: &str = ".+";

/// Reason a pattern or its requirements failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    MissingLeadingSlash,
    UnbalancedBraces { segment: String },
    EmptyPlaceholder { segment: String },
    InvalidVariableName { name: String },
    DuplicateVariable { name: String },
    AdjacentPlaceholders { segment: String },
    /// The requirement regex does not compile; carries the regex error text
    InvalidRequirement { variable: String, error: String },
    UnknownRequirement { variable: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::MissingLeadingSlash => write!(f, "pattern must start with '/'"),
            PatternError::UnbalancedBraces { segment } => {
                write!(f, "unbalanced braces in segment '{}'", segment)
            }
            PatternError::EmptyPlaceholder { segment } => {
                write!(f, "empty placeholder in segment '{}'", segment)
            }
            PatternError::InvalidVariableName { name } => {
                write!(f, "invalid variable name '{}'", name)
            }
            PatternError::DuplicateVariable { name } => {
                write!(f, "variable '{}' appears more than once", name)
            }
            PatternError::AdjacentPlaceholders { segment } => {
                write!(
                    f,
                    "placeholders in segment '{}' need literal text between them",
                    segment
                )
            }
            PatternError::InvalidRequirement { variable, error } => {
                write!(f, "requirement for '{}' is not a valid regex: {}", variable, error)
            }
            PatternError::UnknownRequirement { variable } => {
                write!(f, "requirement names '{}' which is not a pattern variable", variable)
            }
        }
    }
}

impl std::error::Error for PatternError {}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Variable(Arc<str>),
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Dynamic {
        regex: Regex,
        /// `(group name, variable)` in segment order
        groups: Vec<(String, Arc<str>)>,
    },
}

/// Compiled matcher for one route pattern.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    segments: Vec<Segment>,
    pieces: Vec<Vec<Piece>>,
    variables: Vec<Arc<str>>,
    /// Anchored whole-value requirement regexes, used when expanding.
    requirements: HashMap<Arc<str>, Regex>,
}

fn strip_anchors(requirement: &str) -> &str {
    let r = requirement.strip_prefix('^').unwrap_or(requirement);
    r.strip_suffix('$').unwrap_or(r)
}

fn parse_segment(segment: &str) -> Result<Vec<Piece>, PatternError> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut open: Option<String> = None;

    for ch in segment.chars() {
        match ch {
            '{' => {
                if open.is_some() {
                    return Err(PatternError::UnbalancedBraces {
                        segment: segment.to_string(),
                    });
                }
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                } else if matches!(pieces.last(), Some(Piece::Variable(_))) {
                    return Err(PatternError::AdjacentPlaceholders {
                        segment: segment.to_string(),
                    });
                }
                open = Some(String::new());
            }
            '}' => {
                let Some(name) = open.take() else {
                    return Err(PatternError::UnbalancedBraces {
                        segment: segment.to_string(),
                    });
                };
                if name.is_empty() {
                    return Err(PatternError::EmptyPlaceholder {
                        segment: segment.to_string(),
                    });
                }
                if !VARIABLE_NAME.is_match(&name) {
                    return Err(PatternError::InvalidVariableName { name });
                }
                pieces.push(Piece::Variable(Arc::from(name)));
            }
            c => match open.as_mut() {
                Some(name) => name.push(c),
                None => literal.push(c),
            },
        }
    }

    if open.is_some() {
        return Err(PatternError::UnbalancedBraces {
            segment: segment.to_string(),
        });
    }
    if !literal.is_empty() || pieces.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

impl PathMatcher {
    /// Parse `pattern` and compile it against `requirements`.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] for malformed placeholders, duplicate
    /// variables, requirement regexes that do not compile, or requirements
    /// naming variables the pattern does not contain.
    pub fn compile(
        pattern: &str,
        requirements: &BTreeMap<String, String>,
    ) -> Result<Self, PatternError> {
        let rest = pattern
            .strip_prefix('/')
            .ok_or(PatternError::MissingLeadingSlash)?;

        let mut pieces = Vec::new();
        let mut variables: Vec<Arc<str>> = Vec::new();
        for raw in rest.split('/') {
            let parsed = parse_segment(raw)?;
            for piece in &parsed {
                if let Piece::Variable(name) = piece {
                    if variables.contains(name) {
                        return Err(PatternError::DuplicateVariable {
                            name: name.to_string(),
                        });
                    }
                    variables.push(Arc::clone(name));
                }
            }
            pieces.push(parsed);
        }

        let mut anchored = HashMap::with_capacity(requirements.len());
        for (variable, requirement) in requirements {
            let Some(var) = variables
                .iter()
                .position(|v| &**v == variable.as_str())
                .and_then(|idx| variables.get(idx))
            else {
                return Err(PatternError::UnknownRequirement {
                    variable: variable.clone(),
                });
            };
            let regex = Regex::new(&format!("^(?s:{})$", strip_anchors(requirement))).map_err(
                |error| PatternError::InvalidRequirement {
                    variable: variable.clone(),
                    error: error.to_string(),
                },
            )?;
            anchored.insert(Arc::clone(var), regex);
        }

        let mut segments = Vec::with_capacity(pieces.len());
        for segment_pieces in &pieces {
            if let [Piece::Literal(lit)] = segment_pieces.as_slice() {
                segments.push(Segment::Literal(lit.clone()));
                continue;
            }
            let mut source = String::from("^(?s:");
            let mut groups = Vec::new();
            for piece in segment_pieces {
                match piece {
                    Piece::Literal(lit) => source.push_str(&regex::escape(lit)),
                    Piece::Variable(var) => {
                        let group = format!("rb_{}", groups.len());
                        let requirement = requirements
                            .get(&**var)
                            .map(|r| strip_anchors(r))
                            .unwrap_or(DEFAULT_REQUIREMENT);
                        source.push_str(&format!("(?P<{}>(?:{}))", group, requirement));
                        groups.push((group, Arc::clone(var)));
                    }
                }
            }
            source.push_str(")$");
            let regex = Regex::new(&source).map_err(|error| {
                let variable = groups
                    .last()
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
                PatternError::InvalidRequirement {
                    variable,
                    error: error.to_string(),
                }
            })?;
            segments.push(Segment::Dynamic { regex, groups });
        }

        Ok(PathMatcher {
            segments,
            pieces,
            variables,
            requirements: anchored,
        })
    }

    /// Placeholder names in pattern order.
    pub fn variables(&self) -> &[Arc<str>] {
        &self.variables
    }

    /// Match a request path (any `?query` suffix is ignored).
    ///
    /// Returns the decoded variable bindings in pattern order, or `None` when
    /// any segment fails to match, the segment count differs, or a segment is
    /// not valid percent-encoded UTF-8.
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        let rest = path.strip_prefix('/')?;
        let mut parts = rest.split('/');
        let mut params = ParamVec::new();

        for segment in &self.segments {
            let raw = parts.next()?;
            let decoded = urlencoding::decode(raw).ok()?;
            match segment {
                Segment::Literal(lit) => {
                    if decoded != lit.as_str() {
                        return None;
                    }
                }
                Segment::Dynamic { regex, groups } => {
                    let caps = regex.captures(&decoded)?;
                    for (group, var) in groups {
                        let value = caps.name(group)?.as_str();
                        params.push((Arc::clone(var), value.to_string()));
                    }
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }

    /// Check a value against the variable's requirement. Unconstrained
    /// variables accept any non-empty value.
    pub fn accepts(&self, variable: &str, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        self.requirements
            .get(variable)
            .map_or(true, |re| re.is_match(value))
    }

    /// Build a concrete path, percent-encoding each variable value.
    ///
    /// `lookup` supplies values; the first variable it cannot supply is
    /// returned as the error.
    pub fn expand<'a, F>(&self, lookup: F) -> Result<String, Arc<str>>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut path = String::new();
        for segment in &self.pieces {
            path.push('/');
            for piece in segment {
                match piece {
                    Piece::Literal(lit) => path.push_str(lit),
                    Piece::Variable(var) => {
                        let value = lookup(&**var).ok_or_else(|| Arc::clone(var))?;
                        path.push_str(&urlencoding::encode(value));
                    }
                }
            }
        }
        Ok(path)
    }
}
