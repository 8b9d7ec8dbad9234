//! Source-pattern / destination rules deciding what gets downloaded where.

use crate::error::SyncError;
use crate::metadata::{extract, has_placeholders};
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A `(source pattern, destination template)` pair.
///
/// The source pattern is a regex over root-relative remote paths, always
/// starting with `/`. A pattern ending in `/` matches everything below that
/// folder, so `TV/` behaves like `/TV/.+`.
///
/// The destination may contain `{kind}` placeholders (see
/// [`MetadataBag::render`](crate::metadata::MetadataBag::render)), filled
/// from the matched remote path.
#[derive(Debug, Clone)]
pub struct Rule {
    source: String,
    source_re: Regex,
    destination: String,
}

impl Rule {
    pub fn new(source: &str, destination: impl Into<String>) -> Result<Self, SyncError> {
        let mut source = source.to_string();
        if source.ends_with('/') {
            source.push_str(".+");
        }
        if !source.starts_with('/') {
            source.insert(0, '/');
        }

        // Anchored at the start only; the pattern need not consume the whole path.
        let source_re =
            Regex::new(&format!("^(?:{})", source)).map_err(|e| SyncError::InvalidPattern {
                pattern: source.clone(),
                source: e,
            })?;

        Ok(Self {
            source,
            source_re,
            destination: destination.into(),
        })
    }

    /// Normalized source pattern.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn matches(&self, path: &str) -> bool {
        self.source_re.is_match(path)
    }

    /// Local folder that the content of `parent_path` maps to, for a match on
    /// `matched_path` (a child of `parent_path`).
    ///
    /// Returns `None` when the destination has placeholders that the matched
    /// path provides no metadata for.
    pub fn resolve(&self, parent_path: &str, matched_path: &str) -> Option<PathBuf> {
        let base = if has_placeholders(&self.destination) {
            extract(matched_path).render(&self.destination)?
        } else {
            self.destination.clone()
        };

        let relative = parent_path.trim_start_matches('/');
        let mut dest = PathBuf::from(base);
        if !relative.is_empty() {
            dest.push(relative);
        }
        Some(dest)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"put.io:{}\" -> \"{}\"", self.source, self.destination)
    }
}

impl FromStr for Rule {
    type Err = SyncError;

    /// Parses `SRC=DST`, splitting on the first `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((source, destination)) if !source.is_empty() && !destination.is_empty() => {
                Rule::new(source, destination)
            }
            _ => Err(SyncError::InvalidRule(s.to_string())),
        }
    }
}

/// Rules evaluated in order; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn find(&self, path: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
