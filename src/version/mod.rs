// src/version/mod.rs

//! Loose version handling for pkginfo records
//!
//! Munki versions are free-form dotted strings ("10.6.8", "1.0b3",
//! "2.3.0-abc1"). They are compared component-wise:
//! - split on `.`, then on every digit/non-digit transition
//!   (`10.6.0-abc1` → `[10, 6, 0, "-abc", 1]`)
//! - digit runs compare numerically, other runs as strings
//! - a numeric component is always less than a text component
//! - the shorter sequence is right-padded with `0` before comparing

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static COMPONENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+|\D+").expect("component regex is valid"));

/// One component of a tokenized version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionToken {
    Number(u64),
    Text(String),
}

impl VersionToken {
    fn compare(&self, other: &VersionToken) -> Ordering {
        match (self, other) {
            (VersionToken::Number(a), VersionToken::Number(b)) => a.cmp(b),
            (VersionToken::Text(a), VersionToken::Text(b)) => a.cmp(b),
            (VersionToken::Number(_), VersionToken::Text(_)) => Ordering::Less,
            (VersionToken::Text(_), VersionToken::Number(_)) => Ordering::Greater,
        }
    }
}

const ZERO: VersionToken = VersionToken::Number(0);

/// Split a version string into comparable components
pub fn tokenize(version: &str) -> Vec<VersionToken> {
    version
        .split('.')
        .flat_map(|segment| COMPONENT_RE.find_iter(segment))
        .map(|run| {
            let text = run.as_str();
            if text.as_bytes()[0].is_ascii_digit() {
                // Digit runs too long for u64 still order as text
                text.parse::<u64>()
                    .map(VersionToken::Number)
                    .unwrap_or_else(|_| VersionToken::Text(text.to_string()))
            } else {
                VersionToken::Text(text.to_string())
            }
        })
        .collect()
}

/// Compare two version strings loosely
pub fn compare(a: &str, b: &str) -> Ordering {
    compare_tokens(&tokenize(a), &tokenize(b))
}

fn compare_tokens(a: &[VersionToken], b: &[VersionToken]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).unwrap_or(&ZERO);
        let right = b.get(i).unwrap_or(&ZERO);
        match left.compare(right) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    Ordering::Equal
}

/// Trim lone trailing `0` components after major.minor
///
/// Examples:
/// - "10.0.0.0" → "10.0"
/// - "10.0.0.1" → "10.0.0.1"
/// - "10.0.0-abc1.0" → "10.0.0-abc1"
pub fn trim_version_string(version: &str) -> String {
    if version.is_empty() {
        return String::new();
    }
    let mut parts: Vec<&str> = version.split('.').collect();
    while parts.len() > 2 && parts.last() == Some(&"0") {
        parts.pop();
    }
    parts.join(".")
}

/// A version string ordered by [`compare`]
#[derive(Debug, Clone)]
pub struct LooseVersion {
    raw: String,
    tokens: Vec<VersionToken>,
}

impl LooseVersion {
    pub fn new(version: impl Into<String>) -> Self {
        let raw = version.into();
        let tokens = tokenize(&raw);
        Self { raw, tokens }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn tokens(&self) -> &[VersionToken] {
        &self.tokens
    }
}

impl fmt::Display for LooseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LooseVersion {}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_tokens(&self.tokens, &other.tokens)
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
