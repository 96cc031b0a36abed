//! Cached pattern matching for file inclusion decisions.
//!
//! Glob patterns are matched against the file's base name only; regex
//! patterns run an unanchored search over the full path string. Every
//! `(path, pattern)` decision is memoized in a cache scoped to one job.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::config::{PatternKind, PatternSpec};
use crate::errors::{CollectorError, CollectorResult};

enum Compiled {
    Glob(GlobMatcher),
    Regex(Regex),
}

struct CompiledPattern {
    spec: PatternSpec,
    compiled: Compiled,
}

/// Per-job pattern matcher with a memoization cache.
///
/// All patterns are compiled up front; a malformed pattern is rejected here
/// with the offending pattern in the message, never discovered mid-scan.
pub struct PatternMatcher {
    patterns: Vec<CompiledPattern>,
    cache: RwLock<HashMap<String, bool>>,
}

impl PatternMatcher {
    pub fn new(specs: &[PatternSpec]) -> CollectorResult<Self> {
        let mut patterns = Vec::with_capacity(specs.len());

        for spec in specs {
            let compiled = match spec.kind {
                PatternKind::Glob => Compiled::Glob(
                    Glob::new(&spec.pattern)
                        .map_err(|e| {
                            CollectorError::Validation(format!(
                                "invalid glob pattern '{}': {}",
                                spec.pattern, e
                            ))
                        })?
                        .compile_matcher(),
                ),
                PatternKind::Regex => Compiled::Regex(Regex::new(&spec.pattern).map_err(|e| {
                    CollectorError::Validation(format!(
                        "invalid regex pattern '{}': {}",
                        spec.pattern, e
                    ))
                })?),
            };

            patterns.push(CompiledPattern {
                spec: spec.clone(),
                compiled,
            });
        }

        Ok(PatternMatcher {
            patterns,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// True when no patterns are configured, in which case every file matches.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First pattern matching `path`, if any. Empty pattern lists match
    /// everything and report no pattern.
    pub fn matches(&self, path: &Path) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| self.match_one(path, p))
            .map(|p| p.spec.pattern.as_str())
    }

    /// Whether `path` is included: empty patterns, or any pattern matches.
    pub fn is_included(&self, path: &Path) -> bool {
        self.patterns.is_empty() || self.matches(path).is_some()
    }

    fn match_one(&self, path: &Path, pattern: &CompiledPattern) -> bool {
        let key = format!(
            "{}::{}::{:?}",
            path.display(),
            pattern.spec.pattern,
            pattern.spec.kind
        );

        if let Some(&cached) = self.cache.read().unwrap().get(&key) {
            return cached;
        }

        let result = match &pattern.compiled {
            Compiled::Glob(matcher) => path
                .file_name()
                .map(|name| matcher.is_match(Path::new(name)))
                .unwrap_or(false),
            Compiled::Regex(regex) => regex.is_match(&path.to_string_lossy()),
        };

        self.cache.write().unwrap().insert(key, result);
        result
    }
}
