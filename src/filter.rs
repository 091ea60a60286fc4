//! filter — include/exclude pattern sets over relative paths.
//!
//! Shell-style matching (glob::Pattern): `*`, `?`, `[...]`; `*` crosses
//! path separators, fnmatch-style. Patterns are matched against the full
//! path relative to the walk root ("sub/dir/file.txt").
//!
//! Semantics: an entry is allowed iff it matches at least one include
//! pattern (an empty include set allows everything) and matches no exclude
//! pattern. A directory that is not allowed prunes its whole subtree, so
//! include patterns must cover parent directories of what they keep.

use std::path::Path;

use crate::errors::{Error, Result};

/// Ordered set of compiled patterns; membership is "any match".
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<glob::Pattern>,
}

impl PatternSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut out = Vec::with_capacity(patterns.len());
        for p in patterns {
            let p = p.as_ref();
            let compiled = glob::Pattern::new(p)
                .map_err(|e| Error::invalid(format!("bad pattern '{}': {}", p, e)))?;
            out.push(compiled);
        }
        Ok(Self { patterns: out })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, rel: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(rel))
    }
}

/// Include/exclude filter for a tree walk.
#[derive(Debug, Clone, Default)]
pub struct TreeFilter {
    include: PatternSet,
    exclude: PatternSet,
}

impl TreeFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: PatternSet::compile(include)?,
            exclude: PatternSet::compile(exclude)?,
        })
    }

    /// Filter that allows every entry.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Is the entry at this relative path part of the snapshot?
    pub fn allows(&self, rel: &Path) -> bool {
        let s = rel.to_string_lossy();
        if !self.include.is_empty() && !self.include.matches(&s) {
            return false;
        }
        !self.exclude.matches(&s)
    }
}
