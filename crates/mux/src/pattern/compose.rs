//! AND-composition of patterns.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::env::Environment;
use crate::pattern::Pattern;
use crate::request::RequestContext;

/// The composition of an ordered sequence of patterns, matching only if
/// every sub-pattern matches.
///
/// Sub-patterns run left to right, each one's output environment feeding
/// the next as its inherited environment; the first failure aborts the
/// whole composition. Because environments are immutable snapshots, no
/// partial binding survives a failed composition. Composing zero patterns
/// always matches and leaves the environment unchanged.
///
/// The composed optimization hints are derived once at construction: the
/// method set is the intersection of every declaring sub-pattern's set
/// (`None` if none declare one), and the path prefix is the first
/// non-empty prefix declared by any sub-pattern in order.
pub struct Composed {
    patterns: Vec<Arc<dyn Pattern>>,
    methods: Option<HashSet<Method>>,
    prefix: Option<String>,
}

/// Returns a new pattern which is the composition of the given patterns.
pub fn compose<I>(patterns: I) -> Composed
where
    I: IntoIterator<Item = Arc<dyn Pattern>>,
{
    let patterns: Vec<_> = patterns.into_iter().collect();
    let methods = intersect_methods(&patterns);
    let prefix = patterns.iter().filter_map(|p| p.path_prefix()).find(|p| !p.is_empty()).map(str::to_string);
    Composed { patterns, methods, prefix }
}

fn intersect_methods(patterns: &[Arc<dyn Pattern>]) -> Option<HashSet<Method>> {
    let mut out: Option<HashSet<Method>> = None;
    for pattern in patterns {
        if let Some(methods) = pattern.http_methods() {
            out = Some(match out {
                None => methods.clone(),
                Some(acc) => acc.intersection(methods).cloned().collect(),
            });
        }
    }
    out
}

impl Pattern for Composed {
    fn matches(&self, env: &Environment, req: &RequestContext) -> Option<Environment> {
        let mut env = env.clone();
        for pattern in &self.patterns {
            env = pattern.matches(&env, req)?;
        }
        Some(env)
    }

    fn http_methods(&self) -> Option<&HashSet<Method>> {
        self.methods.as_ref()
    }

    fn path_prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

impl fmt::Debug for Composed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composed")
            .field("patterns", &self.patterns.len())
            .field("methods", &self.methods)
            .field("prefix", &self.prefix)
            .finish()
    }
}
