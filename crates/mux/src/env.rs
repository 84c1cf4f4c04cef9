//! Request-scoped environment: an immutable, layered key/value store.
//!
//! Every request carries an [`Environment`], a chain of immutable layers.
//! A successful pattern match seals its captured variables into a new layer
//! on top of the inherited environment; the router records the winning
//! pattern and handler as another layer. Lookups consult the newest layer
//! first and delegate to its parent, so inner bindings shadow outer ones
//! without either layer ever being mutated.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::handler::Handler;
use crate::pattern::Pattern;

/// Number of variable bindings a layer holds without touching the heap.
/// Most routes bind no more than a handful of captures.
pub(crate) const INLINE_VARS: usize = 5;

/// A builder for one environment layer.
///
/// `Storage` collects variable bindings (and, for wildcard patterns, the
/// unmatched path remainder) and seals them into an [`Environment`] layer
/// with [`Storage::bind`]. The default value is empty and ready for use.
/// `Storage` itself is not shared between tasks; the sealed layer is.
#[derive(Debug, Default)]
pub struct Storage {
    path: String,
    len: usize,
    values: [(String, String); INLINE_VARS],
    overflow: Option<HashMap<String, String>>,
}

impl Storage {
    /// Adds a variable binding.
    ///
    /// The first [`INLINE_VARS`] bindings land in an inline array; once that
    /// capacity is exceeded, all bindings migrate to an overflow map so
    /// subsequent lookups are uniform.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        if let Some(overflow) = &mut self.overflow {
            overflow.insert(key, value);
        } else if self.len < INLINE_VARS {
            self.values[self.len] = (key, value);
            self.len += 1;
        } else {
            let mut overflow = HashMap::with_capacity(self.len + 1);
            for (k, v) in &self.values {
                overflow.insert(k.clone(), v.clone());
            }
            overflow.insert(key, value);
            self.overflow = Some(overflow);
        }
    }

    /// Sets the routing path the sealed layer will report. Wildcard patterns
    /// use this to carry the unmatched suffix forward; when unset, the empty
    /// path is reported.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Seals the current bindings into a new immutable layer on top of
    /// `parent`.
    ///
    /// The returned environment is a point-in-time snapshot: reusing or
    /// mutating this `Storage` afterwards has no effect on it. The overflow
    /// map, if any, is copied for that reason.
    pub fn bind(&self, parent: &Environment) -> Environment {
        let snapshot = Snapshot {
            path: self.path.clone(),
            len: self.len,
            values: self.values.clone(),
            overflow: self.overflow.clone(),
        };
        Environment { head: Some(Arc::new(Layer::Vars { parent: parent.clone(), snapshot })) }
    }
}

/// The sealed, immutable contents of one variable layer.
#[derive(Clone)]
struct Snapshot {
    path: String,
    len: usize,
    values: [(String, String); INLINE_VARS],
    overflow: Option<HashMap<String, String>>,
}

impl Snapshot {
    fn get(&self, name: &str) -> Option<&str> {
        if let Some(overflow) = &self.overflow {
            return overflow.get(name).map(String::as_str);
        }
        self.values[..self.len].iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    fn collect_into(&self, out: &mut HashMap<String, String>) {
        if let Some(overflow) = &self.overflow {
            for (k, v) in overflow {
                out.insert(k.clone(), v.clone());
            }
        } else {
            for (k, v) in &self.values[..self.len] {
                out.insert(k.clone(), v.clone());
            }
        }
    }
}

enum Layer {
    /// The seeded routing path, placed at the bottom of the chain by the
    /// dispatcher when no path is present yet.
    Path { parent: Environment, path: String },
    /// Variable bindings sealed by [`Storage::bind`].
    Vars { parent: Environment, snapshot: Snapshot },
    /// The routing decision. `None` fields record that routing ran and
    /// found nothing, shadowing any decision an outer dispatcher made.
    Match { parent: Environment, pattern: Option<Arc<dyn Pattern>>, handler: Option<Arc<dyn Handler>> },
}

/// An immutable, cheaply cloneable chain of request-scoped layers.
///
/// Cloning an `Environment` clones an `Arc`, never the layers themselves,
/// so sealed layers are safe to share across concurrent match attempts.
#[derive(Clone, Default)]
pub struct Environment {
    head: Option<Arc<Layer>>,
}

impl Environment {
    /// An empty environment with no layers.
    pub fn root() -> Self {
        Self::default()
    }

    /// Layers a routing path on top of this environment.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        Environment { head: Some(Arc::new(Layer::Path { parent: self.clone(), path: path.into() })) }
    }

    pub(crate) fn with_match(&self, pattern: Arc<dyn Pattern>, handler: Arc<dyn Handler>) -> Self {
        Environment {
            head: Some(Arc::new(Layer::Match {
                parent: self.clone(),
                pattern: Some(pattern),
                handler: Some(handler),
            })),
        }
    }

    /// Records that routing ran and selected nothing. Without this layer a
    /// sub-mux mounted under a wildcard route would observe the match that
    /// reached it and dispatch to itself forever.
    pub(crate) fn without_match(&self) -> Self {
        Environment { head: Some(Arc::new(Layer::Match { parent: self.clone(), pattern: None, handler: None })) }
    }

    /// The routing path patterns should match against, or `None` if no path
    /// has been seeded or bound yet.
    ///
    /// Variable layers always report a path: for a wildcard match it is the
    /// unmatched suffix, for an exact match it is empty, since nothing of
    /// the path remains to be routed.
    pub fn path(&self) -> Option<&str> {
        let mut cur = self.head.as_deref();
        while let Some(layer) = cur {
            match layer {
                Layer::Path { path, .. } => return Some(path),
                Layer::Vars { snapshot, .. } => return Some(&snapshot.path),
                Layer::Match { parent, .. } => cur = parent.head.as_deref(),
            }
        }
        None
    }

    /// Looks up a bound variable, newest layer first.
    pub fn variable(&self, name: &str) -> Option<&str> {
        let mut cur = self.head.as_deref();
        while let Some(layer) = cur {
            let parent = match layer {
                Layer::Vars { parent, snapshot } => {
                    if let Some(value) = snapshot.get(name) {
                        return Some(value);
                    }
                    parent
                }
                Layer::Path { parent, .. } | Layer::Match { parent, .. } => parent,
            };
            cur = parent.head.as_deref();
        }
        None
    }

    /// Returns the bound variable with the given name.
    ///
    /// It is the caller's responsibility to ensure the variable has been
    /// bound, e.g. by declaring it in the route pattern that reached the
    /// current handler.
    ///
    /// # Panics
    ///
    /// Panics if the variable was never bound in this environment chain;
    /// accessing an undeclared variable is a programming error, not a
    /// request-time condition. Use [`Environment::variable`] to probe.
    pub fn param(&self, name: &str) -> &str {
        match self.variable(name) {
            Some(value) => value,
            None => panic!("variable {name:?} is not bound in this environment"),
        }
    }

    /// All variables visible from this environment, merged root to leaf so
    /// that inner bindings win on key collisions. No layer is mutated.
    pub fn variables(&self) -> HashMap<String, String> {
        let mut snapshots = Vec::new();
        let mut cur = self.head.as_deref();
        while let Some(layer) = cur {
            let parent = match layer {
                Layer::Vars { parent, snapshot } => {
                    snapshots.push(snapshot);
                    parent
                }
                Layer::Path { parent, .. } | Layer::Match { parent, .. } => parent,
            };
            cur = parent.head.as_deref();
        }

        let mut out = HashMap::new();
        for snapshot in snapshots.into_iter().rev() {
            snapshot.collect_into(&mut out);
        }
        out
    }

    /// The pattern the nearest routing decision matched, if any. The
    /// nearest decision is authoritative even when it selected nothing.
    pub fn matched_pattern(&self) -> Option<Arc<dyn Pattern>> {
        let mut cur = self.head.as_deref();
        while let Some(layer) = cur {
            match layer {
                Layer::Match { pattern, .. } => return pattern.as_ref().map(Arc::clone),
                Layer::Path { parent, .. } | Layer::Vars { parent, .. } => cur = parent.head.as_deref(),
            }
        }
        None
    }

    /// The handler the nearest routing decision matched, if any. Absence
    /// means "no route": the dispatcher answers with its not-found
    /// response.
    pub fn matched_handler(&self) -> Option<Arc<dyn Handler>> {
        let mut cur = self.head.as_deref();
        while let Some(layer) = cur {
            match layer {
                Layer::Match { handler, .. } => return handler.as_ref().map(Arc::clone),
                Layer::Path { parent, .. } | Layer::Vars { parent, .. } => cur = parent.head.as_deref(),
            }
        }
        None
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut layers = Vec::new();
        let mut cur = self.head.as_deref();
        while let Some(layer) = cur {
            let parent = match layer {
                Layer::Path { parent, .. } => {
                    layers.push("path");
                    parent
                }
                Layer::Vars { parent, .. } => {
                    layers.push("vars");
                    parent
                }
                Layer::Match { parent, .. } => {
                    layers.push("match");
                    parent
                }
            };
            cur = parent.head.as_deref();
        }
        f.debug_struct("Environment").field("layers", &layers).finish()
    }
}
