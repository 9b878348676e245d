//! Template functions shared by every render set.
//!
//! A [`FunctionTable`] is an ordered list of registrars. Each one receives the
//! fresh `minijinja::Environment` a loader builds for a theme and adds its
//! filters, functions or globals to it. The table is cloned cheaply and applied
//! again on every load, switch and reload, so all themes see the same helpers.
//!
//! ```rust
//! use livery_render::FunctionTable;
//!
//! let table = FunctionTable::new()
//!     .with("shout", |env| {
//!         env.add_filter("shout", |s: String| s.to_uppercase());
//!     })
//!     .with_global("site", serde_json::json!({ "name": "Example" }));
//!
//! assert_eq!(table.names(), vec!["shout", "site"]);
//! ```

use std::fmt;
use std::sync::Arc;

use minijinja::{Environment, Value};

type Registrar = Arc<dyn Fn(&mut Environment<'static>) + Send + Sync>;

/// Ordered set of named registrars applied to each template environment.
#[derive(Clone, Default)]
pub struct FunctionTable {
    entries: Vec<(String, Registrar)>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the registrar stored under `name`.
    ///
    /// Replacing keeps the original position, so registration order stays
    /// stable across updates.
    pub fn register<F>(&mut self, name: impl Into<String>, registrar: F)
    where
        F: Fn(&mut Environment<'static>) + Send + Sync + 'static,
    {
        let name = name.into();
        let registrar: Registrar = Arc::new(registrar);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = registrar,
            None => self.entries.push((name, registrar)),
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, registrar: F) -> Self
    where
        F: Fn(&mut Environment<'static>) + Send + Sync + 'static,
    {
        self.register(name, registrar);
        self
    }

    /// Registers a global value visible to every template.
    pub fn add_global(&mut self, name: impl Into<String>, value: serde_json::Value) {
        let name = name.into();
        let global = name.clone();
        self.register(name, move |env| {
            env.add_global(global.clone(), Value::from_serialize(&value));
        });
    }

    pub fn with_global(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.add_global(name, value);
        self
    }

    /// Runs every registrar against `env`, in registration order.
    pub fn apply(&self, env: &mut Environment<'static>) {
        for (_, registrar) in &self.entries {
            registrar(env);
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_registers_filters_and_globals() {
        let table = FunctionTable::new()
            .with("shout", |env| {
                env.add_filter("shout", |s: String| s.to_uppercase());
            })
            .with_global("site", serde_json::json!("livery"));

        let mut env = Environment::new();
        table.apply(&mut env);
        let out = env.render_str("{{ site | shout }}", ()).unwrap();
        assert_eq!(out, "LIVERY");
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut table = FunctionTable::new();
        table.add_global("a", serde_json::json!(1));
        table.add_global("b", serde_json::json!(2));
        table.add_global("a", serde_json::json!(3));
        assert_eq!(table.names(), vec!["a", "b"]);

        let mut env = Environment::new();
        table.apply(&mut env);
        assert_eq!(env.render_str("{{ a }}{{ b }}", ()).unwrap(), "32");
    }

    #[test]
    fn test_debug_lists_names() {
        let table = FunctionTable::new().with_global("x", serde_json::json!(null));
        assert!(format!("{:?}", table).contains("\"x\""));
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
    }
}
