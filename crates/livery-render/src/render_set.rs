//! The compiled, executable form of one theme.

use std::fmt;
use std::io::Write;

use serde::Serialize;

use crate::error::RenderError;
use crate::naming::TemplateCategory;

/// A compiled bundle of templates, addressed by render key.
///
/// Render sets are immutable once built. Replacing the active theme means
/// building a new set and swapping it in, never patching an existing one.
pub trait RenderSet: Send + Sync + fmt::Debug {
    /// Renders `key` with `data` into `out`.
    fn execute(
        &self,
        key: &str,
        out: &mut dyn Write,
        data: &serde_json::Value,
    ) -> Result<(), RenderError>;

    /// True if `key` can be executed.
    fn has(&self, key: &str) -> bool;

    /// All render keys, sorted.
    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize {
        self.keys().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The render set installed before any theme has been loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRenderSet;

impl RenderSet for EmptyRenderSet {
    fn execute(
        &self,
        key: &str,
        _out: &mut dyn Write,
        _data: &serde_json::Value,
    ) -> Result<(), RenderError> {
        Err(RenderError::TemplateNotFound(key.to_string()))
    }

    fn has(&self, _key: &str) -> bool {
        false
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn len(&self) -> usize {
        0
    }
}

/// Template counts of a render set, by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub total: usize,
    /// Distinct layouts referenced by page keys.
    pub layouts: usize,
    pub pages: usize,
    pub singles: usize,
    pub errors: usize,
    pub others: usize,
}

impl RenderStats {
    pub fn of(set: &dyn RenderSet) -> Self {
        let mut stats = RenderStats::default();
        let mut layouts = std::collections::BTreeSet::new();

        for key in set.keys() {
            stats.total += 1;
            match TemplateCategory::of(&key) {
                TemplateCategory::Page => {
                    stats.pages += 1;
                    if let Some((layout, _)) = key.split_once(':') {
                        layouts.insert(layout.to_string());
                    }
                }
                TemplateCategory::Single => stats.singles += 1,
                TemplateCategory::Error => stats.errors += 1,
                TemplateCategory::Other => stats.others += 1,
            }
        }

        stats.layouts = layouts.len();
        stats
    }

    /// True if at least one page, single or error key is present.
    pub fn has_renderable(&self) -> bool {
        self.pages + self.singles + self.errors > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Keys(Vec<&'static str>);

    impl RenderSet for Keys {
        fn execute(
            &self,
            key: &str,
            out: &mut dyn Write,
            _data: &serde_json::Value,
        ) -> Result<(), RenderError> {
            out.write_all(key.as_bytes())?;
            Ok(())
        }

        fn has(&self, key: &str) -> bool {
            self.0.contains(&key)
        }

        fn keys(&self) -> Vec<String> {
            self.0.iter().map(|k| k.to_string()).collect()
        }
    }

    #[test]
    fn test_empty_render_set() {
        let set = EmptyRenderSet;
        assert!(set.is_empty());
        assert!(!set.has("error/404.tmpl"));
        let mut out = Vec::new();
        let err = set
            .execute("error/404.tmpl", &mut out, &serde_json::Value::Null)
            .unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }

    #[test]
    fn test_stats_by_category() {
        let set = Keys(vec![
            "base.tmpl:pages/home",
            "base.tmpl:pages/blog",
            "wide.tmpl:pages/home",
            "singles/about.tmpl",
            "error/404.tmpl",
        ]);
        let stats = RenderStats::of(&set);
        assert_eq!(
            stats,
            RenderStats {
                total: 5,
                layouts: 2,
                pages: 3,
                singles: 1,
                errors: 1,
                others: 0,
            }
        );
        assert!(stats.has_renderable());
        assert!(!RenderStats::of(&EmptyRenderSet).has_renderable());
    }
}
