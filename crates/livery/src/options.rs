//! Engine configuration.
//!
//! [`EngineOptions`] can be built in code with the chaining setters or loaded
//! from YAML:
//!
//! ```rust
//! use livery::EngineOptions;
//!
//! let options = EngineOptions::from_yaml(r#"
//! layout: base.tmpl
//! theme: dark
//! multi_theme: true
//! global_constant:
//!   site_name: Example
//! "#).unwrap();
//!
//! assert_eq!(options.layout, "base.tmpl");
//! assert_eq!(options.suffix, "tmpl");
//! assert_eq!(options.theme.as_deref(), Some("dark"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_LAYOUT: &str = "layout.tmpl";
pub const DEFAULT_SUFFIX: &str = "tmpl";

/// Engine-wide options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Layout file used to build page keys.
    pub layout: String,
    /// Extension, without the dot, used to build single and error keys.
    pub suffix: String,
    /// Injected into every render as `variable`.
    pub global_variable: Map<String, Value>,
    /// Injected into every render as `constant`.
    pub global_constant: Map<String, Value>,
    /// Theme to activate at start-up.
    pub theme: Option<String>,
    /// Theme to activate at start-up when `theme` is not set.
    pub default_theme: Option<String>,
    /// Resolve error pages through theme-level `error.<suffix>` and
    /// `single.<suffix>` wrappers first.
    pub multi_theme: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            global_variable: Map::new(),
            global_constant: Map::new(),
            theme: None,
            default_theme: None,
            multi_theme: false,
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from YAML. Missing keys take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn global_variable(mut self, variable: Map<String, Value>) -> Self {
        self.global_variable = variable;
        self
    }

    pub fn global_constant(mut self, constant: Map<String, Value>) -> Self {
        self.global_constant = constant;
        self
    }

    pub fn theme(mut self, name: impl Into<String>) -> Self {
        self.theme = Some(name.into());
        self
    }

    pub fn default_theme(mut self, name: impl Into<String>) -> Self {
        self.default_theme = Some(name.into());
        self
    }

    pub fn multi_theme(mut self, enable: bool) -> Self {
        self.multi_theme = enable;
        self
    }

    /// Theme requested for start-up: `theme`, then `default_theme`.
    pub fn requested_theme(&self) -> Option<&str> {
        non_empty(&self.theme).or_else(|| non_empty(&self.default_theme))
    }

    /// These options with per-call overrides applied.
    pub fn with_overrides(&self, overrides: &RenderOptions) -> EngineOptions {
        let mut merged = self.clone();
        if let Some(layout) = &overrides.layout {
            merged.layout = layout.clone();
        }
        if let Some(suffix) = &overrides.suffix {
            merged.suffix = suffix.clone();
        }
        if let Some(variable) = &overrides.global_variable {
            merged.global_variable = variable.clone();
        }
        if let Some(constant) = &overrides.global_constant {
            merged.global_constant = constant.clone();
        }
        merged
    }
}

fn non_empty(name: &Option<String>) -> Option<&str> {
    name.as_deref().filter(|name| !name.is_empty())
}

/// Per-call overrides for a single render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    pub layout: Option<String>,
    pub suffix: Option<String>,
    pub global_variable: Option<Map<String, Value>>,
    pub global_constant: Option<Map<String, Value>>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn global_variable(mut self, variable: Map<String, Value>) -> Self {
        self.global_variable = Some(variable);
        self
    }

    pub fn global_constant(mut self, constant: Map<String, Value>) -> Self {
        self.global_constant = Some(constant);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.layout, "layout.tmpl");
        assert_eq!(options.suffix, "tmpl");
        assert!(!options.multi_theme);
        assert!(options.requested_theme().is_none());
    }

    #[test]
    fn test_from_yaml_partial() {
        let options = EngineOptions::from_yaml("suffix: html\ndefault_theme: dark\n").unwrap();
        assert_eq!(options.layout, "layout.tmpl");
        assert_eq!(options.suffix, "html");
        assert_eq!(options.requested_theme(), Some("dark"));
    }

    #[test]
    fn test_from_yaml_rejects_wrong_types() {
        assert!(EngineOptions::from_yaml("multi_theme: [1, 2]").is_err());
    }

    #[test]
    fn test_requested_theme_precedence() {
        let options = EngineOptions::new().default_theme("light").theme("dark");
        assert_eq!(options.requested_theme(), Some("dark"));

        let options = EngineOptions::new().theme("");
        assert_eq!(options.requested_theme(), None);
    }

    #[test]
    fn test_overrides() {
        let mut constant = Map::new();
        constant.insert("site".into(), json!("base"));
        let options = EngineOptions::new().global_constant(constant);

        let mut replacement = Map::new();
        replacement.insert("site".into(), json!("override"));
        let merged = options.with_overrides(
            &RenderOptions::new()
                .layout("wide.tmpl")
                .global_constant(replacement),
        );
        assert_eq!(merged.layout, "wide.tmpl");
        assert_eq!(merged.suffix, "tmpl");
        assert_eq!(merged.global_constant["site"], "override");
    }
}
