//! Optional per-theme metadata (`theme.json`).
//!
//! The file is a JSON object:
//!
//! ```json
//! {
//!   "name": "dark",
//!   "display_name": "Dark",
//!   "description": "Low-light palette",
//!   "version": "2.1.0",
//!   "author": "Design Team",
//!   "tags": ["dark", "contrast"],
//!   "custom": { "accent": "#ff8800" }
//! }
//! ```
//!
//! Every field is optional, and so is the file itself.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ThemeError, ThemeResult};

/// File name of the metadata file at a theme root.
pub const METADATA_FILE: &str = "theme.json";

/// Version reported when the metadata does not name one.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Descriptive information about a theme.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThemeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ThemeMetadata {
    /// Metadata for a theme without a metadata file.
    pub fn defaults_for(base_name: &str) -> Self {
        Self {
            name: None,
            display_name: base_name.to_string(),
            description: "Theme without metadata".to_string(),
            version: DEFAULT_VERSION.to_string(),
            author: "Unknown".to_string(),
            tags: Vec::new(),
            custom: serde_json::Map::new(),
        }
    }

    /// Metadata reported for the single theme of a theme-less installation.
    pub fn legacy() -> Self {
        Self {
            name: None,
            display_name: "Default Theme".to_string(),
            description: "Legacy mode default theme".to_string(),
            version: DEFAULT_VERSION.to_string(),
            author: "System".to_string(),
            tags: vec!["legacy".to_string(), "default".to_string()],
            custom: serde_json::Map::new(),
        }
    }

    /// Parses metadata text and fills in missing display name and version.
    pub fn parse(base_name: &str, text: &str) -> ThemeResult<Self> {
        let mut metadata: ThemeMetadata = serde_json::from_str(text).map_err(|err| {
            ThemeError::config_invalid(base_name, format!("invalid {} format", METADATA_FILE))
                .with_source(err)
        })?;

        if metadata.display_name.is_empty() {
            metadata.display_name = base_name.to_string();
        }
        if metadata.version.is_empty() {
            metadata.version = DEFAULT_VERSION.to_string();
        }
        Ok(metadata)
    }
}

/// Checks the shape of a metadata file without building [`ThemeMetadata`].
///
/// The document must be an object. `name` and `version`, when present, must be
/// non-empty strings and `tags`, when present, must be an array of strings.
pub fn validate_metadata(theme: &str, text: &str) -> ThemeResult<()> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|err| {
        ThemeError::config_invalid(theme, format!("invalid JSON format in {}", METADATA_FILE))
            .with_source(err)
    })?;

    let object = value.as_object().ok_or_else(|| {
        ThemeError::config_invalid(theme, format!("{} must contain a JSON object", METADATA_FILE))
    })?;

    for field in ["name", "version"] {
        if let Some(value) = object.get(field) {
            if !value.as_str().is_some_and(|s| !s.is_empty()) {
                return Err(ThemeError::config_invalid(
                    theme,
                    format!("theme {} must be a non-empty string", field),
                ));
            }
        }
    }

    if let Some(tags) = object.get("tags") {
        let tags = tags
            .as_array()
            .ok_or_else(|| ThemeError::config_invalid(theme, "tags must be an array of strings"))?;
        if let Some(index) = tags.iter().position(|tag| !tag.is_string()) {
            return Err(ThemeError::config_invalid(
                theme,
                format!("tag at index {} must be a string", index),
            ));
        }
    }

    Ok(())
}
