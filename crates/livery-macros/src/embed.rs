//! Compile-time theme embedding.
//!
//! The macro walks the directory, keeps template files and theme metadata,
//! and emits `(relative_path, content)` pairs. Everything else about themes
//! is decided at runtime by the `livery` crate.

use proc_macro2::TokenStream;
use quote::quote;
use std::path::{Path, PathBuf};
use syn::LitStr;

/// Template file extensions (must match livery_render::TEMPLATE_EXTENSIONS).
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".tmpl", ".html", ".tpl", ".jinja", ".jinja2", ".j2"];

/// Theme metadata file name (must match livery::METADATA_FILE).
pub const METADATA_FILE: &str = "theme.json";

pub fn embed_themes_impl(input: LitStr) -> TokenStream {
    let files = match resolve_path(&input.value()).and_then(|dir| collect_files(&dir)) {
        Ok(files) => files,
        Err(e) => {
            return syn::Error::new(input.span(), e).to_compile_error();
        }
    };

    let entries: Vec<_> = files
        .iter()
        .map(|(name, content)| {
            quote! { (#name, #content) }
        })
        .collect();

    quote! {
        {
            static ENTRIES: &[(&str, &str)] = &[
                #(#entries),*
            ];
            ::livery::EmbeddedSource::new(ENTRIES)
        }
    }
}

/// Resolves a path relative to the invoking crate's manifest directory.
fn resolve_path(path: &str) -> Result<PathBuf, String> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
        .map_err(|_| "CARGO_MANIFEST_DIR is not set".to_string())?;
    Ok(Path::new(&manifest_dir).join(path))
}

fn is_collected(name: &str) -> bool {
    name == METADATA_FILE || TEMPLATE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Collects template and metadata files below `dir`, sorted by relative path.
///
/// Relative paths always use `/` separators.
fn collect_files(dir: &Path) -> Result<Vec<(String, String)>, String> {
    if !dir.exists() {
        return Err(format!("Directory not found: {}", dir.display()));
    }
    if !dir.is_dir() {
        return Err(format!("Path is not a directory: {}", dir.display()));
    }

    let mut files = Vec::new();
    collect_files_recursive(dir, dir, &mut files)?;
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn collect_files_recursive(
    current: &Path,
    root: &Path,
    files: &mut Vec<(String, String)>,
) -> Result<(), String> {
    let entries = std::fs::read_dir(current)
        .map_err(|e| format!("Failed to read {}: {}", current.display(), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
        let path = entry.path();

        if path.is_dir() {
            collect_files_recursive(&path, root, files)?;
            continue;
        }

        let collected = path
            .file_name()
            .map(|name| is_collected(&name.to_string_lossy()))
            .unwrap_or(false);
        if !path.is_file() || !collected {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|_| format!("Failed to compute relative path for {}", path.display()))?;
        let name = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        files.push((name, content));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    fn names(files: &[(String, String)]) -> Vec<&str> {
        files.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_collects_themes_and_metadata() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "dark/layouts/layout.tmpl", "L");
        create_file(temp_dir.path(), "dark/pages/home/index.tmpl", "P");
        create_file(temp_dir.path(), "dark/theme.json", "{}");

        let files = collect_files(temp_dir.path()).unwrap();

        assert_eq!(
            names(&files),
            vec!["dark/layouts/layout.tmpl", "dark/pages/home/index.tmpl", "dark/theme.json"]
        );
        assert_eq!(files[0].1, "L");
    }

    #[test]
    fn test_skips_other_files() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "dark/singles/about.html", "S");
        create_file(temp_dir.path(), "dark/singles/notes.md", "ignored");
        create_file(temp_dir.path(), "dark/meta.json", "ignored");

        let files = collect_files(temp_dir.path()).unwrap();

        assert_eq!(names(&files), vec!["dark/singles/about.html"]);
    }

    #[test]
    fn test_directory_not_found() {
        let result = collect_files(Path::new("/nonexistent/path"));
        assert!(result.unwrap_err().contains("not found"));
    }

    #[test]
    fn test_file_is_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "layout.tmpl", "L");

        let result = collect_files(&temp_dir.path().join("layout.tmpl"));
        assert!(result.unwrap_err().contains("not a directory"));
    }

    #[test]
    fn test_sorted_output() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "zebra/errors/404.tmpl", "z");
        create_file(temp_dir.path(), "alpha/errors/404.tmpl", "a");
        create_file(temp_dir.path(), "middle/errors/404.j2", "m");

        let files = collect_files(temp_dir.path()).unwrap();

        assert_eq!(
            names(&files),
            vec!["alpha/errors/404.tmpl", "middle/errors/404.j2", "zebra/errors/404.tmpl"]
        );
    }
}
