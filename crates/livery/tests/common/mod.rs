//! Shared helpers for building theme trees on disk.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A template root in a temporary directory.
pub struct ThemeTree {
    dir: TempDir,
}

impl ThemeTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Canonical root, matching the paths a watcher reports.
    pub fn canonical(&self) -> PathBuf {
        self.dir.path().canonicalize().unwrap()
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn remove(&self, relative: &str) {
        let path = self.dir.path().join(relative);
        if path.is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }

    /// Writes a complete theme whose templates all mention `marker`.
    pub fn theme(&self, name: &str, marker: &str) -> &Self {
        self.theme_files(&format!("{}/", name), marker);
        self
    }

    /// Writes a complete theme directly at the root.
    pub fn legacy(&self, marker: &str) -> &Self {
        self.theme_files("", marker);
        self
    }

    fn theme_files(&self, prefix: &str, marker: &str) {
        self.write(
            &format!("{}layouts/layout.tmpl", prefix),
            &format!("<{m}>{{% block content %}}{{% endblock %}}</{m}>", m = marker),
        );
        self.write(
            &format!("{}pages/home/index.tmpl", prefix),
            "{% extends layout %}{% block content %}{{ title }}{% endblock %}",
        );
        self.write(
            &format!("{}singles/about.tmpl", prefix),
            &format!("{} about", marker),
        );
        self.write(
            &format!("{}errors/404.tmpl", prefix),
            &format!("{} not found", marker),
        );
    }
}
