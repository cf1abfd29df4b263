//! Resolution of document locations to their contents.
//!
//! A location is tried, in order, as a `file:` URL, as a filesystem path
//! (absolute or relative to the working directory), and finally relative to
//! each configured search root.

use std::path::{Path, PathBuf};

use url::Url;

/// Resolves document locations against a list of search roots.
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    search_roots: Vec<PathBuf>,
}

impl ResourceResolver {
    /// Creates a resolver that only looks at URLs and the working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver with the given search roots.
    #[must_use]
    pub fn with_roots(search_roots: Vec<PathBuf>) -> Self {
        Self { search_roots }
    }

    /// Appends a search root.
    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        self.search_roots.push(root.into());
    }

    #[must_use]
    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    /// Returns the path `location` resolves to, if any candidate exists.
    #[must_use]
    pub fn locate(&self, location: &str) -> Option<PathBuf> {
        if location.trim().is_empty() {
            return None;
        }

        if let Ok(url) = Url::parse(location) {
            if url.scheme() == "file" {
                return url.to_file_path().ok().filter(|p| p.is_file());
            }
            // Windows drive letters parse as single-letter schemes.
            if url.scheme().len() > 1 {
                return None;
            }
        }

        let direct = Path::new(location);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        if direct.is_absolute() {
            return None;
        }

        self.search_roots
            .iter()
            .map(|root| root.join(location))
            .find(|candidate| candidate.is_file())
    }

    /// Reads the document at `location` as UTF-8 text.
    ///
    /// Returns `None` when the location cannot be resolved or read.
    #[must_use]
    pub fn read_to_string(&self, location: &str) -> Option<String> {
        let path = self.locate(location)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("failed to read {}: {}", path.display(), e);
                None
            }
        }
    }
}
