//! Runtime configuration: node identity, WSDL search roots and the property
//! environment handed to activators.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use yardline_core::ResourceResolver;

/// Errors raised while building or loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("property key must not be empty")]
    EmptyKey,
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// String properties keyed by dotted names (`soap.port`, `camel.context`).
///
/// Passed explicitly to deployments; there is no process-wide instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment {
    properties: BTreeMap<String, String>,
}

impl Environment {
    /// Separator between key segments.
    pub const DELIMITER: char = '.';

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns the property value, or `default` when unset.
    #[must_use]
    pub fn property_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.property(key).unwrap_or(default)
    }

    /// Sets a property and returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyKey`] if `key` is empty.
    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, ConfigError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        Ok(self.properties.insert(key, value.into()))
    }

    /// Builder form of [`set_property`](Self::set_property).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyKey`] if `key` is empty.
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        self.set_property(key, value)?;
        Ok(self)
    }

    /// Removes a property and returns its value.
    pub fn clear_property(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    /// Properties under `prefix.`, keyed by the remainder of their name.
    #[must_use]
    pub fn properties_with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        let scoped = format!("{prefix}{}", Self::DELIMITER);
        self.properties
            .range(scoped.clone()..)
            .take_while(|(k, _)| k.starts_with(&scoped))
            .filter_map(|(k, v)| {
                let rest = &k[scoped.len()..];
                (!rest.is_empty()).then(|| (rest.to_string(), v.clone()))
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Configuration of one runtime instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Name of this runtime; also used as the service domain name.
    pub node_name: String,
    /// Directories searched for relative WSDL locations, in order.
    pub wsdl_search_roots: Vec<PathBuf>,
    pub environment: Environment,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            node_name: "yardline".to_string(),
            wsdl_search_roots: Vec::new(),
            environment: Environment::new(),
        }
    }
}

impl RuntimeConfig {
    /// Parses a JSON configuration document. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid JSON.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] for invalid JSON.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Resource resolver over the configured WSDL search roots.
    #[must_use]
    pub fn resolver(&self) -> ResourceResolver {
        ResourceResolver::with_roots(self.wsdl_search_roots.clone())
    }
}
