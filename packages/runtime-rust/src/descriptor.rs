//! Declarative application description consumed by a deployment.
//!
//! A descriptor lists the services to publish (each with an interface and a
//! binding) and the transformers to register. It is plain data loaded from
//! JSON; resolving it against activators happens in
//! [`Deployment::start`](crate::deployment::Deployment::start).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use yardline_core::QName;

use crate::config::ConfigError;

/// Opaque configuration tree handed to activators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    /// A node with no name, value, attributes or children.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builds a node with one valued child per property.
    pub fn from_properties(name: impl Into<String>, properties: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            children: properties
                .into_iter()
                .map(|(k, v)| ConfigNode::new(k).with_value(v))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.value.is_none()
            && self.attributes.is_empty()
            && self.children.is_empty()
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// First child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Value of the first child with the given name.
    #[must_use]
    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|c| c.value.as_deref())
    }
}

/// How a service's interface is described.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InterfaceDecl {
    /// A native interface registered in the runtime's catalog.
    Native { type_name: String },
    /// A WSDL document; the first port type is used when none is named.
    Wsdl {
        location: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port_type: Option<String>,
    },
}

/// The binding a service is exposed through, served by the activator
/// registered for `binding_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDecl {
    #[serde(rename = "type")]
    pub binding_type: String,
    #[serde(default)]
    pub config: ConfigNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDecl {
    pub name: QName,
    pub interface: InterfaceDecl,
    pub binding: BindingDecl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerDecl {
    pub from: QName,
    pub to: QName,
    #[serde(rename = "type")]
    pub transformer_type: String,
}

/// A complete application description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub name: String,
    #[serde(default)]
    pub services: Vec<ServiceDecl>,
    #[serde(default)]
    pub transformers: Vec<TransformerDecl>,
}

impl AppDescriptor {
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid JSON.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

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

    #[must_use]
    pub fn service(&self, name: &QName) -> Option<&ServiceDecl> {
        self.services.iter().find(|s| &s.name == name)
    }

    /// Distinct binding types used by the services, in declaration order.
    #[must_use]
    pub fn binding_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for service in &self.services {
            let ty = service.binding.binding_type.as_str();
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        types
    }
}
