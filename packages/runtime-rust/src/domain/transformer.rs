//! Transformer registration.
//!
//! A transformer converts messages of one type into another. The runtime only
//! tracks which transformers exist; executing them is the job of the message
//! exchange layer.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use yardline_core::QName;

use crate::descriptor::TransformerDecl;

/// A registered conversion between two message types.
pub trait Transformer: Send + Sync {
    /// Message type consumed.
    fn from_type(&self) -> &QName;

    /// Message type produced.
    fn to_type(&self) -> &QName;

    /// Implementation name, for logs.
    fn name(&self) -> &str;
}

/// Transformer built straight from its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredTransformer {
    from: QName,
    to: QName,
    transformer_type: String,
}

impl DeclaredTransformer {
    #[must_use]
    pub fn new(decl: &TransformerDecl) -> Self {
        Self {
            from: decl.from.clone(),
            to: decl.to.clone(),
            transformer_type: decl.transformer_type.clone(),
        }
    }
}

impl Transformer for DeclaredTransformer {
    fn from_type(&self) -> &QName {
        &self.from
    }

    fn to_type(&self) -> &QName {
        &self.to
    }

    fn name(&self) -> &str {
        &self.transformer_type
    }
}

// ---------------------------------------------------------------------------
// TransformerRegistry
// ---------------------------------------------------------------------------

/// Transformers keyed by `(from, to)`. Safe to share between deployments.
#[derive(Default)]
pub struct TransformerRegistry {
    transformers: DashMap<(QName, QName), Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transformer, returning the one it replaced.
    pub fn add_transformer(&self, transformer: Arc<dyn Transformer>) -> Option<Arc<dyn Transformer>> {
        let key = (
            transformer.from_type().clone(),
            transformer.to_type().clone(),
        );
        tracing::debug!(
            "registering transformer {} from {} to {}",
            transformer.name(),
            key.0,
            key.1
        );
        self.transformers.insert(key, transformer)
    }

    #[must_use]
    pub fn get_transformer(&self, from: &QName, to: &QName) -> Option<Arc<dyn Transformer>> {
        self.transformers
            .get(&(from.clone(), to.clone()))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove_transformer(&self, from: &QName, to: &QName) -> Option<Arc<dyn Transformer>> {
        self.transformers
            .remove(&(from.clone(), to.clone()))
            .map(|(_, t)| t)
    }

    /// Removes `transformer` only if it is still the instance registered for
    /// its `(from, to)` pair. Returns whether it was removed.
    pub fn remove_registered(&self, transformer: &Arc<dyn Transformer>) -> bool {
        let key = (
            transformer.from_type().clone(),
            transformer.to_type().clone(),
        );
        self.transformers
            .remove_if(&key, |_, current| Arc::ptr_eq(current, transformer))
            .is_some()
    }

    #[must_use]
    pub fn has_transformer(&self, from: &QName, to: &QName) -> bool {
        self.transformers.contains_key(&(from.clone(), to.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("len", &self.transformers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TransformerCatalog
// ---------------------------------------------------------------------------

/// Builds a transformer from its declaration.
pub type TransformerFactory =
    Arc<dyn Fn(&TransformerDecl) -> anyhow::Result<Arc<dyn Transformer>> + Send + Sync>;

/// Errors from instantiating a declared transformer.
#[derive(Debug, thiserror::Error)]
pub enum TransformerError {
    #[error("Unknown transformer type '{transformer_type}'")]
    UnknownType { transformer_type: String },
    #[error("failed to create transformer of type '{transformer_type}': {source}")]
    Factory {
        transformer_type: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Maps declared transformer types to factories.
#[derive(Clone, Default)]
pub struct TransformerCatalog {
    factories: HashMap<String, TransformerFactory>,
}

impl TransformerCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        transformer_type: impl Into<String>,
        factory: impl Fn(&TransformerDecl) -> anyhow::Result<Arc<dyn Transformer>> + Send + Sync + 'static,
    ) {
        self.factories
            .insert(transformer_type.into(), Arc::new(factory));
    }

    /// Registers a type whose transformers are plain [`DeclaredTransformer`]s.
    pub fn register_declared(&mut self, transformer_type: impl Into<String>) {
        self.register(transformer_type, |decl| {
            Ok(Arc::new(DeclaredTransformer::new(decl)) as Arc<dyn Transformer>)
        });
    }

    #[must_use]
    pub fn contains(&self, transformer_type: &str) -> bool {
        self.factories.contains_key(transformer_type)
    }

    /// Instantiates the transformer a declaration names.
    ///
    /// # Errors
    ///
    /// Returns [`TransformerError::UnknownType`] if no factory is registered
    /// for the declared type, or [`TransformerError::Factory`] if the factory
    /// fails.
    pub fn create(&self, decl: &TransformerDecl) -> Result<Arc<dyn Transformer>, TransformerError> {
        let factory = self
            .factories
            .get(&decl.transformer_type)
            .ok_or_else(|| TransformerError::UnknownType {
                transformer_type: decl.transformer_type.clone(),
            })?;
        factory(decl).map_err(|source| TransformerError::Factory {
            transformer_type: decl.transformer_type.clone(),
            source,
        })
    }
}

impl fmt::Debug for TransformerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.factories.keys().collect();
        types.sort();
        f.debug_struct("TransformerCatalog")
            .field("types", &types)
            .finish()
    }
}
