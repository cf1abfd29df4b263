//! Service interface model: a typed, name-indexed collection of operations.

use std::collections::HashMap;

use crate::operation::ServiceOperation;

/// Where an interface's operation catalog came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Built from a statically known method signature list.
    Native {
        /// Name of the native interface type.
        type_name: String,
    },
    /// Built by the WSDL reader.
    Wsdl {
        /// Location the document was resolved from.
        location: String,
        /// Local name of the port type the operations were read from.
        port_type: String,
    },
}

impl InterfaceKind {
    /// Short tag for logging (`"native"` or `"wsdl"`).
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Native { .. } => "native",
            Self::Wsdl { .. } => "wsdl",
        }
    }
}

/// Errors from assembling an interface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterfaceError {
    #[error("duplicate operation '{name}' on interface")]
    DuplicateOperation { name: String },
}

/// A service contract: the set of operations a service exposes.
///
/// Operations are unique by name. Lookup by name goes through a hash index;
/// iteration follows insertion order so generated documents are stable.
#[derive(Debug, Clone)]
pub struct ServiceInterface {
    kind: InterfaceKind,
    operations: Vec<ServiceOperation>,
    by_name: HashMap<String, usize>,
}

impl ServiceInterface {
    /// Creates an interface with no operations.
    #[must_use]
    pub fn new(kind: InterfaceKind) -> Self {
        Self {
            kind,
            operations: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Builds an interface from a list of operations.
    ///
    /// # Errors
    ///
    /// Returns [`InterfaceError::DuplicateOperation`] if two operations share a name.
    pub fn with_operations(
        kind: InterfaceKind,
        operations: impl IntoIterator<Item = ServiceOperation>,
    ) -> Result<Self, InterfaceError> {
        let mut iface = Self::new(kind);
        for op in operations {
            iface.add_operation(op)?;
        }
        Ok(iface)
    }

    /// Adds an operation.
    ///
    /// # Errors
    ///
    /// Returns [`InterfaceError::DuplicateOperation`] if the name is taken.
    pub fn add_operation(&mut self, operation: ServiceOperation) -> Result<(), InterfaceError> {
        if self.by_name.contains_key(operation.name()) {
            return Err(InterfaceError::DuplicateOperation {
                name: operation.name().to_string(),
            });
        }
        self.by_name
            .insert(operation.name().to_string(), self.operations.len());
        self.operations.push(operation);
        Ok(())
    }

    #[must_use]
    pub fn kind(&self) -> &InterfaceKind {
        &self.kind
    }

    /// Looks up an operation by name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&ServiceOperation> {
        self.by_name.get(name).map(|&idx| &self.operations[idx])
    }

    /// All operations in insertion order.
    #[must_use]
    pub fn operations(&self) -> &[ServiceOperation] {
        &self.operations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
