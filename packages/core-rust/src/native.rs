//! Native interfaces: contracts declared as a list of method signatures.
//!
//! Native message types live in [`NATIVE_NAMESPACE`]; the local part is the
//! native type name (`int`, `string`, `orders.Order`, ...).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::interface::{InterfaceError, InterfaceKind, ServiceInterface};
use crate::operation::ServiceOperation;
use crate::qname::QName;

/// Namespace reserved for native message types.
pub const NATIVE_NAMESPACE: &str = "urn:yardline:native";

/// Type name used for methods that take no parameter.
pub const VOID_TYPE: &str = "void";

/// Builds the message type for a native type name.
#[must_use]
pub fn native_type(type_name: &str) -> QName {
    QName::new(NATIVE_NAMESPACE, type_name)
}

/// Returns the native type name if `qname` is a native message type.
#[must_use]
pub fn native_type_name(qname: &QName) -> Option<&str> {
    (qname.namespace() == NATIVE_NAMESPACE).then(|| qname.local_name())
}

/// One method of a native interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    /// Parameter type; `None` means the method takes no argument.
    #[serde(default)]
    pub parameter: Option<String>,
    /// Return type; `None` makes the operation one-way.
    #[serde(default)]
    pub returns: Option<String>,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, parameter: Option<&str>, returns: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parameter: parameter.map(str::to_string),
            returns: returns.map(str::to_string),
        }
    }
}

/// A statically known interface type: a name plus its method signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeInterface {
    pub type_name: String,
    pub methods: Vec<MethodSignature>,
}

impl NativeInterface {
    pub fn new(type_name: impl Into<String>, methods: Vec<MethodSignature>) -> Self {
        Self {
            type_name: type_name.into(),
            methods,
        }
    }

    /// Converts the signature list into a service interface.
    ///
    /// # Errors
    ///
    /// Returns [`InterfaceError::DuplicateOperation`] for overloaded method names,
    /// which a contract cannot express.
    pub fn to_interface(&self) -> Result<ServiceInterface, InterfaceError> {
        let kind = InterfaceKind::Native {
            type_name: self.type_name.clone(),
        };
        ServiceInterface::with_operations(
            kind,
            self.methods.iter().map(|m| {
                let input = native_type(m.parameter.as_deref().unwrap_or(VOID_TYPE));
                ServiceOperation::new(m.name.clone(), input, m.returns.as_deref().map(native_type))
            }),
        )
    }
}

/// Raised when a declared native interface type is not known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to load Service interface type '{type_name}'.")]
pub struct UnknownInterfaceTypeError {
    pub type_name: String,
}

/// Lookup table of native interfaces available to deployments.
#[derive(Debug, Clone, Default)]
pub struct InterfaceCatalog {
    interfaces: HashMap<String, NativeInterface>,
}

impl InterfaceCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interface, replacing any previous one with the same type name.
    pub fn register(&mut self, interface: NativeInterface) {
        self.interfaces
            .insert(interface.type_name.clone(), interface);
    }

    /// Resolves a native interface by type name.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownInterfaceTypeError`] if no interface is registered under `type_name`.
    pub fn resolve(&self, type_name: &str) -> Result<&NativeInterface, UnknownInterfaceTypeError> {
        self.interfaces
            .get(type_name)
            .ok_or_else(|| UnknownInterfaceTypeError {
                type_name: type_name.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.interfaces.contains_key(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::ExchangePattern;

    fn order_service() -> NativeInterface {
        NativeInterface::new(
            "orders.OrderService",
            vec![
                MethodSignature::new("submitOrder", Some("orders.Order"), None),
                MethodSignature::new("lookup", Some("int"), Some("orders.Order")),
                MethodSignature::new("ping", None, Some("boolean")),
            ],
        )
    }

    #[test]
    fn signatures_become_operations() {
        let iface = order_service().to_interface().unwrap();
        assert_eq!(iface.len(), 3);

        let submit = iface.operation("submitOrder").unwrap();
        assert_eq!(submit.pattern(), ExchangePattern::OneWay);
        assert_eq!(submit.input_type(), &native_type("orders.Order"));

        let ping = iface.operation("ping").unwrap();
        assert_eq!(ping.input_type(), &native_type(VOID_TYPE));
        assert_eq!(ping.pattern(), ExchangePattern::RequestResponse);
    }

    #[test]
    fn native_type_name_only_for_native_namespace() {
        assert_eq!(native_type_name(&native_type("int")), Some("int"));
        assert_eq!(native_type_name(&QName::new("urn:x", "int")), None);
    }

    #[test]
    fn catalog_unknown_type_message() {
        let mut catalog = InterfaceCatalog::new();
        catalog.register(order_service());
        assert!(catalog.resolve("orders.OrderService").is_ok());

        let err = catalog.resolve("org.acme.Blah").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to load Service interface type 'org.acme.Blah'."
        );
    }
}
