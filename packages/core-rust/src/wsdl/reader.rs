//! WSDL document -> operation catalog.
//!
//! Only the `definitions/portType/operation` subset is consumed. Each
//! `input`/`output`/`fault` references a `message`, and every referenced
//! message must carry exactly one `part` whose `element` names the message
//! type.

use std::collections::HashMap;

use super::{ContractReadError, WSDL_NS};
use crate::interface::{InterfaceKind, ServiceInterface};
use crate::operation::ServiceOperation;
use crate::qname::QName;
use crate::resource::ResourceResolver;
use crate::xml::{self, Element, XmlError};

/// Reads service interfaces from WSDL documents.
#[derive(Debug, Clone, Default)]
pub struct WsdlReader {
    resolver: ResourceResolver,
}

impl WsdlReader {
    /// Creates a reader resolving locations against the working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reader using the given resolver.
    #[must_use]
    pub fn with_resolver(resolver: ResourceResolver) -> Self {
        Self { resolver }
    }

    /// Reads the interface described by the port type `port_type` (or the
    /// first port type when `None`) of the document at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractReadError::Unresolvable`] if the document cannot be
    /// opened, and the errors of [`read_str`](Self::read_str) otherwise.
    pub fn read_interface(
        &self,
        location: &str,
        port_type: Option<&str>,
    ) -> Result<ServiceInterface, ContractReadError> {
        let text = self
            .resolver
            .read_to_string(location)
            .ok_or_else(|| ContractReadError::Unresolvable {
                location: location.to_string(),
            })?;
        self.read_str(location, &text, port_type)
    }

    /// Same as [`read_interface`](Self::read_interface) but returns only the
    /// operation list.
    ///
    /// # Errors
    ///
    /// See [`read_interface`](Self::read_interface).
    pub fn read_operations(
        &self,
        location: &str,
        port_type: Option<&str>,
    ) -> Result<Vec<ServiceOperation>, ContractReadError> {
        Ok(self.read_interface(location, port_type)?.operations().to_vec())
    }

    /// Reads an interface from an in-memory document. `location` only labels
    /// errors and the resulting [`InterfaceKind::Wsdl`].
    ///
    /// # Errors
    ///
    /// Returns a [`ContractReadError`] if the document is not well-formed
    /// WSDL, the port type is missing, or a message does not have exactly one
    /// part.
    pub fn read_str(
        &self,
        location: &str,
        text: &str,
        port_type: Option<&str>,
    ) -> Result<ServiceInterface, ContractReadError> {
        let malformed = |source: XmlError| ContractReadError::Malformed {
            location: location.to_string(),
            source,
        };

        let root = xml::parse(text).map_err(malformed)?;
        if !root.is(WSDL_NS, "definitions") {
            return Err(ContractReadError::NotWsdl {
                location: location.to_string(),
            });
        }

        let target_ns = root.attribute("targetNamespace").unwrap_or_default();
        let messages = Messages::collect(&root, target_ns);
        let port = select_port_type(&root, location, port_type)?;

        let mut iface = ServiceInterface::new(InterfaceKind::Wsdl {
            location: location.to_string(),
            port_type: port.attribute("name").unwrap_or_default().to_string(),
        });

        for op_el in port.elements_named(WSDL_NS, "operation") {
            let name = op_el
                .attribute("name")
                .ok_or_else(|| missing(op_el, "name"))?;
            let input = op_el
                .first_element(WSDL_NS, "input")
                .ok_or_else(|| ContractReadError::MissingInput {
                    operation: name.to_string(),
                })?;

            let input_type = messages.part_element(input).map_err(|e| e.located(&malformed))?;
            let output_type = op_el
                .first_element(WSDL_NS, "output")
                .map(|output| messages.part_element(output))
                .transpose()
                .map_err(|e| e.located(&malformed))?;
            let faults = op_el
                .elements_named(WSDL_NS, "fault")
                .map(|fault| messages.part_element(fault))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.located(&malformed))?;

            tracing::trace!("read WSDL operation {} from {}", name, location);
            iface.add_operation(
                ServiceOperation::new(name, input_type, output_type).with_faults(faults),
            )?;
        }

        Ok(iface)
    }
}

/// Reads an interface with a default [`WsdlReader`].
///
/// # Errors
///
/// See [`WsdlReader::read_interface`].
pub fn read_interface(
    location: &str,
    port_type: Option<&str>,
) -> Result<ServiceInterface, ContractReadError> {
    WsdlReader::new().read_interface(location, port_type)
}

fn missing(element: &Element, attribute: &'static str) -> ContractReadError {
    ContractReadError::MissingAttribute {
        element: element.local_name().to_string(),
        attribute,
    }
}

fn select_port_type<'a>(
    root: &'a Element,
    location: &str,
    name: Option<&str>,
) -> Result<&'a Element, ContractReadError> {
    let mut port_types = root.elements_named(WSDL_NS, "portType");
    match name {
        Some(name) => port_types
            .find(|p| p.attribute("name") == Some(name))
            .ok_or_else(|| ContractReadError::PortTypeNotFound {
                name: name.to_string(),
            }),
        None => port_types.next().ok_or_else(|| ContractReadError::NoPortType {
            location: location.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Message table
// ---------------------------------------------------------------------------

/// Error from resolving a message reference, before a location is attached.
enum PartError {
    Read(ContractReadError),
    Xml(XmlError),
}

impl PartError {
    fn located(self, malformed: &impl Fn(XmlError) -> ContractReadError) -> ContractReadError {
        match self {
            Self::Read(e) => e,
            Self::Xml(e) => malformed(e),
        }
    }
}

impl From<ContractReadError> for PartError {
    fn from(e: ContractReadError) -> Self {
        Self::Read(e)
    }
}

impl From<XmlError> for PartError {
    fn from(e: XmlError) -> Self {
        Self::Xml(e)
    }
}

/// `message` elements keyed by their qualified name.
struct Messages<'a> {
    target_ns: &'a str,
    by_name: HashMap<QName, &'a Element>,
}

impl<'a> Messages<'a> {
    fn collect(root: &'a Element, target_ns: &'a str) -> Self {
        let by_name = root
            .elements_named(WSDL_NS, "message")
            .filter_map(|m| {
                m.attribute("name")
                    .map(|name| (QName::new(target_ns, name), m))
            })
            .collect();
        Self { target_ns, by_name }
    }

    fn get(&self, name: &QName) -> Option<&'a Element> {
        self.by_name.get(name).copied().or_else(|| {
            // Unprefixed references without a default namespace.
            if name.is_unqualified() {
                self.by_name
                    .get(&QName::new(self.target_ns, name.local_name()))
                    .copied()
            } else {
                None
            }
        })
    }

    /// Resolves the single part element of the message referenced by an
    /// `input`, `output` or `fault` element.
    fn part_element(&self, io: &Element) -> Result<QName, PartError> {
        let reference = io.attribute("message").ok_or_else(|| missing(io, "message"))?;
        let message_name = io.resolve_qname(reference)?;
        let message = self
            .get(&message_name)
            .ok_or_else(|| ContractReadError::MessageNotFound {
                name: message_name.to_string(),
            })?;

        let mut parts = message.elements_named(WSDL_NS, "part");
        let (Some(part), None) = (parts.next(), parts.next()) else {
            return Err(ContractReadError::PartCount.into());
        };

        let element = part
            .attribute("element")
            .ok_or_else(|| missing(part, "element"))?;
        Ok(part.resolve_qname(element)?)
    }
}
