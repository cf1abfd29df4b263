//! WSDL 1.1 contract support.
//!
//! - [`reader`]: WSDL document -> [`ServiceInterface`](crate::ServiceInterface)
//! - [`writer`]: [`ServiceInterface`](crate::ServiceInterface) -> WSDL document
//! - [`schema`]: XML Schema element declarations for the writer's `types` section

pub mod reader;
pub mod schema;
pub mod writer;

pub use reader::{read_interface, WsdlReader};
pub use schema::{FieldType, SchemaGen, WrapperField, WrapperType};
pub use writer::{write_contract, write_contract_to_path, WsdlWriter};

/// WSDL 1.1 namespace.
pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
/// XML Schema namespace.
pub const SCHEMA_NS: &str = "http://www.w3.org/2001/XMLSchema";
/// WSDL 1.1 SOAP binding namespace.
pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
/// SOAP over HTTP transport URI.
pub const SOAP_HTTP_TRANSPORT: &str = "http://schemas.xmlsoap.org/soap/http";

/// Target namespace used when a service name has none.
pub const DEFAULT_TARGET_NAMESPACE: &str = "urn:yardline:default";
/// Address written into generated `soap:address` elements.
pub const PLACEHOLDER_ADDRESS: &str = "REPLACE_WITH_ACTUAL_URL";
/// Suffix appended to an operation name to name its output message.
pub const RESPONSE_SUFFIX: &str = "Response";

/// Errors raised while reading a WSDL contract.
///
/// Contract problems are caller bugs, not transient conditions; none of these
/// are retried.
#[derive(Debug, thiserror::Error)]
pub enum ContractReadError {
    #[error("Unable to resolve WSDL document at {location}")]
    Unresolvable { location: String },
    #[error("Malformed WSDL document at {location}: {source}")]
    Malformed {
        location: String,
        #[source]
        source: crate::xml::XmlError,
    },
    #[error("Document at {location} is not a WSDL definitions document")]
    NotWsdl { location: String },
    #[error("No portType found in WSDL document at {location}")]
    NoPortType { location: String },
    #[error("Unable to find portType with name {name}")]
    PortTypeNotFound { name: String },
    #[error("Unable to find message {name}")]
    MessageNotFound { name: String },
    #[error("Operation '{operation}' has no input message")]
    MissingInput { operation: String },
    #[error("Service operations on a WSDL interface must have exactly one parameter.")]
    PartCount,
    #[error("Element '{element}' is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("Invalid operation set: {0}")]
    Interface(#[from] crate::interface::InterfaceError),
}

/// Errors raised while writing a WSDL contract.
#[derive(Debug, thiserror::Error)]
pub enum ContractWriteError {
    #[error("failed to write WSDL document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize WSDL document: {0}")]
    Serialize(#[from] crate::xml::XmlError),
}
