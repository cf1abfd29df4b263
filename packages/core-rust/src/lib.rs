//! Yardline Core. Service contracts: qualified names, operation catalogs,
//! native interfaces, and WSDL 1.1 reading and generation.

pub mod interface;
pub mod native;
pub mod operation;
pub mod qname;
pub mod resource;
pub mod wsdl;
pub mod xml;

pub use interface::{InterfaceError, InterfaceKind, ServiceInterface};
pub use native::{
    native_type, InterfaceCatalog, MethodSignature, NativeInterface, UnknownInterfaceTypeError,
    NATIVE_NAMESPACE,
};
pub use operation::{ExchangePattern, ServiceOperation};
pub use qname::{ParseQNameError, QName};
pub use resource::ResourceResolver;
pub use wsdl::{
    read_interface, write_contract, write_contract_to_path, ContractReadError, ContractWriteError,
    WsdlReader, WsdlWriter,
};
