//! Operation catalog -> WSDL 1.1 document (SOAP/HTTP, document/literal).
//!
//! Output layout follows the WSDL 1.1 element order: `types`, `message`s,
//! `portType`, `binding`, `service`.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::schema::{SchemaGen, WrapperRole};
use super::{
    ContractWriteError, DEFAULT_TARGET_NAMESPACE, PLACEHOLDER_ADDRESS, RESPONSE_SUFFIX, SCHEMA_NS,
    SOAP_HTTP_TRANSPORT, SOAP_NS, WSDL_NS,
};
use crate::interface::ServiceInterface;
use crate::native::native_type_name;
use crate::operation::{ExchangePattern, ServiceOperation};
use crate::qname::QName;
use crate::xml::Element;

const PART_NAME: &str = "parameters";

/// Builds WSDL contracts for service interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsdlWriter;

impl WsdlWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds the `wsdl:definitions` tree for `model` published as
    /// `service_name`.
    #[must_use]
    pub fn build(&self, service_name: &QName, model: &ServiceInterface) -> Element {
        let tns = target_namespace(service_name);
        let name = service_name.local_name();
        let mut schema = SchemaGen::new();
        let mut scope = DocumentScope::default();

        let mut messages = Vec::new();
        let mut port_type = wsdl("portType").attr("name", name);
        let mut binding = wsdl("binding")
            .attr("name", format!("{name}PortBinding"))
            .attr("type", format!("tns:{name}"))
            .child(
                soap("binding")
                    .attr("transport", SOAP_HTTP_TRANSPORT)
                    .attr("style", "document"),
            );

        for op in model.operations() {
            let op_messages = OperationMessages::build(op, tns, &mut schema, &mut scope);
            port_type.push(op_messages.port_type_operation(op));
            binding.push(op_messages.binding_operation(op));
            messages.extend(op_messages.messages);
        }

        let mut types = wsdl("types");
        if let Some(xsd_schema) = schema.generate_schema() {
            types.push(xsd_schema);
        }

        let service = wsdl("service").attr("name", name).child(
            wsdl("port")
                .attr("name", format!("{name}Port"))
                .attr("binding", format!("tns:{name}PortBinding"))
                .child(soap("address").attr("location", PLACEHOLDER_ADDRESS)),
        );

        let mut definitions = wsdl("definitions")
            .declare("wsdl", WSDL_NS)
            .declare("xsd", SCHEMA_NS)
            .declare("soap", SOAP_NS)
            .declare("tns", tns);
        for (namespace, prefix) in &scope.prefixes {
            definitions = definitions.declare(prefix, namespace);
        }
        definitions = definitions
            .attr("name", name)
            .attr("targetNamespace", tns)
            .child(types);
        for message in messages {
            definitions.push(message);
        }
        definitions
            .child(port_type)
            .child(binding)
            .child(service)
    }

    /// Writes the contract for `model` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractWriteError`] if serialization or the destination
    /// fails.
    pub fn write<W: Write>(
        &self,
        service_name: &QName,
        model: &ServiceInterface,
        destination: W,
    ) -> Result<(), ContractWriteError> {
        let doc = self.build(service_name, model);
        doc.write_document(destination)?;
        tracing::debug!(
            "wrote WSDL contract for {} ({} operations)",
            service_name,
            model.len()
        );
        Ok(())
    }
}

/// Writes the WSDL contract for `model` published as `service_name`.
///
/// # Errors
///
/// See [`WsdlWriter::write`].
pub fn write_contract<W: Write>(
    service_name: &QName,
    model: &ServiceInterface,
    destination: W,
) -> Result<(), ContractWriteError> {
    WsdlWriter::new().write(service_name, model, destination)
}

/// Writes the contract to a file and returns its path. When `path` is an
/// existing directory the file is named `<service>.wsdl` inside it.
///
/// # Errors
///
/// Returns [`ContractWriteError::Io`] if the file cannot be created, or a
/// serialization error.
pub fn write_contract_to_path(
    service_name: &QName,
    model: &ServiceInterface,
    path: &Path,
) -> Result<PathBuf, ContractWriteError> {
    let target = if path.is_dir() {
        path.join(format!("{}.wsdl", service_name.local_name()))
    } else {
        path.to_path_buf()
    };
    let mut out = BufWriter::new(File::create(&target)?);
    write_contract(service_name, model, &mut out)?;
    out.flush()?;
    Ok(target)
}

fn target_namespace(service_name: &QName) -> &str {
    if service_name.namespace().is_empty() {
        DEFAULT_TARGET_NAMESPACE
    } else {
        service_name.namespace()
    }
}

fn wsdl(local_name: &str) -> Element {
    Element::qualified(Some("wsdl"), WSDL_NS, local_name)
}

fn soap(local_name: &str) -> Element {
    Element::qualified(Some("soap"), SOAP_NS, local_name)
}

fn literal_body(io: &str) -> Element {
    wsdl(io).child(soap("body").attr("use", "literal"))
}

// ---------------------------------------------------------------------------
// Document scope
// ---------------------------------------------------------------------------

/// Message names and namespace prefixes allocated within one document.
#[derive(Debug, Default)]
struct DocumentScope {
    messages: HashSet<String>,
    /// `(namespace, prefix)` in allocation order.
    prefixes: Vec<(String, String)>,
}

impl DocumentScope {
    /// Claims `base` as a message name, appending a counter when another
    /// operation already took it.
    fn message_name(&mut self, base: String) -> String {
        if self.messages.insert(base.clone()) {
            return base;
        }
        let mut counter = 2_u32;
        loop {
            let candidate = format!("{base}{counter}");
            if self.messages.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Prefix bound to a namespace outside the target namespace.
    fn prefix_for(&mut self, namespace: &str) -> String {
        if let Some((_, prefix)) = self.prefixes.iter().find(|(ns, _)| ns == namespace) {
            return prefix.clone();
        }
        let prefix = format!("ns{}", self.prefixes.len() + 1);
        self.prefixes.push((namespace.to_string(), prefix.clone()));
        prefix
    }
}

// ---------------------------------------------------------------------------
// Per-operation messages
// ---------------------------------------------------------------------------

/// Message elements for one operation plus the names needed to reference
/// them from the port type.
struct OperationMessages {
    messages: Vec<Element>,
    input: String,
    output: Option<String>,
    /// `(fault name, message name)`.
    faults: Vec<(String, String)>,
}

impl OperationMessages {
    fn build(
        op: &ServiceOperation,
        tns: &str,
        schema: &mut SchemaGen,
        scope: &mut DocumentScope,
    ) -> Self {
        let input = scope.message_name(op.name().to_string());
        let input_element = part_element(&input, op.input_type(), WrapperRole::Request, tns, schema);
        let mut messages = vec![message(&input, part(&input_element, tns, scope))];

        let mut output = None;
        if let Some(output_type) = op.output_type() {
            let name = scope.message_name(format!("{}{RESPONSE_SUFFIX}", op.name()));
            let element = part_element(&name, output_type, WrapperRole::Response, tns, schema);
            messages.push(message(&name, part(&element, tns, scope)));
            output = Some(name);
        }

        let mut faults = Vec::new();
        for fault in op.fault_types() {
            let message_name = scope.message_name(format!("{}_{}", op.name(), fault.local_name()));
            messages.push(message(&message_name, part(fault, tns, scope)));
            faults.push((fault.local_name().to_string(), message_name));
        }

        Self {
            messages,
            input,
            output,
            faults,
        }
    }

    fn port_type_operation(&self, op: &ServiceOperation) -> Element {
        let mut el = wsdl("operation")
            .attr("name", op.name())
            .child(wsdl("input").attr("message", format!("tns:{}", self.input)));
        if let (ExchangePattern::RequestResponse, Some(output)) = (op.pattern(), &self.output) {
            el.push(wsdl("output").attr("message", format!("tns:{output}")));
        }
        for (name, message) in &self.faults {
            el.push(
                wsdl("fault")
                    .attr("name", name.as_str())
                    .attr("message", format!("tns:{message}")),
            );
        }
        el
    }

    fn binding_operation(&self, op: &ServiceOperation) -> Element {
        let mut el = wsdl("operation")
            .attr("name", op.name())
            .child(soap("operation").attr("soapAction", ""))
            .child(literal_body("input"));
        if op.pattern() == ExchangePattern::RequestResponse {
            el.push(literal_body("output"));
        }
        for (name, _) in &self.faults {
            el.push(
                wsdl("fault").attr("name", name.as_str()).child(
                    soap("fault")
                        .attr("name", name.as_str())
                        .attr("use", "literal"),
                ),
            );
        }
        el
    }
}

/// The element a message part refers to: a wrapper element named after the
/// message for native types, otherwise the message type itself.
fn part_element(
    message_name: &str,
    message_type: &QName,
    role: WrapperRole,
    tns: &str,
    schema: &mut SchemaGen,
) -> QName {
    if native_type_name(message_type).is_none() {
        return message_type.clone();
    }
    let wrapper = schema.generate_wrapper(message_name, tns, message_type, role);
    QName::new(tns, wrapper.name.as_str())
}

fn message(name: &str, part: Element) -> Element {
    wsdl("message").attr("name", name).child(part)
}

fn part(element: &QName, tns: &str, scope: &mut DocumentScope) -> Element {
    let reference = if element.namespace() == tns {
        format!("tns:{}", element.local_name())
    } else if element.is_unqualified() {
        element.local_name().to_string()
    } else {
        format!("{}:{}", scope.prefix_for(element.namespace()), element.local_name())
    };
    wsdl("part")
        .attr("name", PART_NAME)
        .attr("element", reference)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::interface::InterfaceKind;
    use crate::native::{native_type, MethodSignature, NativeInterface};
    use crate::resource::ResourceResolver;
    use crate::wsdl::WsdlReader;
    use crate::xml;

    const NS: &str = "urn:orders";

    fn local_model() -> ServiceInterface {
        ServiceInterface::with_operations(
            InterfaceKind::Wsdl {
                location: "inline".to_string(),
                port_type: "OrderService".to_string(),
            },
            vec![
                ServiceOperation::request_response(
                    "submitOrder",
                    QName::new(NS, "submitOrder"),
                    QName::new(NS, "submitOrderResponse"),
                )
                .with_faults([QName::new(NS, "orderFault")]),
                ServiceOperation::one_way("cancelOrder", QName::new(NS, "cancelOrder")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn round_trip_preserves_operations() {
        let dir = tempfile::tempdir().unwrap();
        let service = QName::new(NS, "OrderService");
        let model = local_model();

        let path = write_contract_to_path(&service, &model, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("OrderService.wsdl"));

        let reader = WsdlReader::with_resolver(ResourceResolver::with_roots(vec![dir
            .path()
            .to_path_buf()]));
        let read = reader
            .read_interface("OrderService.wsdl", Some("OrderService"))
            .unwrap();

        assert_eq!(read.operations(), model.operations());
    }

    #[test]
    fn native_model_round_trips_names_and_patterns() {
        let native = NativeInterface::new(
            "orders.OrderService",
            vec![
                MethodSignature::new("submit", Some("orders.Order"), Some("int")),
                MethodSignature::new("ping", None, None),
            ],
        )
        .to_interface()
        .unwrap();

        let mut buf = Vec::new();
        write_contract(&QName::new(NS, "OrderService"), &native, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let read = WsdlReader::new().read_str("inline", &text, None).unwrap();

        let submit = read.operation("submit").unwrap();
        assert_eq!(submit.input_type(), &QName::new(NS, "submit"));
        assert_eq!(submit.output_type(), Some(&QName::new(NS, "submitResponse")));
        assert_eq!(submit.pattern(), ExchangePattern::RequestResponse);

        let ping = read.operation("ping").unwrap();
        assert_eq!(ping.pattern(), ExchangePattern::OneWay);
        assert_eq!(ping.input_type(), &QName::new(NS, "ping"));
    }

    #[test]
    fn document_layout() {
        let doc = WsdlWriter::new().build(&QName::new(NS, "OrderService"), &local_model());

        let order: Vec<&str> = doc.elements().map(Element::local_name).collect();
        assert_eq!(
            order,
            vec!["types", "message", "message", "message", "message", "portType", "binding", "service"]
        );

        let binding = doc.first_element(WSDL_NS, "binding").unwrap();
        assert_eq!(binding.attribute("name"), Some("OrderServicePortBinding"));
        let soap_binding = binding.first_element(SOAP_NS, "binding").unwrap();
        assert_eq!(soap_binding.attribute("transport"), Some(SOAP_HTTP_TRANSPORT));
        assert_eq!(soap_binding.attribute("style"), Some("document"));

        let address = doc
            .first_element(WSDL_NS, "service")
            .and_then(|s| s.first_element(WSDL_NS, "port"))
            .and_then(|p| p.first_element(SOAP_NS, "address"))
            .unwrap();
        assert_eq!(address.attribute("location"), Some(PLACEHOLDER_ADDRESS));
    }

    #[test]
    fn one_way_binding_has_no_output() {
        let doc = WsdlWriter::new().build(&QName::new(NS, "OrderService"), &local_model());
        let binding = doc.first_element(WSDL_NS, "binding").unwrap();
        let cancel = binding
            .elements_named(WSDL_NS, "operation")
            .find(|o| o.attribute("name") == Some("cancelOrder"))
            .unwrap();
        assert!(cancel.first_element(WSDL_NS, "input").is_some());
        assert!(cancel.first_element(WSDL_NS, "output").is_none());
    }

    #[test]
    fn unqualified_service_uses_default_namespace() {
        let model = ServiceInterface::with_operations(
            InterfaceKind::Native {
                type_name: "Echo".to_string(),
            },
            vec![ServiceOperation::request_response(
                "echo",
                native_type("string"),
                native_type("string"),
            )],
        )
        .unwrap();
        let doc = WsdlWriter::new().build(&QName::local("Echo"), &model);
        assert_eq!(doc.attribute("targetNamespace"), Some(DEFAULT_TARGET_NAMESPACE));
        assert_eq!(doc.attribute("name"), Some("Echo"));

        let schema = doc
            .first_element(WSDL_NS, "types")
            .and_then(|t| t.first_element(SCHEMA_NS, "schema"))
            .unwrap();
        let wrappers: Vec<_> = schema
            .elements_named(SCHEMA_NS, "element")
            .filter_map(|e| e.attribute("name"))
            .collect();
        assert_eq!(wrappers, vec!["echo", "echoResponse"]);
    }

    fn read_back(service: &QName, model: &ServiceInterface) -> ServiceInterface {
        let mut buf = Vec::new();
        write_contract(service, model, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        WsdlReader::new()
            .read_str("inline", &text, Some(service.local_name()))
            .unwrap()
    }

    fn message_names(doc: &Element) -> Vec<&str> {
        doc.elements_named(WSDL_NS, "message")
            .filter_map(|m| m.attribute("name"))
            .collect()
    }

    #[test]
    fn clashing_message_names_are_made_unique() {
        let svc = "urn:svc";
        let model = ServiceInterface::with_operations(
            InterfaceKind::Wsdl {
                location: "inline".to_string(),
                port_type: "Svc".to_string(),
            },
            vec![
                ServiceOperation::request_response(
                    "send",
                    QName::new(svc, "send"),
                    QName::new(svc, "sendAck"),
                ),
                ServiceOperation::one_way("sendResponse", QName::new(svc, "reply")),
            ],
        )
        .unwrap();
        let service = QName::new(svc, "Svc");

        let doc = WsdlWriter::new().build(&service, &model);
        assert_eq!(message_names(&doc), vec!["send", "sendResponse", "sendResponse2"]);

        let read = read_back(&service, &model);
        assert_eq!(read.operations(), model.operations());
    }

    #[test]
    fn clashing_native_wrappers_stay_distinct() {
        let native = NativeInterface::new(
            "Sender",
            vec![
                MethodSignature::new("send", Some("string"), Some("string")),
                MethodSignature::new("sendResponse", Some("int"), None),
            ],
        )
        .to_interface()
        .unwrap();
        let service = QName::new(NS, "Sender");

        let doc = WsdlWriter::new().build(&service, &native);
        let schema = doc
            .first_element(WSDL_NS, "types")
            .and_then(|t| t.first_element(SCHEMA_NS, "schema"))
            .unwrap();
        let wrappers: Vec<_> = schema
            .elements_named(SCHEMA_NS, "element")
            .filter_map(|e| e.attribute("name"))
            .collect();
        assert_eq!(wrappers, vec!["send", "sendResponse", "sendResponse2"]);

        let read = read_back(&service, &native);
        let send = read.operation("send").unwrap();
        assert_eq!(send.output_type(), Some(&QName::new(NS, "sendResponse")));
        let reply = read.operation("sendResponse").unwrap();
        assert_eq!(reply.input_type(), &QName::new(NS, "sendResponse2"));
        assert_eq!(reply.pattern(), ExchangePattern::OneWay);
    }

    #[test]
    fn foreign_message_types_round_trip() {
        let types = "urn:types";
        let model = ServiceInterface::with_operations(
            InterfaceKind::Wsdl {
                location: "inline".to_string(),
                port_type: "Svc".to_string(),
            },
            vec![
                ServiceOperation::request_response(
                    "get",
                    QName::new(types, "Req"),
                    QName::new(types, "Resp"),
                )
                .with_faults([QName::new("urn:faults", "NotFound")]),
                ServiceOperation::one_way("put", QName::new(types, "Put")),
            ],
        )
        .unwrap();
        let service = QName::new("urn:svc", "Svc");

        let doc = WsdlWriter::new().build(&service, &model);
        assert!(doc
            .first_element(WSDL_NS, "types")
            .and_then(|t| t.first_element(SCHEMA_NS, "schema"))
            .is_none());

        let read = read_back(&service, &model);
        assert_eq!(read.operations(), model.operations());
    }

    #[test]
    fn written_file_is_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.wsdl");
        let written = write_contract_to_path(&QName::new(NS, "OrderService"), &local_model(), &file).unwrap();
        assert_eq!(written, file);

        let text = fs::read_to_string(&file).unwrap();
        let root = xml::parse(&text).unwrap();
        assert!(root.is(WSDL_NS, "definitions"));
    }
}
