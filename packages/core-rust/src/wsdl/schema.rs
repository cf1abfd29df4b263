//! XML Schema generation for WSDL `types` sections.
//!
//! Every operation message is described by a synthesized wrapper: a record
//! with a single field named after the parameter. Wrappers are plain data
//! ([`WrapperType`]) consumed by [`SchemaGen::generate_schema`]; they never
//! appear in the public operation model.
//!
//! Only the first target namespace produces a schema. Wrappers registered
//! under other namespaces are ignored with a warning.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::SCHEMA_NS;
use crate::native::{native_type_name, VOID_TYPE};
use crate::qname::QName;
use crate::xml::Element;

/// Native type names with a direct XML Schema counterpart.
const PRIMITIVES: &[(&str, &str)] = &[
    ("int", "int"),
    ("integer", "int"),
    ("i32", "int"),
    ("java.lang.Integer", "int"),
    ("long", "long"),
    ("i64", "long"),
    ("java.lang.Long", "long"),
    ("short", "short"),
    ("i16", "short"),
    ("java.lang.Short", "short"),
    ("byte", "byte"),
    ("i8", "byte"),
    ("java.lang.Byte", "byte"),
    ("float", "float"),
    ("f32", "float"),
    ("java.lang.Float", "float"),
    ("double", "double"),
    ("f64", "double"),
    ("java.lang.Double", "double"),
    ("boolean", "boolean"),
    ("bool", "boolean"),
    ("java.lang.Boolean", "boolean"),
    ("string", "string"),
    ("String", "string"),
    ("java.lang.String", "string"),
];

/// Maps a native type name to its XML Schema primitive, if it has one.
#[must_use]
pub fn primitive_schema_type(type_name: &str) -> Option<&'static str> {
    PRIMITIVES
        .iter()
        .find(|(native, _)| *native == type_name)
        .map(|(_, xsd)| *xsd)
}

/// Which side of an operation a wrapper describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperRole {
    Request,
    Response,
}

impl WrapperRole {
    fn primitive_field_name(self) -> &'static str {
        match self {
            Self::Request => "arg0",
            Self::Response => "return",
        }
    }
}

/// Schema type of a wrapper's field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// XML Schema primitive (`int`, `string`, ...).
    Primitive(&'static str),
    /// Named complex type in the wrapper's namespace.
    Named(String),
    /// Message type from a foreign vocabulary; emitted as `xsd:anyType`.
    Any,
}

/// The single field of a wrapper type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperField {
    pub name: String,
    pub field_type: FieldType,
}

/// A synthesized single-field record backing one schema element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperType {
    pub name: String,
    pub namespace: String,
    /// `None` for messages without a payload (`void` parameters).
    pub field: Option<WrapperField>,
}

/// Generates and caches wrapper types, then emits them as XML Schema.
#[derive(Debug, Default)]
pub struct SchemaGen {
    cache: HashMap<QName, Arc<WrapperType>>,
    order: Vec<Arc<WrapperType>>,
}

impl SchemaGen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the wrapper for element `{namespace}element_name`, creating it
    /// on first use. Later calls with the same name return the cached wrapper
    /// regardless of the other arguments.
    pub fn generate_wrapper(
        &mut self,
        element_name: &str,
        namespace: &str,
        message_type: &QName,
        role: WrapperRole,
    ) -> Arc<WrapperType> {
        let key = QName::new(namespace, element_name);
        if let Some(existing) = self.cache.get(&key) {
            return Arc::clone(existing);
        }

        let wrapper = Arc::new(WrapperType {
            name: element_name.to_string(),
            namespace: namespace.to_string(),
            field: wrapper_field(message_type, role),
        });
        self.cache.insert(key, Arc::clone(&wrapper));
        self.order.push(Arc::clone(&wrapper));
        wrapper
    }

    /// Generates the request wrapper and, for request-response operations,
    /// the response wrapper.
    pub fn generate_operation(
        &mut self,
        namespace: &str,
        request: (&str, &QName),
        response: Option<(&str, &QName)>,
    ) -> (Arc<WrapperType>, Option<Arc<WrapperType>>) {
        let req = self.generate_wrapper(request.0, namespace, request.1, WrapperRole::Request);
        let resp = response
            .map(|(name, ty)| self.generate_wrapper(name, namespace, ty, WrapperRole::Response));
        (req, resp)
    }

    /// Wrappers generated so far, in generation order.
    #[must_use]
    pub fn wrappers(&self) -> &[Arc<WrapperType>] {
        &self.order
    }

    /// Builds the `xsd:schema` element for the first namespace that has
    /// wrappers. Returns `None` when nothing was generated.
    #[must_use]
    pub fn generate_schema(&self) -> Option<Element> {
        let first_ns = self.order.first()?.namespace.as_str();

        let ignored: HashSet<&str> = self
            .order
            .iter()
            .map(|w| w.namespace.as_str())
            .filter(|ns| *ns != first_ns)
            .collect();
        for ns in &ignored {
            tracing::warn!(
                "schema for namespace {} not emitted; only {} is supported, other schemas will be ignored",
                ns,
                first_ns
            );
        }

        let mut schema = xsd("schema")
            .declare("xsd", SCHEMA_NS)
            .declare("tns", first_ns)
            .attr("targetNamespace", first_ns)
            .attr("version", "1.0");

        let wrappers: Vec<&WrapperType> = self
            .order
            .iter()
            .map(AsRef::as_ref)
            .filter(|w| w.namespace == first_ns)
            .collect();
        let mut declared: HashSet<&str> = wrappers.iter().map(|w| w.name.as_str()).collect();

        for wrapper in &wrappers {
            schema.push(
                xsd("element")
                    .attr("name", wrapper.name.as_str())
                    .attr("type", format!("tns:{}", wrapper.name)),
            );
        }
        for wrapper in &wrappers {
            schema.push(complex_type(wrapper));
        }
        for wrapper in &wrappers {
            if let Some(WrapperField {
                field_type: FieldType::Named(type_name),
                ..
            }) = &wrapper.field
            {
                if declared.insert(type_name.as_str()) {
                    schema.push(
                        xsd("complexType")
                            .attr("name", type_name.as_str())
                            .child(xsd("sequence")),
                    );
                }
            }
        }

        Some(schema)
    }
}

fn xsd(local_name: &str) -> Element {
    Element::qualified(Some("xsd"), SCHEMA_NS, local_name)
}

fn complex_type(wrapper: &WrapperType) -> Element {
    let mut sequence = xsd("sequence");
    if let Some(field) = &wrapper.field {
        let mut el = xsd("element").attr("name", field.name.as_str());
        el = match &field.field_type {
            FieldType::Primitive(p) => {
                let el = el.attr("type", format!("xsd:{p}"));
                if *p == "string" {
                    el.attr("minOccurs", "0")
                } else {
                    el
                }
            }
            FieldType::Named(name) => el
                .attr("type", format!("tns:{name}"))
                .attr("minOccurs", "0"),
            FieldType::Any => el.attr("type", "xsd:anyType").attr("minOccurs", "0"),
        };
        sequence.push(el);
    }
    xsd("complexType")
        .attr("name", wrapper.name.as_str())
        .child(sequence)
}

fn wrapper_field(message_type: &QName, role: WrapperRole) -> Option<WrapperField> {
    let Some(type_name) = native_type_name(message_type) else {
        return Some(WrapperField {
            name: role.primitive_field_name().to_string(),
            field_type: FieldType::Any,
        });
    };

    if type_name == VOID_TYPE {
        return None;
    }
    if let Some(xsd_type) = primitive_schema_type(type_name) {
        return Some(WrapperField {
            name: role.primitive_field_name().to_string(),
            field_type: FieldType::Primitive(xsd_type),
        });
    }

    let simple = lower_camel(simple_name(type_name));
    Some(WrapperField {
        name: simple.clone(),
        field_type: FieldType::Named(simple),
    })
}

/// Last segment of a dotted, `::`-separated or slash-separated type path.
fn simple_name(type_name: &str) -> &str {
    type_name
        .rsplit(['.', ':', '/'])
        .next()
        .unwrap_or(type_name)
}

fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::native_type;

    const NS: &str = "urn:orders";

    #[test]
    fn repeated_generation_reuses_wrapper() {
        let mut gen = SchemaGen::new();
        let first = gen.generate_wrapper("submitOrder", NS, &native_type("orders.Order"), WrapperRole::Request);
        let second = gen.generate_wrapper("submitOrder", NS, &native_type("orders.Order"), WrapperRole::Request);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(gen.wrappers().len(), 1);
    }

    #[test]
    fn primitive_fields_use_positional_names() {
        let mut gen = SchemaGen::new();
        let (req, resp) = gen.generate_operation(
            NS,
            ("count", &native_type("int")),
            Some(("countResponse", &native_type("java.lang.Boolean"))),
        );
        assert_eq!(
            req.field,
            Some(WrapperField {
                name: "arg0".to_string(),
                field_type: FieldType::Primitive("int"),
            })
        );
        assert_eq!(
            resp.unwrap().field,
            Some(WrapperField {
                name: "return".to_string(),
                field_type: FieldType::Primitive("boolean"),
            })
        );
    }

    #[test]
    fn complex_fields_named_after_type() {
        let mut gen = SchemaGen::new();
        let w = gen.generate_wrapper("submitOrder", NS, &native_type("acme::orders::Order"), WrapperRole::Request);
        assert_eq!(
            w.field,
            Some(WrapperField {
                name: "order".to_string(),
                field_type: FieldType::Named("order".to_string()),
            })
        );
    }

    #[test]
    fn void_and_foreign_types() {
        let mut gen = SchemaGen::new();
        let void = gen.generate_wrapper("ping", NS, &native_type(VOID_TYPE), WrapperRole::Request);
        assert!(void.field.is_none());

        let foreign = gen.generate_wrapper("hello", NS, &QName::new("urn:x", "hello"), WrapperRole::Request);
        assert_eq!(foreign.field.as_ref().unwrap().field_type, FieldType::Any);
    }

    #[test]
    fn primitive_table_lookup() {
        assert_eq!(primitive_schema_type("int"), Some("int"));
        assert_eq!(primitive_schema_type("boolean"), Some("boolean"));
        assert_eq!(primitive_schema_type("f64"), Some("double"));
        assert_eq!(primitive_schema_type("orders.Order"), None);
    }

    #[test]
    fn schema_declares_elements_and_companion_types() {
        let mut gen = SchemaGen::new();
        gen.generate_wrapper("submitOrder", NS, &native_type("orders.Order"), WrapperRole::Request);
        let schema = gen.generate_schema().unwrap();

        assert_eq!(schema.attribute("targetNamespace"), Some(NS));
        let elements: Vec<_> = schema.elements_named(SCHEMA_NS, "element").collect();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].attribute("name"), Some("submitOrder"));

        let types: Vec<_> = schema
            .elements_named(SCHEMA_NS, "complexType")
            .filter_map(|t| t.attribute("name"))
            .collect();
        assert_eq!(types, vec!["submitOrder", "order"]);
    }

    #[test]
    fn only_first_namespace_is_emitted() {
        let mut gen = SchemaGen::new();
        gen.generate_wrapper("a", "urn:first", &native_type("int"), WrapperRole::Request);
        gen.generate_wrapper("b", "urn:second", &native_type("int"), WrapperRole::Request);
        let schema = gen.generate_schema().unwrap();

        assert_eq!(schema.attribute("targetNamespace"), Some("urn:first"));
        assert_eq!(schema.elements_named(SCHEMA_NS, "element").count(), 1);
    }

    #[test]
    fn empty_generator_has_no_schema() {
        assert!(SchemaGen::new().generate_schema().is_none());
    }
}
