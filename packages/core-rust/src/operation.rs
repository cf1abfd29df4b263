//! Service operation descriptors.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::qname::QName;

/// Whether an operation expects a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExchangePattern {
    /// Fire-and-forget: an input message and no reply.
    OneWay,
    /// An input message answered by an output message.
    RequestResponse,
}

/// Immutable description of one operation on a service interface.
///
/// The exchange pattern is never supplied by the caller. It is derived from
/// the presence of an output type at construction time, so the two can never
/// disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOperation {
    name: String,
    input_type: QName,
    output_type: Option<QName>,
    fault_types: BTreeSet<QName>,
    pattern: ExchangePattern,
}

impl ServiceOperation {
    /// Creates an operation; `RequestResponse` iff `output_type` is present.
    pub fn new(name: impl Into<String>, input_type: QName, output_type: Option<QName>) -> Self {
        let pattern = if output_type.is_some() {
            ExchangePattern::RequestResponse
        } else {
            ExchangePattern::OneWay
        };
        Self {
            name: name.into(),
            input_type,
            output_type,
            fault_types: BTreeSet::new(),
            pattern,
        }
    }

    /// Creates a one-way operation.
    pub fn one_way(name: impl Into<String>, input_type: QName) -> Self {
        Self::new(name, input_type, None)
    }

    /// Creates a request-response operation.
    pub fn request_response(name: impl Into<String>, input_type: QName, output_type: QName) -> Self {
        Self::new(name, input_type, Some(output_type))
    }

    /// Returns a copy of this operation declaring the given fault types.
    #[must_use]
    pub fn with_faults(mut self, faults: impl IntoIterator<Item = QName>) -> Self {
        self.fault_types.extend(faults);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn input_type(&self) -> &QName {
        &self.input_type
    }

    #[must_use]
    pub fn output_type(&self) -> Option<&QName> {
        self.output_type.as_ref()
    }

    #[must_use]
    pub fn fault_types(&self) -> &BTreeSet<QName> {
        &self.fault_types
    }

    #[must_use]
    pub fn pattern(&self) -> ExchangePattern {
        self.pattern
    }
}
