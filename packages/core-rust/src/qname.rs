//! Qualified names: the identity of every message type in the contract model.
//!
//! A [`QName`] is a `(namespace, local_name)` pair. Equality and hashing are
//! structural; the namespace prefix a document happened to use never takes part.
//!
//! # Text form
//!
//! `QName`s render as `{namespace}local` (or just `local` when the namespace is
//! empty) and parse back from the same form. Serde uses the text form so
//! descriptors can spell message types as plain strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A namespace-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: String,
    local_name: String,
}

impl QName {
    /// Creates a qualified name from a namespace URI and a local part.
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
        }
    }

    /// Creates a name with an empty namespace.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new(String::new(), local_name)
    }

    /// The namespace URI. Empty when the name is unqualified.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns `true` if the name has no namespace.
    #[must_use]
    pub fn is_unqualified(&self) -> bool {
        self.namespace.is_empty()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

/// Error returned when a string is not a valid `{namespace}local` name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid qualified name '{input}': {reason}")]
pub struct ParseQNameError {
    input: String,
    reason: &'static str,
}

impl FromStr for QName {
    type Err = ParseQNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseQNameError {
            input: s.to_string(),
            reason,
        };

        let Some(rest) = s.strip_prefix('{') else {
            if s.is_empty() {
                return Err(err("local name is empty"));
            }
            if s.contains('}') {
                return Err(err("unbalanced '}'"));
            }
            return Ok(Self::local(s));
        };

        let (namespace, local) = rest.split_once('}').ok_or_else(|| err("missing '}'"))?;
        if local.is_empty() {
            return Err(err("local name is empty"));
        }
        if local.contains(['{', '}']) {
            return Err(err("braces in local name"));
        }
        Ok(Self::new(namespace, local))
    }
}

impl Serialize for QName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn display_qualified_and_unqualified() {
        let q = QName::new("urn:orders", "submitOrder");
        assert_eq!(q.to_string(), "{urn:orders}submitOrder");
        assert_eq!(QName::local("A").to_string(), "A");
    }

    #[test]
    fn equality_ignores_construction_path() {
        let a = QName::new("urn:x", "y");
        let b: QName = "{urn:x}y".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, QName::new("urn:z", "y"));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!("".parse::<QName>().is_err());
        assert!("{urn:x".parse::<QName>().is_err());
        assert!("{urn:x}".parse::<QName>().is_err());
        assert!("a}b".parse::<QName>().is_err());
    }

    #[test]
    fn serde_uses_text_form() {
        let q = QName::new("urn:hello", "sayHello");
        let json = serde_json::to_string(&q).unwrap();
        assert_eq!(json, "\"{urn:hello}sayHello\"");
        let back: QName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(
            ns in "[a-z:/.]{0,16}",
            local in "[A-Za-z_][A-Za-z0-9_.]{0,12}",
        ) {
            let q = QName::new(ns, local);
            let parsed: QName = q.to_string().parse().unwrap();
            prop_assert_eq!(parsed, q);
        }
    }
}
