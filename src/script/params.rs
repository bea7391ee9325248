//! Script entry-point parameters
//!
//! Job submissions carry a typed parameter list for the script's entry
//! point. Plain kinds map straight onto JSON; the `collection` and
//! `declaration` kinds are structured references to remote objects and are
//! validated before anything goes on the wire.

use crate::error::{Error, Result};
use crate::fields::Fields;
use serde_json::{json, Value};

/// A tagged entry-point argument value.
#[derive(Debug, Clone)]
pub enum Parameter {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Array(Vec<Value>),
    Object(Fields),
    /// Reference to a set of already provisioned remote objects.
    Collection {
        namespace: String,
        rtype: String,
        hrefs: Vec<String>,
        details: Vec<Fields>,
    },
    /// Reference to a remote object that does not exist yet.
    Declaration {
        namespace: String,
        rtype: String,
        fields: Fields,
    },
}

impl Parameter {
    /// Wire name of the parameter kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Parameter::String(_) => "string",
            Parameter::Number(_) => "number",
            Parameter::Bool(_) => "bool",
            Parameter::Null => "null",
            Parameter::Array(_) => "array",
            Parameter::Object(_) => "object",
            Parameter::Collection { .. } => "collection",
            Parameter::Declaration { .. } => "declaration",
        }
    }

    /// Structural validation. The object-reference kinds carry fixed
    /// required keys and must be complete before use.
    pub fn validate(&self) -> Result<()> {
        match self {
            Parameter::Collection {
                namespace,
                rtype,
                hrefs,
                ..
            } => {
                if namespace.is_empty() || rtype.is_empty() {
                    return Err(Error::Validation(
                        "collection parameter requires namespace and type".into(),
                    ));
                }
                if hrefs.iter().any(String::is_empty) {
                    return Err(Error::Validation(
                        "collection parameter contains an empty href".into(),
                    ));
                }
                Ok(())
            }
            Parameter::Declaration {
                namespace, rtype, ..
            } => {
                if namespace.is_empty() || rtype.is_empty() {
                    return Err(Error::Validation(
                        "declaration parameter requires namespace and type".into(),
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Wire representation of the value.
    fn value(&self) -> Value {
        match self {
            Parameter::String(s) => Value::String(s.clone()),
            Parameter::Number(n) => json!(n),
            Parameter::Bool(b) => Value::Bool(*b),
            Parameter::Null => Value::Null,
            Parameter::Array(items) => Value::Array(items.clone()),
            Parameter::Object(fields) => Value::Object(fields.clone()),
            Parameter::Collection {
                namespace,
                rtype,
                hrefs,
                details,
            } => json!({
                "namespace": namespace,
                "type": rtype,
                "hrefs": hrefs,
                "details": details,
            }),
            Parameter::Declaration {
                namespace,
                rtype,
                fields,
            } => json!({
                "namespace": namespace,
                "type": rtype,
                "fields": fields,
            }),
        }
    }
}

/// A parameter bound to an entry-point argument name.
#[derive(Debug, Clone)]
pub struct NamedParameter {
    pub name: String,
    pub value: Parameter,
}

impl NamedParameter {
    pub fn new(name: impl Into<String>, value: Parameter) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Validation("parameter name is empty".into()));
        }
        self.value.validate()
    }

    /// Wire representation: `{name, type, value}`.
    pub fn to_wire(&self) -> Value {
        json!({
            "name": self.name,
            "type": self.value.kind(),
            "value": self.value.value(),
        })
    }
}
