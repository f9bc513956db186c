//! Parameter shape descriptors.
//!
//! [`TypeSpec`] is the closed set of shapes an interpreter parameter can
//! declare. Specs are plain data: they can be written in Rust with the
//! constructor helpers or authored as JSON (see [`TypeSpec::from_value`]).
//! Turning a spec into a resolver happens in [`crate::compiler`].

use crate::runtime::{EvalError, EvalResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Runtime classification of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => ValueType::Null,
            "boolean" => ValueType::Boolean,
            "number" => ValueType::Number,
            "string" => ValueType::String,
            "array" => ValueType::Array,
            "object" => ValueType::Object,
            _ => return None,
        })
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    /// Any value. With `delay_evaluation` the raw argument is passed through
    /// unevaluated so the handler decides when to evaluate it.
    Any { delay_evaluation: bool },
    Single(ValueType),
    OneOf(Vec<ValueType>),
    Enum(Vec<Value>),
    /// Fixed arity, positional.
    Tuple(Vec<TypeSpec>),
    /// Unbounded homogeneous sequence.
    SequenceOf(Box<TypeSpec>),
    /// Known keys; extra keys pass through.
    Record(BTreeMap<String, TypeSpec>),
    /// Unbounded homogeneous map.
    RecordOf(Box<TypeSpec>),
}

impl TypeSpec {
    pub fn any() -> Self {
        TypeSpec::Any {
            delay_evaluation: false,
        }
    }

    pub fn delayed() -> Self {
        TypeSpec::Any {
            delay_evaluation: true,
        }
    }

    pub fn string() -> Self {
        TypeSpec::Single(ValueType::String)
    }

    pub fn number() -> Self {
        TypeSpec::Single(ValueType::Number)
    }

    pub fn boolean() -> Self {
        TypeSpec::Single(ValueType::Boolean)
    }

    pub fn array() -> Self {
        TypeSpec::Single(ValueType::Array)
    }

    pub fn object() -> Self {
        TypeSpec::Single(ValueType::Object)
    }

    pub fn one_of(types: impl IntoIterator<Item = ValueType>) -> Self {
        TypeSpec::OneOf(types.into_iter().collect())
    }

    pub fn enumeration(values: impl IntoIterator<Item = Value>) -> Self {
        TypeSpec::Enum(values.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = TypeSpec>) -> Self {
        TypeSpec::Tuple(items.into_iter().collect())
    }

    pub fn sequence_of(item: TypeSpec) -> Self {
        TypeSpec::SequenceOf(Box::new(item))
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, TypeSpec)>) -> Self {
        TypeSpec::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn record_of(item: TypeSpec) -> Self {
        TypeSpec::RecordOf(Box::new(item))
    }

    /// Deep shape check of an already-resolved value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            TypeSpec::Any { .. } => true,
            TypeSpec::Single(t) => ValueType::of(value) == *t,
            TypeSpec::OneOf(types) => types.contains(&ValueType::of(value)),
            TypeSpec::Enum(options) => options.contains(value),
            TypeSpec::Tuple(items) => match value {
                Value::Array(arr) => {
                    arr.len() == items.len() && items.iter().zip(arr).all(|(t, v)| t.matches(v))
                }
                _ => false,
            },
            TypeSpec::SequenceOf(item) => match value {
                Value::Array(arr) => arr.iter().all(|v| item.matches(v)),
                _ => false,
            },
            TypeSpec::Record(fields) => match value {
                Value::Object(obj) => fields
                    .iter()
                    .all(|(k, t)| t.matches(obj.get(k).unwrap_or(&Value::Null))),
                _ => false,
            },
            TypeSpec::RecordOf(item) => match value {
                Value::Object(obj) => obj.values().all(|v| item.matches(v)),
                _ => false,
            },
        }
    }

    /// Pass `value` through if it satisfies the spec.
    pub fn check(&self, value: Value) -> EvalResult {
        if self.matches(&value) {
            Ok(value)
        } else {
            Err(EvalError::type_mismatch(self, &value))
        }
    }

    /// Reject shapes that can never match anything.
    pub fn validate(&self) -> Result<(), EvalError> {
        match self {
            TypeSpec::Any { .. } | TypeSpec::Single(_) => Ok(()),
            TypeSpec::OneOf(types) if types.is_empty() => {
                Err(EvalError::invalid_type_spec("oneOf requires at least one type"))
            }
            TypeSpec::OneOf(_) => Ok(()),
            TypeSpec::Enum(options) if options.is_empty() => {
                Err(EvalError::invalid_type_spec("enum requires at least one option"))
            }
            TypeSpec::Enum(_) => Ok(()),
            TypeSpec::Tuple(items) => items.iter().try_for_each(TypeSpec::validate),
            TypeSpec::SequenceOf(item) | TypeSpec::RecordOf(item) => item.validate(),
            TypeSpec::Record(fields) => fields.values().try_for_each(TypeSpec::validate),
        }
    }

    /// Parse the JSON form:
    ///
    /// | form | spec |
    /// |---|---|
    /// | `"any"` | `Any` |
    /// | `{"any": {"delayEvaluation": true}}` | delayed `Any` |
    /// | `"string"` | `Single` |
    /// | `["string", "null"]` | `OneOf` |
    /// | `{"enum": [..]}` | `Enum` |
    /// | `{"tuple": [spec, ..]}` | `Tuple` |
    /// | `{"sequenceOf": spec}` | `SequenceOf` |
    /// | `{"record": {key: spec}}` | `Record` |
    /// | `{"recordOf": spec}` | `RecordOf` |
    pub fn from_value(node: &Value) -> Result<Self, EvalError> {
        let spec = match node {
            Value::String(name) if name == "any" => TypeSpec::any(),
            Value::String(name) => TypeSpec::Single(type_name(name)?),
            Value::Array(names) => TypeSpec::OneOf(
                names
                    .iter()
                    .map(|n| {
                        n.as_str().ok_or_else(|| {
                            EvalError::invalid_type_spec(format!("oneOf entry must be a type name, got {n}"))
                        })
                        .and_then(type_name)
                    })
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(obj) => parse_tagged(obj)?,
            other => {
                return Err(EvalError::invalid_type_spec(format!(
                    "unrecognized type spec {other}"
                )));
            }
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn to_value(&self) -> Value {
        match self {
            TypeSpec::Any {
                delay_evaluation: false,
            } => json!("any"),
            TypeSpec::Any {
                delay_evaluation: true,
            } => json!({"any": {"delayEvaluation": true}}),
            TypeSpec::Single(t) => json!(t.name()),
            TypeSpec::OneOf(types) => Value::Array(types.iter().map(|t| json!(t.name())).collect()),
            TypeSpec::Enum(options) => json!({"enum": options}),
            TypeSpec::Tuple(items) => {
                json!({"tuple": items.iter().map(TypeSpec::to_value).collect::<Vec<_>>()})
            }
            TypeSpec::SequenceOf(item) => json!({"sequenceOf": item.to_value()}),
            TypeSpec::Record(fields) => {
                let fields: Map<String, Value> = fields
                    .iter()
                    .map(|(k, t)| (k.clone(), t.to_value()))
                    .collect();
                json!({"record": fields})
            }
            TypeSpec::RecordOf(item) => json!({"recordOf": item.to_value()}),
        }
    }
}

fn type_name(name: &str) -> Result<ValueType, EvalError> {
    ValueType::from_name(name)
        .ok_or_else(|| EvalError::invalid_type_spec(format!("unknown type name `{name}`")))
}

fn parse_tagged(obj: &Map<String, Value>) -> Result<TypeSpec, EvalError> {
    let mut entries = obj.iter();
    let (Some((tag, body)), None) = (entries.next(), entries.next()) else {
        return Err(EvalError::invalid_type_spec(
            "tagged type spec must have exactly one key",
        ));
    };
    match tag.as_str() {
        "any" => {
            let Value::Object(options) = body else {
                return Err(EvalError::invalid_type_spec("any expects an options object"));
            };
            let delay_evaluation = match options.get("delayEvaluation") {
                None => false,
                Some(Value::Bool(flag)) => *flag,
                Some(other) => {
                    return Err(EvalError::invalid_type_spec(format!(
                        "delayEvaluation must be a boolean, got {other}"
                    )));
                }
            };
            Ok(TypeSpec::Any { delay_evaluation })
        }
        "enum" => match body {
            Value::Array(options) => Ok(TypeSpec::Enum(options.clone())),
            _ => Err(EvalError::invalid_type_spec("enum expects an array of options")),
        },
        "tuple" => match body {
            Value::Array(items) => Ok(TypeSpec::Tuple(
                items.iter().map(TypeSpec::from_value).collect::<Result<_, _>>()?,
            )),
            _ => Err(EvalError::invalid_type_spec("tuple expects an array of specs")),
        },
        "sequenceOf" => Ok(TypeSpec::sequence_of(TypeSpec::from_value(body)?)),
        "record" => match body {
            Value::Object(fields) => Ok(TypeSpec::Record(
                fields
                    .iter()
                    .map(|(k, v)| TypeSpec::from_value(v).map(|spec| (k.clone(), spec)))
                    .collect::<Result<_, _>>()?,
            )),
            _ => Err(EvalError::invalid_type_spec("record expects an object of specs")),
        },
        "recordOf" => Ok(TypeSpec::record_of(TypeSpec::from_value(body)?)),
        other => Err(EvalError::invalid_type_spec(format!(
            "unknown type spec tag `{other}`"
        ))),
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Serialize for TypeSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TypeSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = Value::deserialize(deserializer)?;
        TypeSpec::from_value(&node).map_err(serde::de::Error::custom)
    }
}
