use std::{
    collections::HashSet,
    fmt::{self, Display},
    sync::OnceLock,
};

use jsonschema::Validator;
use log::error;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

const EXPECTED_NUMBER: &str = "Expected a number";
const EXPECTED_INTEGER: &str = "Expected an integer";
const EXPECTED_STRING: &str = "Expected a string";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

/// Field scoped rejections, in schema order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut violations = Self::default();
        violations.push(field, message);
        violations
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |v| v.field == field)
            .map(|v| v.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }
}

impl Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in self.iter() {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", violation.field, violation.message)?;
            first = false;
        }
        Ok(())
    }
}

pub enum Rule {
    /// String with at least one non-blank character, kept verbatim.
    Required { message: &'static str },
    /// String that may be absent; blank counts as absent and is left out.
    Optional,
    /// Number or numeric string, coerced before the range check.
    Number {
        min: f64,
        max: Option<f64>,
        integer: bool,
        message: &'static str,
    },
    OneOf {
        allowed: &'static [&'static str],
        message: &'static str,
    },
}

impl Rule {
    /// JSON Schema of one field.
    fn property(&self) -> Value {
        match self {
            Rule::Required { .. } => json!({"type": "string", "pattern": "\\S"}),
            Rule::Optional => json!({"type": "string"}),
            Rule::Number {
                min, max, integer, ..
            } => {
                let kind = if *integer { "integer" } else { "number" };
                let mut property = json!({"type": kind, "minimum": min});
                if let Some(max) = max {
                    property["maximum"] = json!(max);
                }
                property
            }
            Rule::OneOf { allowed, .. } => json!({"type": "string", "enum": allowed}),
        }
    }

    /// Form input as the schema checks it. `None` leaves the field out.
    fn prepare(&self, value: Option<&Value>) -> Option<Value> {
        match (self, value) {
            (Rule::Optional, None | Some(Value::Null)) => None,
            (_, None | Some(Value::Null)) => Some(Value::Null),
            (Rule::Optional, Some(Value::String(s))) if s.trim().is_empty() => None,
            (Rule::Number { .. }, Some(Value::String(s))) => {
                Some(coerce_number(s).unwrap_or_else(|| Value::String(s.clone())))
            }
            (Rule::Number { .. }, Some(Value::Number(n))) => n.as_f64().map(number_value),
            (_, Some(value)) => Some(value.clone()),
        }
    }

    fn message_for(&self, value: &Value) -> &'static str {
        match self {
            Rule::Required { message } if value.is_string() || value.is_null() => *message,
            Rule::Required { .. } | Rule::Optional => EXPECTED_STRING,
            Rule::Number {
                integer, message, ..
            } => match value.as_f64() {
                Some(number) if *integer && number.fract() != 0.0 => EXPECTED_INTEGER,
                Some(_) => *message,
                None => EXPECTED_NUMBER,
            },
            Rule::OneOf { message, .. } => *message,
        }
    }
}

fn coerce_number(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .map(number_value)
}

fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        Value::Number(Number::from(number as i64))
    } else {
        Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Top level field named by a JSON pointer such as `/size`.
fn field_of(pointer: &str) -> Option<&str> {
    pointer
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|field| !field.is_empty())
}

/// Recognized fields of one resource descriptor. Unknown fields are dropped.
#[derive(Default)]
pub struct Schema {
    fields: Vec<(&'static str, Rule)>,
    defaults: Vec<(&'static str, Value)>,
    validator: OnceLock<Option<Validator>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, rule: Rule) -> Self {
        self.fields.push((name, rule));
        self
    }

    /// Value checked in place of `name` when the candidate leaves it out or sends null.
    pub fn default_value(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.defaults.push((name, value.into()));
        self
    }

    fn fallback(&self, name: &str) -> Option<&Value> {
        self.defaults
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn document(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, rule)| (name.to_string(), rule.property()))
            .collect();
        json!({"type": "object", "properties": properties})
    }

    fn validator(&self) -> Option<&Validator> {
        self.validator
            .get_or_init(|| {
                jsonschema::validator_for(&self.document())
                    .inspect_err(|e| error!("Could not compile schema: {}", e))
                    .ok()
            })
            .as_ref()
    }

    pub fn validate(&self, candidate: &Value) -> Result<Map<String, Value>, Violations> {
        let Some(object) = candidate.as_object() else {
            return Err(Violations::single("_", "Expected an object"));
        };
        let Some(validator) = self.validator() else {
            return Err(Violations::single("_", "Validation is unavailable"));
        };

        let mut normalized = Map::new();
        for (name, rule) in &self.fields {
            let value = object
                .get(*name)
                .filter(|value| !value.is_null())
                .or_else(|| self.fallback(name));
            if let Some(value) = rule.prepare(value) {
                normalized.insert(name.to_string(), value);
            }
        }

        let instance = Value::Object(normalized);
        let failed: HashSet<String> = validator
            .iter_errors(&instance)
            .filter_map(|error| field_of(&error.instance_path.to_string()).map(str::to_string))
            .collect();

        let mut violations = Violations::default();
        for (name, rule) in &self.fields {
            if failed.contains(*name) {
                violations.push(*name, rule.message_for(&instance[*name]));
            }
        }

        match instance {
            Value::Object(normalized) if violations.is_empty() => Ok(normalized),
            _ => Err(violations),
        }
    }

    /// Validates and then deserializes the normalized descriptor into `T`.
    pub fn parse<T: DeserializeOwned>(&self, candidate: &Value) -> Result<T, Violations> {
        let normalized = self.validate(candidate)?;
        serde_json::from_value(Value::Object(normalized))
            .map_err(|e| Violations::single("_", e.to_string()))
    }
}
