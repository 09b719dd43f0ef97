//! Typed fields carried by traits and kinds.
//!
//! Traits contribute fields to every kind which includes them. Entity values
//! are stored dynamically as `Value`s, checked against the declared
//! `FieldType` when they are written.

use std::fmt::{self, Display, Formatter};

use crate::entity::EntityId;

/// The declared type of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Text,
    Entity,
}

impl FieldType {
    /// Return the name of this type, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Text => "text",
            FieldType::Entity => "entity",
        }
    }

    /// Return the zero value for this type.
    pub fn default_value(&self) -> Value {
        match self {
            FieldType::Int => Value::Int(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Bool => Value::Bool(false),
            FieldType::Text => Value::Text(String::new()),
            FieldType::Entity => Value::Entity(None),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically typed field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Entity(Option<EntityId>),
}

impl Value {
    /// Return the `FieldType` of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Int(_) => FieldType::Int,
            Value::Float(_) => FieldType::Float,
            Value::Bool(_) => FieldType::Bool,
            Value::Text(_) => FieldType::Text,
            Value::Entity(_) => FieldType::Entity,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Value::Entity(x) => *x,
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self { Value::Int(x) }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self { Value::Float(x) }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self { Value::Bool(x) }
}

impl From<&str> for Value {
    fn from(x: &str) -> Self { Value::Text(x.to_owned()) }
}

impl From<String> for Value {
    fn from(x: String) -> Self { Value::Text(x) }
}

impl From<EntityId> for Value {
    fn from(x: EntityId) -> Self { Value::Entity(Some(x)) }
}

/// A single named, typed field with a default value.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    name: String,
    field_type: FieldType,
    default: Value,
}

impl FieldDef {
    /// Create a new field which defaults to the zero value of its type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> FieldDef {
        FieldDef {
            name: name.into(),
            field_type,
            default: field_type.default_value(),
        }
    }

    /// Create a new field with an explicit default.
    ///
    /// The type of the field is taken from the default value.
    pub fn with_default(name: impl Into<String>, default: impl Into<Value>) -> FieldDef {
        let default = default.into();
        FieldDef {
            name: name.into(),
            field_type: default.field_type(),
            default,
        }
    }

    /// Return the name of this field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the declared type of this field.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Return the value new entities get when no initial value is supplied.
    pub fn default_value(&self) -> &Value {
        &self.default
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let energy = FieldDef::new("energy", FieldType::Int);
        assert_eq!(energy.default_value(), &Value::Int(0));

        let name = FieldDef::with_default("name", "potion");
        assert_eq!(name.field_type(), FieldType::Text);
        assert_eq!(name.default_value().as_text(), Some("potion"));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(3i64).as_int(), Some(3));
        assert_eq!(Value::from(3i64).as_float(), None);
        assert_eq!(Value::Entity(None).as_entity(), None);
        assert_eq!(Value::from(EntityId::new(4)).as_entity(), Some(EntityId::new(4)));
    }
}
