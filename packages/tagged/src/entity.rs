//! Entity identity and per-entity field storage.

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::field::Value;
use crate::tag::TagId;

/// The ID of a single entity.
///
/// Entity IDs are unique per World. They are not unique across worlds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Create a new EntityId given the inner unique ID.
    pub fn new(id: u64) -> EntityId {
        EntityId(id)
    }

    /// Return the inner unique ID.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A live (or detached) entity.
///
/// The set of fields an entity has is fixed by its kind when it is created.
/// Values may be changed through `set` but fields cannot be added or removed.
#[derive(Clone)]
pub struct Entity {
    id: EntityId,
    kind: TagId,
    kind_name: Rc<str>,
    fields: BTreeMap<String, Value>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, kind: TagId, kind_name: Rc<str>, fields: BTreeMap<String, Value>) -> Entity {
        Entity {
            id,
            kind,
            kind_name,
            fields,
        }
    }

    pub(crate) fn with_id(mut self, id: EntityId) -> Entity {
        self.id = id;
        self
    }

    /// Return the ID of this entity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Return the kind this entity was created as.
    pub fn kind(&self) -> TagId {
        self.kind
    }

    /// Return the name of this entity's kind.
    pub fn kind_name(&self) -> &str {
        &self.kind_name
    }

    /// Fetch the value of a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Replace the value of a field.
    ///
    /// The new value must have the same type as the field's declaration.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let slot = match self.fields.get_mut(field) {
            Some(slot) => slot,
            None => return Err(Error::UnknownField {
                kind: self.kind_name.to_string(),
                field: field.to_owned(),
            }),
        };

        let expected = slot.field_type();
        if expected != value.field_type() {
            return Err(Error::FieldType {
                kind: self.kind_name.to_string(),
                field: field.to_owned(),
                expected: expected.name(),
                found: value.field_type().name(),
            });
        }

        *slot = value;
        Ok(())
    }

    /// Iterate over every field and its current value.
    pub fn fields(&self) -> impl Iterator<Item=(&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Debug for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<{} #{}>", self.kind_name, self.id.0)
    }
}
