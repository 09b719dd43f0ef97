//! Trait and kind declarations.
//!
//! Every trait and every entity kind is allocated a `TagId`. A kind's tag
//! set is fixed when it is declared: it contains the kind itself plus the
//! closure of every trait and parent kind it names. Whether an entity matches
//! a system argument is then a subset test between the argument's required
//! tags and the entity kind's tag set.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use bit_vec::BitVec;
use tracing::debug;

use crate::engine::Engine;
use crate::entity::EntityId;
use crate::error::{Error, Result};
use crate::field::FieldDef;

/// A tag ID which is unique for a trait or kind within one `TagRegistry`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagId(usize);

impl TagId {
    pub(crate) fn new(inner: usize) -> TagId {
        TagId(inner)
    }

    /// Return the inner unique ID.
    pub fn id(&self) -> usize {
        self.0
    }
}

impl Debug for TagId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TagId(#{})", self.0)
    }
}

/// A set of tags backed by a bit vector.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TagSet(BitVec);

impl TagSet {
    /// Create a new empty `TagSet`.
    pub fn new() -> TagSet {
        TagSet(BitVec::new())
    }

    /// Insert a tag into this set.
    pub fn insert(&mut self, tag: TagId) {
        if tag.0 >= self.0.len() {
            let extra = tag.0 + 1 - self.0.len();
            self.0.grow(extra, false);
        }
        self.0.set(tag.0, true);
    }

    /// Insert every tag in `other` into this set.
    pub fn extend(&mut self, other: &TagSet) {
        for tag in other.iter() {
            self.insert(tag);
        }
    }

    /// Returns true if this set contains the given tag.
    pub fn contains(&self, tag: TagId) -> bool {
        self.0.get(tag.0).unwrap_or(false)
    }

    /// Returns true if this set contains every tag in `required`.
    pub fn includes_all(&self, required: &TagSet) -> bool {
        required.iter().all(|tag| self.contains(tag))
    }

    /// Returns true if there are no tags in this set.
    pub fn is_empty(&self) -> bool {
        self.0.none()
    }

    /// Iterate over the tags in this set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item=TagId> + '_ {
        self.0.iter()
            .enumerate()
            .filter(|(_, present)| *present)
            .map(|(idx, _)| TagId(idx))
    }
}

impl Debug for TagSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|t| t.0)).finish()
    }
}

/// A hook run when an entity of a kind is created or destroyed.
pub type Hook = Rc<dyn Fn(&mut Engine, EntityId) -> anyhow::Result<()>>;

/// Whether a tag names a trait or an entity kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Trait,
    Kind,
}

/// The declaration of a trait.
#[derive(Clone, Debug)]
pub struct TraitDef {
    name: String,
    includes: Vec<String>,
    fields: Vec<FieldDef>,
}

impl TraitDef {
    pub fn new(name: impl Into<String>) -> TraitDef {
        TraitDef {
            name: name.into(),
            includes: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Make this trait include every tag and field of another trait.
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.includes.push(name.into());
        self
    }

    /// Add a field to this trait.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// The declaration of an entity kind.
#[derive(Clone)]
pub struct KindDef {
    name: String,
    parents: Vec<String>,
    fields: Vec<FieldDef>,
    on_create: Option<Hook>,
    on_destroy: Option<Hook>,
}

impl KindDef {
    pub fn new(name: impl Into<String>) -> KindDef {
        KindDef {
            name: name.into(),
            parents: Vec::new(),
            fields: Vec::new(),
            on_create: None,
            on_destroy: None,
        }
    }

    /// Give this kind a trait, or make it extend another kind.
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.parents.push(name.into());
        self
    }

    /// Add a field to this kind.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Run `hook` after an entity of this kind has been created and indexed.
    pub fn on_create<F>(mut self, hook: F) -> Self
        where F: Fn(&mut Engine, EntityId) -> anyhow::Result<()> + 'static
    {
        self.on_create = Some(Rc::new(hook));
        self
    }

    /// Run `hook` after an entity of this kind has been removed from every index.
    pub fn on_destroy<F>(mut self, hook: F) -> Self
        where F: Fn(&mut Engine, EntityId) -> anyhow::Result<()> + 'static
    {
        self.on_destroy = Some(Rc::new(hook));
        self
    }
}

impl Debug for KindDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindDef")
            .field("name", &self.name)
            .field("parents", &self.parents)
            .field("fields", &self.fields)
            .finish()
    }
}

/// The registered form of a trait or kind.
pub struct TagRegistration {
    id: TagId,
    name: Rc<str>,
    kind: TagKind,
    closure: TagSet,
    fields: Vec<FieldDef>,
    on_create: Option<Hook>,
    on_destroy: Option<Hook>,
}

impl TagRegistration {
    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Rc<str> {
        self.name.clone()
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    /// Return this tag plus every tag it inherits.
    pub fn closure(&self) -> &TagSet {
        &self.closure
    }

    /// Return every field, including inherited ones.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub(crate) fn on_create(&self) -> Option<Hook> {
        self.on_create.clone()
    }

    pub(crate) fn on_destroy(&self) -> Option<Hook> {
        self.on_destroy.clone()
    }
}

impl Debug for TagRegistration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<{:?} {} {:?}>", self.kind, self.name, self.closure)
    }
}

/// The static type hierarchy: every declared trait and kind.
#[derive(Default)]
pub struct TagRegistry {
    tags: Vec<TagRegistration>,
    by_name: HashMap<String, TagId>,
}

impl TagRegistry {
    /// Create a new empty registry.
    pub fn new() -> TagRegistry {
        TagRegistry::default()
    }

    /// Return the number of declared traits and kinds.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Find a trait or kind by name.
    pub fn lookup(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    /// Fetch the registration for a tag.
    pub fn registration(&self, tag: TagId) -> &TagRegistration {
        &self.tags[tag.0]
    }

    /// Resolve a list of trait or kind names into the set of tags they require.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<TagSet> {
        let mut set = TagSet::new();
        for name in names {
            let name = name.as_ref();
            let tag = self.lookup(name)
                .ok_or_else(|| Error::UnknownType(name.to_owned()))?;
            set.insert(tag);
        }
        Ok(set)
    }

    /// Returns true if entities of `kind` satisfy every tag in `required`.
    pub fn satisfies(&self, kind: TagId, required: &TagSet) -> bool {
        self.registration(kind).closure.includes_all(required)
    }

    /// Iterate over the traits (not kinds) in a kind's closure.
    pub fn traits_of(&self, kind: TagId) -> impl Iterator<Item=TagId> + '_ {
        self.registration(kind).closure.iter()
            .filter(move |tag| self.tags[tag.0].kind == TagKind::Trait)
    }

    /// Declare a new trait.
    pub fn declare_trait(&mut self, def: TraitDef) -> Result<TagId> {
        for name in &def.includes {
            let tag = self.lookup(name)
                .ok_or_else(|| Error::UnknownType(name.clone()))?;
            if self.tags[tag.0].kind != TagKind::Trait {
                return Err(Error::NotATrait(name.clone()));
            }
        }

        self.register(TagKind::Trait, def.name, &def.includes, def.fields, None, None)
    }

    /// Declare a new entity kind.
    pub fn declare_kind(&mut self, def: KindDef) -> Result<TagId> {
        self.register(TagKind::Kind, def.name, &def.parents, def.fields, def.on_create, def.on_destroy)
    }

    fn register(
        &mut self,
        kind: TagKind,
        name: String,
        parents: &[String],
        own_fields: Vec<FieldDef>,
        on_create: Option<Hook>,
        on_destroy: Option<Hook>,
    ) -> Result<TagId> {
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateType(name));
        }

        let id = TagId(self.tags.len());
        let mut closure = TagSet::new();
        closure.insert(id);

        let mut fields: Vec<FieldDef> = Vec::new();
        for parent in parents {
            let tag = self.lookup(parent)
                .ok_or_else(|| Error::UnknownType(parent.clone()))?;
            let reg = &self.tags[tag.0];
            closure.extend(&reg.closure);
            for field in reg.fields.iter() {
                merge_field(&name, &mut fields, field.clone(), false)?;
            }
        }

        for field in own_fields {
            merge_field(&name, &mut fields, field, true)?;
        }

        debug!(name = %name, ?kind, tags = ?closure, "declared type");

        self.by_name.insert(name.clone(), id);
        self.tags.push(TagRegistration {
            id,
            name: Rc::from(name),
            kind,
            closure,
            fields,
            on_create,
            on_destroy,
        });
        Ok(id)
    }
}

/// Add `field` to `fields`, checking that any field of the same name agrees on type.
///
/// Own fields replace the default of an inherited field of the same name.
fn merge_field(owner: &str, fields: &mut Vec<FieldDef>, field: FieldDef, own: bool) -> Result<()> {
    match fields.iter_mut().find(|f| f.name() == field.name()) {
        None => fields.push(field),
        Some(existing) => {
            if existing.field_type() != field.field_type() {
                return Err(Error::FieldConflict {
                    owner: owner.to_owned(),
                    field: field.name().to_owned(),
                    first: existing.field_type().name(),
                    second: field.field_type().name(),
                });
            }
            if own {
                *existing = field;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::{FieldType, Value};

    fn registry() -> TagRegistry {
        let mut r = TagRegistry::new();
        r.declare_trait(TraitDef::new("edible")
            .field(FieldDef::new("energy", FieldType::Int))).unwrap();
        r.declare_trait(TraitDef::new("visible")
            .field(FieldDef::new("x", FieldType::Float))
            .field(FieldDef::new("y", FieldType::Float))).unwrap();
        r.declare_trait(TraitDef::new("sprite").include("visible")).unwrap();
        r.declare_kind(KindDef::new("potion").with("edible")).unwrap();
        r.declare_kind(KindDef::new("red-potion")
            .with("potion")
            .with("sprite")
            .field(FieldDef::with_default("energy", 10i64))).unwrap();
        r
    }

    #[test]
    fn test_tag_set() {
        let mut s = TagSet::new();
        assert!(s.is_empty());
        s.insert(TagId(3));
        s.insert(TagId(0));
        assert!(s.contains(TagId(3)));
        assert!(!s.contains(TagId(1)));
        assert!(!s.contains(TagId(400)));
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![TagId(0), TagId(3)]);

        let mut required = TagSet::new();
        required.insert(TagId(3));
        assert!(s.includes_all(&required));
        required.insert(TagId(9));
        assert!(!s.includes_all(&required));
        assert!(s.includes_all(&TagSet::new()));
    }

    #[test]
    fn test_closure() {
        let r = registry();
        let red = r.lookup("red-potion").unwrap();
        let closure = r.registration(red).closure();

        for name in ["red-potion", "potion", "edible", "sprite", "visible"] {
            assert!(closure.contains(r.lookup(name).unwrap()), "missing {}", name);
        }

        let potion = r.lookup("potion").unwrap();
        assert!(!r.registration(potion).closure().contains(r.lookup("visible").unwrap()));

        let traits: Vec<_> = r.traits_of(red).map(|t| r.registration(t).name().to_owned()).collect();
        assert_eq!(traits, vec!["edible", "visible", "sprite"]);
    }

    #[test]
    fn test_satisfies() {
        let r = registry();
        let potion = r.lookup("potion").unwrap();
        let red = r.lookup("red-potion").unwrap();

        let edible = r.resolve(&["edible"]).unwrap();
        let edible_sprite = r.resolve(&["edible", "sprite"]).unwrap();
        let is_potion = r.resolve(&["potion"]).unwrap();

        assert!(r.satisfies(potion, &edible));
        assert!(!r.satisfies(potion, &edible_sprite));
        assert!(r.satisfies(red, &edible_sprite));
        assert!(r.satisfies(red, &is_potion));
    }

    #[test]
    fn test_fields_inherited() {
        let r = registry();
        let red = r.registration(r.lookup("red-potion").unwrap());
        let names: Vec<_> = red.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["energy", "x", "y"]);
        assert_eq!(red.fields()[0].default_value(), &Value::Int(10));
    }

    #[test]
    fn test_malformed() {
        let mut r = registry();
        assert!(matches!(r.declare_trait(TraitDef::new("edible")), Err(Error::DuplicateType(_))));
        assert!(matches!(r.declare_kind(KindDef::new("rock").with("heavy")), Err(Error::UnknownType(_))));
        assert!(matches!(r.declare_trait(TraitDef::new("drink").include("potion")), Err(Error::NotATrait(_))));
        assert!(matches!(
            r.declare_kind(KindDef::new("fake").with("edible").field(FieldDef::new("energy", FieldType::Text))),
            Err(Error::FieldConflict { .. })));
        assert!(matches!(r.resolve(&["edible", "nope"]), Err(Error::UnknownType(_))));

        // Failed declarations don't leave anything behind.
        assert!(r.lookup("rock").is_none());
        assert!(r.lookup("fake").is_none());
        assert_eq!(r.len(), 5);
    }
}
