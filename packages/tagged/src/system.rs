//! System declaration and dispatch.
//!
//! A system is a behaviour with one type constraint per argument. Each world
//! keeps one bucket per argument of every system it knows about (see
//! `SystemIndex`), and running a system walks those buckets with nested
//! iteration, invoking the behaviour once per combination.
//!
//! The iteration is a cartesian product, not a join: if two arguments share a
//! constraint, the behaviour sees every ordered pair, including an entity
//! paired with itself. Behaviours which care must filter those out
//! themselves.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use tracing::trace;

use crate::engine::Engine;
use crate::entity::EntityId;
use crate::error::{Error, Result};
use crate::tag::{TagId, TagRegistry, TagSet};

/// The body of a system.
pub type Behavior = Rc<dyn Fn(&mut Engine, &[EntityId]) -> anyhow::Result<()>>;

/// The declaration of a system, as written by the user.
#[derive(Clone)]
pub struct SystemDef {
    name: String,
    arity: Option<usize>,
    args: Vec<Vec<String>>,
    inline: bool,
    behavior: Behavior,
}

impl SystemDef {
    /// Create a new system with no arguments.
    pub fn new<F>(name: impl Into<String>, behavior: F) -> SystemDef
        where F: Fn(&mut Engine, &[EntityId]) -> anyhow::Result<()> + 'static
    {
        SystemDef {
            name: name.into(),
            arity: None,
            args: Vec::new(),
            inline: false,
            behavior: Rc::new(behavior),
        }
    }

    /// Add an argument which matches entities satisfying every named trait or kind.
    pub fn arg<S: AsRef<str>>(mut self, constraint: &[S]) -> Self {
        self.args.push(constraint.iter().map(|s| s.as_ref().to_owned()).collect());
        self
    }

    /// State the expected number of arguments.
    ///
    /// Declaring the system fails if the number of `arg` calls differs.
    pub fn arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Hint that the behaviour is small enough to inline into the runner.
    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    /// Return the name of this system.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Debug for SystemDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDef")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

/// A registered system.
pub struct SystemDecl {
    name: Rc<str>,
    constraints: Vec<TagSet>,
    inline: bool,
    behavior: Behavior,
}

impl SystemDecl {
    /// Validate a `SystemDef` against the declared traits and kinds.
    pub(crate) fn resolve(def: SystemDef, tags: &TagRegistry) -> Result<SystemDecl> {
        if let Some(arity) = def.arity {
            if arity != def.args.len() {
                return Err(Error::Arity {
                    system: def.name,
                    expected: arity,
                    found: def.args.len(),
                });
            }
        }

        let constraints = def.args.iter()
            .map(|names| tags.resolve(names.as_slice()))
            .collect::<Result<Vec<_>>>()?;

        Ok(SystemDecl {
            name: Rc::from(def.name),
            constraints,
            inline: def.inline,
            behavior: def.behavior,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the number of arguments.
    pub fn arity(&self) -> usize {
        self.constraints.len()
    }

    /// Return the tags each argument requires.
    pub fn constraints(&self) -> &[TagSet] {
        &self.constraints
    }

    pub fn is_inline(&self) -> bool {
        self.inline
    }

    /// Return true if an entity of `kind` belongs in argument `position`.
    pub fn accepts(&self, tags: &TagRegistry, position: usize, kind: TagId) -> bool {
        tags.satisfies(kind, &self.constraints[position])
    }

    pub(crate) fn behavior(&self) -> Behavior {
        self.behavior.clone()
    }
}

impl Debug for SystemDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<system {} {:?}>", self.name, self.constraints)
    }
}

/// The catalogue of declared systems.
#[derive(Default)]
pub struct SystemRegistry {
    systems: HashMap<String, Rc<SystemDecl>>,
}

impl SystemRegistry {
    pub fn new() -> SystemRegistry {
        SystemRegistry::default()
    }

    /// Register a system, replacing any previous system of the same name.
    pub(crate) fn insert(&mut self, decl: SystemDecl) -> Rc<SystemDecl> {
        let decl = Rc::new(decl);
        self.systems.insert(decl.name().to_owned(), decl.clone());
        decl
    }

    /// Find a system by name.
    pub fn get(&self, name: &str) -> Option<&Rc<SystemDecl>> {
        self.systems.get(name)
    }

    /// Iterate over every declared system.
    pub fn iter(&self) -> impl Iterator<Item=&Rc<SystemDecl>> {
        self.systems.values()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

/// Nested iteration over the buckets of one system.
///
/// Buckets are read from whichever world is current when each level of the
/// iteration starts, and each level works from a copy of its bucket. A
/// combination is only passed to the behaviour if every entity in it is
/// still alive, so behaviours can destroy entities as they go.
pub(crate) struct Runner {
    decl: Rc<SystemDecl>,
    behavior: Behavior,
    combination: Vec<EntityId>,
}

impl Runner {
    pub fn new(decl: Rc<SystemDecl>) -> Runner {
        let behavior = decl.behavior();
        let combination = Vec::with_capacity(decl.arity());
        Runner {
            decl,
            behavior,
            combination,
        }
    }

    /// Invoke the behaviour once for every combination of matching entities.
    ///
    /// The first failure stops the run and is returned.
    pub fn run(&mut self, engine: &mut Engine) -> Result<()> {
        if self.decl.arity() == 0 {
            return Ok(());
        }
        match engine.world().system_index(self.decl.name()) {
            Some(index) if !index.has_empty_bucket() => {}
            _ => return Ok(()),
        }

        self.combination.clear();
        self.descend(engine, 0)
    }

    fn descend(&mut self, engine: &mut Engine, position: usize) -> Result<()> {
        if position == self.decl.arity() {
            let world = engine.world();
            if !self.combination.iter().all(|id| world.contains(*id)) {
                return Ok(());
            }

            trace!(system = %self.decl.name(), combination = ?self.combination, "invoke");
            return (self.behavior)(engine, &self.combination).map_err(Error::Behavior);
        }

        let ids: Vec<EntityId> = match engine.world().system_index(self.decl.name()) {
            Some(index) if index.arity() == self.decl.arity() =>
                index.buckets()[position].iter().copied().collect(),
            _ => return Ok(()),
        };

        for id in ids {
            if !engine.world().contains(id) {
                continue;
            }

            self.combination.push(id);
            let result = self.descend(engine, position + 1);
            self.combination.pop();
            result?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tag::{KindDef, TraitDef};

    fn registry() -> TagRegistry {
        let mut tags = TagRegistry::new();
        tags.declare_trait(TraitDef::new("edible")).unwrap();
        tags.declare_trait(TraitDef::new("moving")).unwrap();
        tags.declare_kind(KindDef::new("rabbit").with("edible").with("moving")).unwrap();
        tags.declare_kind(KindDef::new("potion").with("edible")).unwrap();
        tags
    }

    #[test]
    fn test_resolve() {
        let tags = registry();
        let decl = SystemDecl::resolve(SystemDef::new("eat", |_, _| Ok(()))
            .arg(&["edible", "moving"])
            .arg(&["potion"])
            .arity(2)
            .inline(true), &tags).unwrap();

        assert_eq!(decl.name(), "eat");
        assert_eq!(decl.arity(), 2);
        assert!(decl.is_inline());

        let rabbit = tags.lookup("rabbit").unwrap();
        let potion = tags.lookup("potion").unwrap();
        assert!(decl.accepts(&tags, 0, rabbit));
        assert!(!decl.accepts(&tags, 0, potion));
        assert!(decl.accepts(&tags, 1, potion));
        assert!(!decl.accepts(&tags, 1, rabbit));
    }

    #[test]
    fn test_resolve_errors() {
        let tags = registry();
        let wrong_arity = SystemDef::new("eat", |_, _| Ok(())).arg(&["edible"]).arity(2);
        assert!(matches!(SystemDecl::resolve(wrong_arity, &tags),
            Err(Error::Arity { expected: 2, found: 1, .. })));

        let unknown = SystemDef::new("fly", |_, _| Ok(())).arg(&["wings"]);
        assert!(matches!(SystemDecl::resolve(unknown, &tags), Err(Error::UnknownType(_))));
    }

    #[test]
    fn test_registry_replaces() {
        let tags = registry();
        let mut systems = SystemRegistry::new();
        systems.insert(SystemDecl::resolve(SystemDef::new("eat", |_, _| Ok(())).arg(&["edible"]), &tags).unwrap());
        systems.insert(SystemDecl::resolve(SystemDef::new("eat", |_, _| Ok(())), &tags).unwrap());
        assert_eq!(systems.len(), 1);
        assert_eq!(systems.get("eat").unwrap().arity(), 0);
    }
}
