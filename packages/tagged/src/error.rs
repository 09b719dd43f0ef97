//! Error types.
//!
//! Looking up something which isn't there (an entity, a scene) is routine and
//! is never an error. Errors are reserved for malformed declarations and for
//! failures raised by user code, which are passed through untouched.

use std::io;

use thiserror::Error;

/// The error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A trait, kind or constraint referred to a type name which was never declared.
    #[error("unknown trait or kind `{0}`")]
    UnknownType(String),

    /// A trait tried to include a name which is an entity kind.
    #[error("`{0}` is an entity kind, not a trait")]
    NotATrait(String),

    /// An entity was created from a name which is a trait, not a kind.
    #[error("`{0}` is a trait, not an entity kind")]
    NotAKind(String),

    /// A trait or kind was declared twice.
    #[error("trait or kind `{0}` is already declared")]
    DuplicateType(String),

    /// Two sources of a type's fields disagree about a field's type.
    #[error("field `{field}` of `{owner}` is declared as both {first} and {second}")]
    FieldConflict {
        owner: String,
        field: String,
        first: &'static str,
        second: &'static str,
    },

    /// An entity was given a field its kind does not declare.
    #[error("`{kind}` has no field `{field}`")]
    UnknownField { kind: String, field: String },

    /// A field value has the wrong type.
    #[error("field `{field}` of `{kind}` expects {expected}, got {found}")]
    FieldType {
        kind: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A system was declared or called with the wrong number of arguments.
    #[error("system `{system}` takes {expected} arguments, got {found}")]
    Arity {
        system: String,
        expected: usize,
        found: usize,
    },

    /// No system with the given name has been declared.
    #[error("unknown system `{0}`")]
    UnknownSystem(String),

    /// A loop configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A configuration file could not be read.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A behaviour, hook or scene callback failed.
    #[error(transparent)]
    Behavior(#[from] anyhow::Error),
}

/// A `Result` specialised to this crate's `Error`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
