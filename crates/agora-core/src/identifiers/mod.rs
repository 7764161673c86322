//! Validated identifier types
//!
//! Every actor in Agora is addressed by an [`ActorIdentity`]: the persona
//! type it plays, its actor id, and the conversation run it belongs to. The
//! identity derives a deterministic [`ActorHandle`] used for directory
//! lookup, start and signal delivery:
//!
//! ```text
//! lower(persona_type) + "_" + actor_id + "_" + run_id
//! ```
//!
//! All identifier newtypes share the rules in [`IdValidator`]: non-empty,
//! at most 128 characters, no surrounding whitespace, only `[A-Za-z0-9._-]`
//! and no `..` sequences.
//!
//! ```rust
//! use agora_core::identifiers::{ActorId, ActorIdentity, PersonaType, RunId};
//!
//! let identity = ActorIdentity::new(
//!     PersonaType::parse("Issuer").unwrap(),
//!     ActorId::parse("HDFCBank").unwrap(),
//!     RunId::parse("run-1").unwrap(),
//! );
//! assert_eq!(identity.handle().as_str(), "issuer_HDFCBank_run-1");
//! ```

mod validation;

pub use validation::{IdValidationError, IdValidator, MAX_ID_LENGTH};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! validated_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate from a string
            pub fn parse(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
                IdValidator::validate(id.as_ref()).map(|s| Self(s.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Construct without validation. Test and literal use only.
            #[doc(hidden)]
            pub fn new_unchecked(id: impl Into<String>) -> Self {
                Self(id.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                IdValidator::validate(&value)?;
                Ok(Self(value))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

validated_id!(
    /// Identifier of one actor (also the operator's user id), e.g. `Anil` or `HDFCBank`
    ActorId
);

validated_id!(
    /// Persona an actor plays, e.g. `Consumer`, `Merchant`, `Issuer`
    ///
    /// Persona types are compared case-insensitively when deriving handles,
    /// so `Issuer` and `issuer` address the same actor.
    PersonaType
);

validated_id!(
    /// Conversation run an actor belongs to
    RunId
);

validated_id!(
    /// Name of a tool as exposed to the completion service
    ToolName
);

impl PersonaType {
    /// Lower-cased form used in handles and config file names
    pub fn canonical(&self) -> String {
        self.0.to_lowercase()
    }
}

/// Deterministic handle of an actor instance
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorHandle(String);

impl ActorHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the task queue an actor's host serves
    pub fn queue_name(actor_id: &ActorId) -> String {
        format!("{actor_id}-queue")
    }
}

impl fmt::Display for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable identity of an actor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub persona_type: PersonaType,
    pub actor_id: ActorId,
    pub run_id: RunId,
}

impl ActorIdentity {
    pub fn new(persona_type: PersonaType, actor_id: ActorId, run_id: RunId) -> Self {
        Self {
            persona_type,
            actor_id,
            run_id,
        }
    }

    pub fn handle(&self) -> ActorHandle {
        ActorHandle(format!(
            "{}_{}_{}",
            self.persona_type.canonical(),
            self.actor_id,
            self.run_id
        ))
    }
}

impl fmt::Display for ActorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.handle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(persona: &str, actor: &str, run: &str) -> ActorIdentity {
        ActorIdentity::new(
            PersonaType::parse(persona).unwrap(),
            ActorId::parse(actor).unwrap(),
            RunId::parse(run).unwrap(),
        )
    }

    #[test]
    fn handle_lowercases_persona_only() {
        let id = identity("Consumer", "Anil", "R1");
        assert_eq!(id.handle().as_str(), "consumer_Anil_R1");
    }

    #[test]
    fn persona_case_does_not_change_handle() {
        assert_eq!(
            identity("ISSUER", "ICICIBank", "r").handle(),
            identity("issuer", "ICICIBank", "r").handle()
        );
    }

    #[test]
    fn ids_roundtrip_through_serde_with_validation() {
        let id: ActorId = serde_json::from_str("\"Amazon\"").unwrap();
        assert_eq!(id.as_str(), "Amazon");
        assert!(serde_json::from_str::<ActorId>("\"not valid\"").is_err());
    }

    #[test]
    fn queue_name_follows_actor_id() {
        let id = ActorId::parse("Croma").unwrap();
        assert_eq!(ActorHandle::queue_name(&id), "Croma-queue");
    }
}
