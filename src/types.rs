//! NewType wrappers for identifiers that cross service boundaries.
//!
//! The collaborators all speak in bare strings; these types keep a package id
//! from being passed where a DAG node id or scheduled task id is expected.
//! They serialize transparently, so the wire format is unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Identifier of an application package as sent by the client
    /// (e.g., "5g-pdsch-mock").
    ///
    /// Resolved through the package catalog into DSL source and target
    /// resources before any collaborator is contacted.
    AppPackageId
);

newtype_string!(
    /// Identifier of a node in the task graph returned by the DSL service.
    ///
    /// Edges refer to nodes through this id.
    NodeId
);

newtype_string!(
    /// Identifier of a task in a schedule returned by the scheduling service.
    TaskId
);

impl AppPackageId {
    /// True when the id is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}
