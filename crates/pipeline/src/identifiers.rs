//! Newtype identifiers for resources, controllers, and requests.
//!
//! Every concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally passing a [`ControllerName`]
//! where a [`ResourceName`] is expected even though both are strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// A URI-style resource name in `scheme:path` form (e.g. `mem:greeting`,
    /// `file:/etc/app.conf`, `http://host/api/x`).
    ///
    /// Names without a scheme are *relative* and are only served by controllers
    /// that declare relative support. A single-letter prefix (`C:\temp`) is a
    /// drive letter, not a scheme.
    ResourceName
}

impl ResourceName {
    /// Returns the scheme (the text before the first `:`), lower-cased.
    ///
    /// `None` for relative names.
    pub fn scheme(&self) -> Option<String> {
        let (scheme, _) = self.0.split_once(':')?;
        let valid = scheme.len() > 1
            && scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then(|| scheme.to_ascii_lowercase())
    }

    /// Returns the part after the scheme, or the whole name if relative.
    ///
    /// A leading `//` (authority marker) is preserved so HTTP-style names keep
    /// their host.
    pub fn path(&self) -> &str {
        match self.scheme() {
            Some(scheme) => &self.0[scheme.len() + 1..],
            None => &self.0,
        }
    }

    /// Returns `true` if the name carries no scheme.
    pub fn is_relative(&self) -> bool {
        self.scheme().is_none()
    }
}

string_id! {
    /// The configured name of a controller (e.g. `"memory"`, `"files"`).
    ///
    /// Used by [`crate::Request::controller`] to restrict the candidate set and
    /// reported on every [`crate::Response`] a controller produced.
    ControllerName
}

string_id! {
    /// A free-form tag a controller declares so callers can target a family of
    /// controllers (e.g. `"readonly"`, `"disk"`) without naming one.
    ControllerTag
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single pipeline invocation.
///
/// Generated fresh for every [`crate::Request`]; recorded on the invocation span
/// and copied onto the [`crate::Response`] so log lines can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> ResourceName {
        ResourceName::new(value).unwrap()
    }

    #[test]
    fn test_empty_name_is_rejected() {
        assert!(ResourceName::new("").is_none());
        assert!(ControllerName::new(String::new()).is_none());
    }

    #[test]
    fn test_scheme_and_path() {
        let n = name("MEM:greeting");
        assert_eq!(n.scheme().as_deref(), Some("mem"));
        assert_eq!(n.path(), "greeting");

        let n = name("http://host/api/x");
        assert_eq!(n.scheme().as_deref(), Some("http"));
        assert_eq!(n.path(), "//host/api/x");
    }

    #[test]
    fn test_relative_names() {
        assert!(name("config/app.json").is_relative());
        assert!(name(r"C:\temp\a.txt").is_relative());
        assert!(name("%TEMP%/a.txt").is_relative());
        assert!(!name("file:/tmp/x").is_relative());
    }
}
