//! Composite resource identifiers.
//!
//! Teams, repositories and pruning policies live under an organization and
//! MSR gives them no flat durable key. A composite id joins the parent and
//! child parts with [`ID_DELIMITER`] so the pair can be stored as a single
//! string. Neither part may contain the delimiter.

use std::fmt;
use std::str::FromStr;

use crate::error::{MsrError, Result};

/// Separator between the parent and child parts of a composite id.
pub const ID_DELIMITER: &str = "/";

/// Joins a parent and a child identifier into a composite id.
///
/// # Examples
///
/// ```
/// use msr_client::ids::encode_resource_id;
///
/// assert_eq!(encode_resource_id("acme", "backend"), "acme/backend");
/// ```
#[must_use]
pub fn encode_resource_id(parent: &str, child: &str) -> String {
    format!("{parent}{ID_DELIMITER}{child}")
}

/// Splits a composite id into its parent and child parts.
///
/// # Errors
///
/// Returns [`MsrError::InvalidResourceId`] unless the id contains exactly one
/// delimiter with a non-empty part on each side.
///
/// # Examples
///
/// ```
/// use msr_client::ids::decode_resource_id;
///
/// assert_eq!(decode_resource_id("acme/backend").unwrap(), ("acme", "backend"));
/// assert!(decode_resource_id("acme").is_err());
/// assert!(decode_resource_id("acme/backend/extra").is_err());
/// ```
pub fn decode_resource_id(id: &str) -> Result<(&str, &str)> {
    let mut parts = id.split(ID_DELIMITER);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(parent), Some(child), None) if !parent.is_empty() && !child.is_empty() => {
            Ok((parent, child))
        }
        _ => Err(MsrError::InvalidResourceId { id: id.to_string() }),
    }
}

/// A parsed composite id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    parent: String,
    child: String,
}

impl ResourceId {
    /// Creates a composite id from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::InvalidResourceId`] if either part is empty or
    /// contains the delimiter, since the result could not be decoded again.
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Result<Self> {
        let parent = parent.into();
        let child = child.into();
        let valid = |part: &str| !part.is_empty() && !part.contains(ID_DELIMITER);
        if valid(&parent) && valid(&child) {
            Ok(Self { parent, child })
        } else {
            Err(MsrError::InvalidResourceId {
                id: encode_resource_id(&parent, &child),
            })
        }
    }

    /// Parses a composite id.
    ///
    /// # Errors
    ///
    /// See [`decode_resource_id`].
    pub fn parse(id: &str) -> Result<Self> {
        let (parent, child) = decode_resource_id(id)?;
        Ok(Self {
            parent: parent.to_string(),
            child: child.to_string(),
        })
    }

    /// The organization (parent) part.
    #[must_use]
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// The resource (child) part.
    #[must_use]
    pub fn child(&self) -> &str {
        &self.child
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ID_DELIMITER}{}", self.parent, self.child)
    }
}

impl FromStr for ResourceId {
    type Err = MsrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
