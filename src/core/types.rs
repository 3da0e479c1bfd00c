//! core::types
//!
//! Strong types shared by the git, webhook and forge layers.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name (integration and automation branches)
//! - [`Oid`] - Git object identifier as carried by webhook payloads
//! - [`RefName`] - Fully qualified reference name (`refs/heads/...`)
//!
//! # Examples
//!
//! ```
//! use doctrace::core::types::{BranchName, Oid, RefName};
//!
//! let branch = BranchName::new("changelog/abc1234").unwrap();
//! let refname = RefName::for_branch(&branch);
//! assert_eq!(refname.as_str(), "refs/heads/changelog/abc1234");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// A validated Git branch name.
///
/// Follows `git check-ref-format --branch`: no empty names, no leading `.`
/// or `-`, no trailing `/` or `.lock`, no `..`, `@{`, `//`, whitespace,
/// control characters or any of `~^:\?*[`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if let Some(reason) = branch_name_violation(&name) {
            return Err(TypeError::InvalidBranchName(format!("'{name}': {reason}")));
        }
        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this branch lives under the given namespace prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(prefix)
    }
}

fn branch_name_violation(name: &str) -> Option<&'static str> {
    const FORBIDDEN: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

    if name.is_empty() {
        return Some("cannot be empty");
    }
    if name == "@" {
        return Some("'@' is reserved");
    }
    if name.starts_with('-') {
        return Some("cannot start with '-'");
    }
    if name.ends_with('/') {
        return Some("cannot end with '/'");
    }
    if name.contains("..") || name.contains("@{") || name.contains("//") {
        return Some("cannot contain '..', '@{' or '//'");
    }
    if name.chars().any(|c| c.is_ascii_control() || FORBIDDEN.contains(&c)) {
        return Some("contains a forbidden character");
    }
    let bad_component = name
        .split('/')
        .any(|part| part.starts_with('.') || part.ends_with(".lock"));
    if bad_component {
        return Some("path components cannot start with '.' or end with '.lock'");
    }
    None
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// Webhook payloads use the all-zero id for "no commit" on the `before`
/// side of a branch creation and the `after` side of a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    const ZERO_SHA1: &'static str = "0000000000000000000000000000000000000000";

    /// Create a new validated object id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!("'{oid}' is not hexadecimal")));
        }
        Ok(Self(oid))
    }

    /// The null object id.
    pub fn zero() -> Self {
        Self(Self::ZERO_SHA1.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0.chars().all(|c| c == '0')
    }

    /// Abbreviated form, clamped to the full length.
    ///
    /// ```
    /// use doctrace::core::types::Oid;
    ///
    /// let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
    /// assert_eq!(oid.short(7), "abc123d");
    /// ```
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully qualified reference name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    const HEADS: &'static str = "refs/heads/";

    /// Create a reference name; must live under `refs/`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let Some(rest) = name.strip_prefix("refs/") else {
            return Err(TypeError::InvalidRefName(format!(
                "'{name}' must start with 'refs/'"
            )));
        };
        if branch_name_violation(rest).is_some() {
            return Err(TypeError::InvalidRefName(name));
        }
        Ok(Self(name))
    }

    /// The `refs/heads/<branch>` reference for a branch.
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("{}{}", Self::HEADS, branch.as_str()))
    }

    /// The branch name if this is a `refs/heads/` reference.
    pub fn branch(&self) -> Option<BranchName> {
        self.0
            .strip_prefix(Self::HEADS)
            .and_then(|b| BranchName::new(b).ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
