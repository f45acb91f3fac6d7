//! Conditional-request evaluation for mutating registry calls.
//!
//! Every update or delete of a device identity, module identity, twin or
//! configuration is sent with an `If-Match` header. This module decides what
//! that header carries, given the caller's [`ConcurrencyPolicy`] and the ETag
//! held by the resource snapshot being written.
//!
//! | policy          | snapshot ETag | header value    |
//! |-----------------|---------------|-----------------|
//! | `Unconditional` | any           | `*`             |
//! | `IfMatch`       | present       | `"<etag>"`      |
//! | `IfMatch`       | absent        | `*` (fallback)  |
//!
//! The evaluator is a pure function: no I/O, no shared state, and it never fails.
//!
//! # IfMatch without an ETag
//!
//! A snapshot built locally (never fetched from the service) has no ETag. Asking
//! for `IfMatch` on such a snapshot falls back to the wildcard instead of
//! failing, so that "build a new object, then update with IfMatch" keeps working.
//! The price is that a caller who forgot to re-fetch silently overwrites
//! concurrent changes. The fallback is logged at `warn` level. Clients built
//! with [`ClientConfig::with_strict_preconditions`](crate::ClientConfig::with_strict_preconditions)
//! evaluate through [`Precondition::strict`] and reject such writes locally.
//!
//! ```rust
//! use hub_registry::resource::etag::ETag;
//! use hub_registry::resource::precondition::{ConcurrencyPolicy, Precondition};
//!
//! let etag = ETag::new("MTIz");
//!
//! let header = Precondition::evaluate(ConcurrencyPolicy::IfMatch, etag.as_ref());
//! assert_eq!(header.header_value(), "\"MTIz\"");
//!
//! let header = Precondition::evaluate(ConcurrencyPolicy::Unconditional, etag.as_ref());
//! assert_eq!(header.header_value(), "*");
//! ```

use super::etag::ETag;
use crate::error::ValidationError;
use log::warn;
use std::fmt;

/// Name of the conditional request header sent on mutating calls.
pub const IF_MATCH_HEADER: &str = "If-Match";

/// Wildcard value matching any current version.
pub const WILDCARD: &str = "*";

/// Caller-chosen concurrency behavior for a single mutating request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConcurrencyPolicy {
    /// Apply the write regardless of the resource's current version.
    #[default]
    Unconditional,

    /// Apply the write only if the service still holds the snapshot's ETag.
    IfMatch,
}

/// A resource snapshot that may carry the service-assigned ETag.
pub trait Versioned {
    /// The last-known ETag, if the snapshot was fetched from the service.
    fn etag(&self) -> Option<&ETag>;
}

impl Versioned for Option<ETag> {
    fn etag(&self) -> Option<&ETag> {
        self.as_ref()
    }
}

impl Versioned for ETag {
    fn etag(&self) -> Option<&ETag> {
        Some(self)
    }
}

/// The conditional header to attach to a mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Precondition {
    /// `If-Match: *`
    Any,

    /// `If-Match: "<etag>"`
    Matches(ETag),
}

impl Precondition {
    /// Compute the precondition for a policy and an optional ETag.
    pub fn evaluate(policy: ConcurrencyPolicy, etag: Option<&ETag>) -> Self {
        match (policy, etag) {
            (ConcurrencyPolicy::Unconditional, _) => Precondition::Any,
            (ConcurrencyPolicy::IfMatch, Some(etag)) => Precondition::Matches(etag.clone()),
            (ConcurrencyPolicy::IfMatch, None) => {
                warn!("IfMatch requested on a snapshot without an ETag; sending wildcard");
                Precondition::Any
            }
        }
    }

    /// Compute the precondition for a resource snapshot.
    pub fn for_resource<R>(policy: ConcurrencyPolicy, resource: &R) -> Self
    where
        R: Versioned + ?Sized,
    {
        Self::evaluate(policy, resource.etag())
    }

    /// Like [`Precondition::for_resource`], but refuses the wildcard fallback.
    ///
    /// `IfMatch` on a snapshot without an ETag yields a validation error instead
    /// of silently turning into an unconditional write.
    pub fn strict<R>(policy: ConcurrencyPolicy, resource: &R) -> Result<Self, ValidationError>
    where
        R: Versioned + ?Sized,
    {
        match (policy, resource.etag()) {
            (ConcurrencyPolicy::IfMatch, None) => Err(ValidationError::missing_argument("etag")),
            (policy, etag) => Ok(Self::evaluate(policy, etag)),
        }
    }

    /// The exact header value to send.
    pub fn header_value(&self) -> String {
        match self {
            Precondition::Any => WILDCARD.to_string(),
            Precondition::Matches(etag) => etag.header_value(),
        }
    }

    /// Whether this precondition matches any version.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Precondition::Any)
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}
