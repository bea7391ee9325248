//! Resource abstraction layer
//!
//! The upward-facing surface of the adapter: typed locators and resources,
//! the operation set the schema layer calls, and the two bounded retry
//! loops for eventual-consistency races.
//!
//! # Architecture
//!
//! - [`Locator`]/[`Resource`] - addresses and values of remote objects
//! - [`ops`] - the operation set (Create, List, Get, Update, Delete, ...)
//! - [`retry`] - discovery polling and deletion-dependency retry
//!
//! Every operation validates its locator locally before any network call;
//! a malformed locator never reaches the platform.

pub mod ops;
pub mod retry;

pub use ops::Adapter;

use crate::error::{Error, Result};
use crate::fields::Fields;
use std::collections::BTreeMap;

/// Address of a remote object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    /// Remote service domain scoping the type; always required.
    pub namespace: String,
    /// Resource type, required for root listings.
    pub rtype: Option<String>,
    /// Platform-assigned object address, required for get/update/delete.
    pub href: Option<String>,
    /// Extra parameters merged into handle acquisition.
    pub action_params: BTreeMap<String, String>,
}

impl Locator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, rtype: impl Into<String>) -> Self {
        self.rtype = Some(rtype.into());
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_action_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.action_params.insert(key.into(), value.into());
        self
    }

    pub(crate) fn require_namespace(&self) -> Result<&str> {
        if self.namespace.is_empty() {
            return Err(Error::Validation("locator has no namespace".into()));
        }
        Ok(&self.namespace)
    }

    pub(crate) fn require_href(&self, operation: &str) -> Result<&str> {
        self.require_namespace()?;
        self.href
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                Error::Validation(format!("{} requires a locator with an href", operation))
            })
    }

    /// Listing mode: nested (href + link name) or root (type), never both.
    pub(crate) fn listing_mode<'a>(&'a self, link: Option<&'a str>) -> Result<ListingMode<'a>> {
        self.require_namespace()?;
        match (self.href.as_deref(), self.rtype.as_deref()) {
            (Some(href), None) => {
                let link = link.ok_or_else(|| {
                    Error::Validation(
                        "listing by href requires a link name".into(),
                    )
                })?;
                Ok(ListingMode::Nested { href, link })
            }
            (None, Some(rtype)) => {
                if link.is_some() {
                    return Err(Error::Validation(
                        "a link name only applies when listing by href".into(),
                    ));
                }
                Ok(ListingMode::Root { rtype })
            }
            (Some(_), Some(_)) => Err(Error::Validation(
                "listing takes either an href or a type, not both".into(),
            )),
            (None, None) => Err(Error::Validation(
                "listing requires either an href with a link name or a type".into(),
            )),
        }
    }
}

/// How a listing resolves its handle.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ListingMode<'a> {
    Nested { href: &'a str, link: &'a str },
    Root { rtype: &'a str },
}

/// A locator plus the object's current field values. Never cached across
/// calls; ownership is transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub locator: Locator,
    pub fields: Fields,
}
