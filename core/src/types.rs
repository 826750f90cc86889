//! Domain types for the Open5e API.
//!
//! # Design
//! `Resource` names the three endpoints this crate knows about and carries
//! their fixed paths and allow-lists. `Filters` stands in for open-ended
//! named arguments: an insertion-ordered mapping from filter name to an
//! optional scalar. Values are never interpreted here; the remote API does
//! that.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filters::{MAGIC_ITEMS_FILTERS, MONSTERS_FILTERS, SPELLS_FILTERS};

/// A queryable Open5e resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Spells,
    Monsters,
    MagicItems,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Spells, Resource::Monsters, Resource::MagicItems];

    /// Endpoint path relative to the API base URL. Always ends with `/`.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Spells => "/v2/spells/",
            Resource::Monsters => "/v1/monsters/",
            Resource::MagicItems => "/v1/magicitems/",
        }
    }

    /// Filter keys forwarded to the API for this resource.
    pub fn allowed_filters(self) -> &'static [&'static str] {
        match self {
            Resource::Spells => SPELLS_FILTERS,
            Resource::Monsters => MONSTERS_FILTERS,
            Resource::MagicItems => MAGIC_ITEMS_FILTERS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Spells => "spells",
            Resource::Monsters => "monsters",
            Resource::MagicItems => "magic_items",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource: {0}")]
pub struct UnknownResource(pub String);

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spells" => Ok(Resource::Spells),
            "monsters" => Ok(Resource::Monsters),
            "magic_items" | "magicitems" => Ok(Resource::MagicItems),
            other => Err(UnknownResource(other.to_string())),
        }
    }
}

/// A scalar filter value.
///
/// Rendered into the query string by `Display`: text verbatim, numbers in
/// their shortest form, booleans as lowercase `true` / `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Integer(n) => write!(f, "{n}"),
            FilterValue::Float(x) => write!(f, "{x}"),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        FilterValue::Integer(n.into())
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        FilterValue::Integer(n.into())
    }
}

impl From<f64> for FilterValue {
    fn from(x: f64) -> Self {
        FilterValue::Float(x)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

/// Caller-supplied filters for a single query.
///
/// Keys keep their insertion order; inserting an existing key replaces its
/// value in place. A `None` value marks a filter as explicitly unset and is
/// never sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, Option<FilterValue>)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Filters::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    /// Builder form for a value that may be absent.
    pub fn with_opt<V: Into<FilterValue>>(
        mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.insert(key, value.map(Into::into));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<FilterValue>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Option<FilterValue>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FilterValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl<K, V> FromIterator<(K, V)> for Filters
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (k, v) in iter {
            filters.insert(k, Some(v.into()));
        }
        filters
    }
}

/// Query parameters that survived the allow-list step, in input order.
pub type QueryParams = Vec<(String, FilterValue)>;
