// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Archive queries: from XML to SQL.
//!
//! A [`RawQuery`] is read from XML, normalised by a [`QueryBuilder`] into a
//! [`QueryHash`] (resolving the telescope and tables, and mapping logical
//! tags onto each table's columns), and finally turned into SQL with
//! [`translate`] and [`select_statement`]. [`ArchiveQuery`] does all of this
//! in one go.

mod builder;
pub mod config;
mod error;
pub mod read;
mod sql;

pub use builder::QueryBuilder;
pub use config::ArchiveConfig;
pub use error::{ConfigError, MalformedQueryError};
pub use read::{RawEntry, RawQuery, RawValue};
pub use sql::{select_statement, translate};

use std::{
    fmt::Display,
    ops::{Deref, DerefMut},
};

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use itertools::Itertools;
use strum::IntoEnumIterator;

use crate::{
    constants::{TABLES_KEY, TELESCOPE_KEY},
    range::Range,
};
use config::ConfigFileType;

lazy_static::lazy_static! {
    pub(crate) static ref CONFIG_FILE_TYPES_COMMA_SEPARATED: String = ConfigFileType::iter().join(", ");

    static ref COLUMN_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

/// Is this a plain (optionally dot-qualified) SQL identifier? Anything else
/// must never be pasted into SQL.
pub(crate) fn is_valid_column(s: &str) -> bool {
    COLUMN_REGEX.is_match(s)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
}

impl Scalar {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Integer(_) => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{s}"),
            Scalar::Integer(i) => write!(f, "{i}"),
        }
    }
}

/// The kinds of ranges a query can hold. Both bounds of a range always have
/// the same type.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryRange {
    Integer(Range<i64>),
    Float(Range<f64>),
    Date(Range<NaiveDate>),
    DateTime(Range<NaiveDateTime>),
}

/// The value of a [`QueryHash`] entry. The shape is decided when the hash is
/// built; nothing downstream needs to guess.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Any of these values may match.
    Scalars(Vec<Scalar>),

    Range(QueryRange),

    /// Column names to values; a match on any column is enough.
    Group(IndexMap<String, QueryValue>),
}

impl QueryValue {
    pub fn text<I, S>(values: I) -> QueryValue
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        QueryValue::Scalars(
            values
                .into_iter()
                .map(|s| Scalar::Text(s.as_ref().to_string()))
                .collect(),
        )
    }
}

/// A normalised query: logical tags (or column names) to values, in the order
/// they were given. Keys starting with
/// [`PRIVATE_PREFIX`](crate::constants::PRIVATE_PREFIX) hold metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryHash(IndexMap<String, QueryValue>);

impl QueryHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// The telescope resolved by the builder, if any.
    pub fn telescope(&self) -> Option<&str> {
        match self.get(TELESCOPE_KEY) {
            Some(QueryValue::Scalars(v)) if v.len() == 1 => v[0].as_text(),
            _ => None,
        }
    }

    /// The tables resolved by the builder. `None` if no table metadata is
    /// present, or it isn't a list of names.
    pub fn tables(&self) -> Option<Vec<&str>> {
        match self.get(TABLES_KEY) {
            Some(QueryValue::Scalars(v)) => v.iter().map(|s| s.as_text()).collect(),
            _ => None,
        }
    }
}

impl From<IndexMap<String, QueryValue>> for QueryHash {
    fn from(m: IndexMap<String, QueryValue>) -> Self {
        Self(m)
    }
}

impl<const N: usize> From<[(String, QueryValue); N]> for QueryHash {
    fn from(value: [(String, QueryValue); N]) -> Self {
        Self(IndexMap::from(value))
    }
}

impl Deref for QueryHash {
    type Target = IndexMap<String, QueryValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for QueryHash {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(String, QueryValue)> for QueryHash {
    fn from_iter<I: IntoIterator<Item = (String, QueryValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for QueryHash {
    type Item = (String, QueryValue);
    type IntoIter = indexmap::map::IntoIter<String, QueryValue>;

    fn into_iter(self) -> indexmap::map::IntoIter<String, QueryValue> {
        self.0.into_iter()
    }
}

/// A query read from XML and normalised against an archive configuration.
#[derive(Debug, Clone)]
pub struct ArchiveQuery<'a> {
    config: &'a ArchiveConfig,
    raw: RawQuery,
    hash: QueryHash,
}

impl<'a> ArchiveQuery<'a> {
    pub fn from_xml(xml: &str, config: &'a ArchiveConfig) -> Result<Self, MalformedQueryError> {
        let raw = RawQuery::from_xml(xml)?;
        let hash = QueryBuilder::new(config).build(&raw)?;
        Ok(ArchiveQuery { config, raw, hash })
    }

    pub fn raw(&self) -> &RawQuery {
        &self.raw
    }

    pub fn query_hash(&self) -> &QueryHash {
        &self.hash
    }

    pub fn telescope(&self) -> Option<&str> {
        self.hash.telescope()
    }

    pub fn tables(&self) -> Option<Vec<&str>> {
        self.hash.tables()
    }

    /// The WHERE clause without any table joins.
    pub fn where_clause(&self) -> Result<String, MalformedQueryError> {
        translate(&self.hash, &[])
    }

    /// The full SELECT statement for the resolved telescope.
    pub fn sql(&self) -> Result<String, MalformedQueryError> {
        select_statement(&self.hash, self.config)
    }
}
