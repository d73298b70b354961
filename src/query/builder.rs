// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning a [`RawQuery`] into a [`QueryHash`].

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, trace};

use super::{
    config::{ColumnConfig, ColumnKind, InstrumentRule, TableConfig, TelescopeConfig},
    is_valid_column, ArchiveConfig, MalformedQueryError, QueryHash, QueryRange, QueryValue,
    RawEntry, RawQuery, RawValue, Scalar,
};
use crate::{
    constants::{
        FREE_TEXT_MARKER, INSTRUMENT_TAG, PRIVATE_PREFIX, TABLES_KEY, TELESCOPE_KEY,
        TELESCOPE_TAG,
    },
    range::{InvalidRangeError, Range},
};

/// Normalises raw queries against an archive configuration.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    config: &'a ArchiveConfig,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(config: &'a ArchiveConfig) -> QueryBuilder<'a> {
        QueryBuilder { config }
    }

    /// Build a [`QueryHash`] from a raw query. The telescope and tables are
    /// resolved from the "telescope" and "instrument" tags, every logical tag
    /// is mapped onto the columns of the selected tables, and the resolved
    /// telescope and tables are stored as metadata.
    pub fn build(&self, raw: &RawQuery) -> Result<QueryHash, MalformedQueryError> {
        // Metadata can only come from us, never from the query.
        let entries: IndexMap<&str, &RawEntry> = raw
            .entries()
            .iter()
            .filter(|(key, _)| {
                if key.starts_with(PRIVATE_PREFIX) {
                    debug!("Ignoring private query tag '{key}'");
                    false
                } else {
                    true
                }
            })
            .map(|(key, entry)| (key.as_str(), entry))
            .collect();

        let explicit = self.explicit_telescope(entries.get(TELESCOPE_TAG).copied())?;
        let instruments = self.classify_instruments(entries.get(INSTRUMENT_TAG).copied())?;

        let implied_telescopes: Vec<&str> = instruments
            .iter()
            .map(|(_, rule)| rule.telescope.as_str())
            .unique_by(|t| t.to_uppercase())
            .collect();
        if implied_telescopes.len() > 1 {
            return Err(MalformedQueryError::InstrumentsSpanTelescopes(
                implied_telescopes.into_iter().map(|t| t.to_string()).collect(),
            ));
        }
        if let (Some(explicit), Some((instrument, rule))) = (explicit, instruments.first()) {
            if !explicit.name.eq_ignore_ascii_case(&rule.telescope) {
                return Err(MalformedQueryError::TelescopeConflict {
                    instrument: instrument.to_string(),
                    implied: rule.telescope.clone(),
                    explicit: explicit.name.clone(),
                });
            }
        }
        self.check_families(&instruments)?;

        let telescope = match (explicit, instruments.first()) {
            (Some(t), _) => t,
            (None, Some((_, rule))) => self
                .config
                .telescope(&rule.telescope)
                .ok_or_else(|| MalformedQueryError::UnknownTelescope(rule.telescope.clone()))?,
            (None, None) => return Err(MalformedQueryError::NoTelescope),
        };

        let table_names: Vec<&String> = if instruments.is_empty() {
            trace!("No instruments; using the default tables for {}", telescope.name);
            telescope.default_tables.iter().collect()
        } else {
            instruments
                .iter()
                .flat_map(|(_, rule)| rule.tables.iter())
                .unique()
                .collect()
        };
        let tables = table_names
            .into_iter()
            .map(|name| {
                self.config
                    .table(name)
                    .ok_or_else(|| MalformedQueryError::UnknownTable(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut hash = QueryHash::new();
        for (&key, &entry) in &entries {
            // Instruments have done their job in choosing the tables, unless
            // they're also a column.
            if key == TELESCOPE_TAG
                || (key == INSTRUMENT_TAG && !self.config.is_logical_tag(key))
            {
                continue;
            }
            if let Some(value) = self.convert(key, entry, &tables)? {
                hash.insert(key.to_string(), value);
            }
        }
        hash.insert(
            TELESCOPE_KEY.to_string(),
            QueryValue::text([&telescope.name]),
        );
        hash.insert(
            TABLES_KEY.to_string(),
            QueryValue::text(tables.iter().map(|t| &t.name)),
        );

        debug!(
            "Query resolved to telescope {} with tables {}",
            telescope.name,
            tables.iter().map(|t| &t.name).join(", ")
        );
        Ok(hash)
    }

    fn explicit_telescope(
        &self,
        entry: Option<&RawEntry>,
    ) -> Result<Option<&'a TelescopeConfig>, MalformedQueryError> {
        let values = match entry {
            None => return Ok(None),
            Some(RawEntry::Values(values)) => values,
            Some(_) => {
                return Err(MalformedQueryError::Misshapen {
                    key: TELESCOPE_TAG.to_string(),
                })
            }
        };

        let names: Vec<&str> = values
            .iter()
            .map(|v| v.text.as_str())
            .unique_by(|t| t.to_uppercase())
            .collect();
        match names.as_slice() {
            [] => Err(MalformedQueryError::EmptyValues {
                key: TELESCOPE_TAG.to_string(),
            }),
            [name] => self
                .config
                .telescope(name)
                .map(Some)
                .ok_or_else(|| MalformedQueryError::UnknownTelescope(name.to_string())),
            _ => Err(MalformedQueryError::MultipleTelescopes(
                names.into_iter().map(|n| n.to_string()).collect(),
            )),
        }
    }

    fn classify_instruments<'e>(
        &self,
        entry: Option<&'e RawEntry>,
    ) -> Result<Vec<(&'e str, &'a InstrumentRule)>, MalformedQueryError> {
        match entry {
            None => Ok(vec![]),
            Some(RawEntry::Values(values)) => values
                .iter()
                .map(|v| {
                    self.config
                        .classify_instrument(&v.text)
                        .map(|rule| (v.text.as_str(), rule))
                        .ok_or_else(|| MalformedQueryError::UnknownInstrument(v.text.clone()))
                })
                .collect(),
            Some(_) => Err(MalformedQueryError::Misshapen {
                key: INSTRUMENT_TAG.to_string(),
            }),
        }
    }

    fn check_families(
        &self,
        instruments: &[(&str, &InstrumentRule)],
    ) -> Result<(), MalformedQueryError> {
        for (i, (first, rule_a)) in instruments.iter().enumerate() {
            for (second, rule_b) in &instruments[i + 1..] {
                if let (Some(a), Some(b)) = (&rule_a.family, &rule_b.family) {
                    if !self.config.families_are_compatible(a, b) {
                        return Err(MalformedQueryError::IncompatibleInstruments {
                            first: first.to_string(),
                            second: second.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Convert a raw entry. Logical tags become a group of the columns they
    /// map to in the selected tables; if none of the tables has such a column,
    /// `None` is returned and the tag contributes nothing to the query.
    fn convert(
        &self,
        key: &str,
        entry: &RawEntry,
        tables: &[&TableConfig],
    ) -> Result<Option<QueryValue>, MalformedQueryError> {
        if self.config.is_logical_tag(key) {
            let mut group = IndexMap::new();
            for table in tables {
                if let Some(column) = table.columns.get(key) {
                    let name = match column.kind {
                        ColumnKind::FreeText => format!("{FREE_TEXT_MARKER}{}", column.column),
                        _ => column.column.clone(),
                    };
                    group.insert(name, convert_for_column(key, entry, column)?);
                }
            }
            if group.is_empty() {
                debug!(
                    "Query tag '{key}' has no column in the selected tables ({}); ignoring it",
                    tables.iter().map(|t| &t.name).join(", ")
                );
                return Ok(None);
            }
            return Ok(Some(QueryValue::Group(group)));
        }

        match entry {
            RawEntry::Group(members) => {
                let mut group = IndexMap::new();
                for (member_key, member) in members {
                    if member_key.starts_with(PRIVATE_PREFIX) {
                        debug!("Ignoring private query tag '{member_key}'");
                        continue;
                    }
                    if let Some(value) = self.convert(member_key, member, tables)? {
                        group.insert(member_key.clone(), value);
                    }
                }
                if group.is_empty() {
                    debug!("Query group '{key}' has nothing left in it; ignoring it");
                    Ok(None)
                } else {
                    Ok(Some(QueryValue::Group(group)))
                }
            }

            RawEntry::Values(values) => {
                check_column(key)?;
                Ok(Some(QueryValue::text(values.iter().map(|v| &v.text))))
            }

            RawEntry::Range { min, max } => {
                check_column(key)?;
                generic_range(key, min.as_deref(), max.as_deref()).map(Some)
            }
        }
    }
}

fn check_column(key: &str) -> Result<(), MalformedQueryError> {
    let column = key.strip_prefix(FREE_TEXT_MARKER).unwrap_or(key);
    if is_valid_column(column) {
        Ok(())
    } else {
        Err(MalformedQueryError::InvalidColumn(key.to_string()))
    }
}

/// Convert a raw entry for a specific configured column.
fn convert_for_column(
    key: &str,
    entry: &RawEntry,
    column: &ColumnConfig,
) -> Result<QueryValue, MalformedQueryError> {
    match (column.kind, entry) {
        (_, RawEntry::Group(_)) => Err(MalformedQueryError::Misshapen {
            key: key.to_string(),
        }),

        (kind @ (ColumnKind::Date | ColumnKind::DateTime), RawEntry::Values(values)) => {
            match values.as_slice() {
                [value] => temporal_window(key, value, kind),
                [] => Err(MalformedQueryError::EmptyValues {
                    key: key.to_string(),
                }),
                _ => Err(MalformedQueryError::MultipleValues {
                    key: key.to_string(),
                }),
            }
        }

        (kind @ (ColumnKind::Date | ColumnKind::DateTime), RawEntry::Range { min, max }) => {
            temporal_range(key, min.as_deref(), max.as_deref(), kind)
        }

        (ColumnKind::Integer, RawEntry::Values(values)) => values
            .iter()
            .map(|v| parse_integer(key, &v.text).map(Scalar::Integer))
            .collect::<Result<Vec<_>, _>>()
            .map(QueryValue::Scalars),

        (ColumnKind::Integer, RawEntry::Range { min, max }) => {
            if min.is_none() && max.is_none() {
                return Err(MalformedQueryError::UnboundedRange {
                    key: key.to_string(),
                });
            }
            let min = min.as_deref().map(|s| parse_integer(key, s)).transpose()?;
            let max = max.as_deref().map(|s| parse_integer(key, s)).transpose()?;
            let range = Range::new(min, max).map_err(|e| invalid_range(key, e))?;
            Ok(QueryValue::Range(QueryRange::Integer(range)))
        }

        (ColumnKind::Text | ColumnKind::FreeText, RawEntry::Values(values)) => {
            Ok(QueryValue::Scalars(
                values
                    .iter()
                    .map(|v| match column.case {
                        Some(case) => Scalar::Text(case.apply(&v.text)),
                        None => Scalar::Text(v.text.clone()),
                    })
                    .collect(),
            ))
        }

        (ColumnKind::Text | ColumnKind::FreeText, RawEntry::Range { min, max }) => {
            generic_range(key, min.as_deref(), max.as_deref())
        }
    }
}

fn invalid_range(key: &str, source: InvalidRangeError) -> MalformedQueryError {
    MalformedQueryError::InvalidRange {
        key: key.to_string(),
        source,
    }
}

fn parse_integer(key: &str, s: &str) -> Result<i64, MalformedQueryError> {
    s.trim()
        .parse()
        .map_err(|_| MalformedQueryError::InvalidValue {
            key: key.to_string(),
            value: s.to_string(),
            expected: "an integer",
        })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Temporal {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Temporal {
    fn date(self) -> NaiveDate {
        match self {
            Temporal::Date(d) => d,
            Temporal::DateTime(dt) => dt.date(),
        }
    }

    fn datetime(self) -> NaiveDateTime {
        match self {
            Temporal::Date(d) => d.and_time(NaiveTime::MIN),
            Temporal::DateTime(dt) => dt,
        }
    }
}

/// Parse dates ("2024-05-01", or the legacy "20240501") and date-times
/// ("2024-05-01T12:30:00", with a 'T' or a space).
fn parse_temporal(s: &str) -> Option<Temporal> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Temporal::Date(d));
    }
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let y = s[0..4].parse().ok()?;
        let m = s[4..6].parse().ok()?;
        let d = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d).map(Temporal::Date);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(Temporal::DateTime)
}

fn parse_temporal_for(key: &str, s: &str) -> Result<Temporal, MalformedQueryError> {
    parse_temporal(s).ok_or_else(|| MalformedQueryError::InvalidValue {
        key: key.to_string(),
        value: s.to_string(),
        expected: "a date",
    })
}

/// A date range for a temporal column. The supplied maximum is exclusive, so
/// it's moved back by one unit of the column's resolution.
fn temporal_range(
    key: &str,
    min: Option<&str>,
    max: Option<&str>,
    kind: ColumnKind,
) -> Result<QueryValue, MalformedQueryError> {
    if min.is_none() && max.is_none() {
        return Err(MalformedQueryError::UnboundedRange {
            key: key.to_string(),
        });
    }
    let min = min.map(|s| parse_temporal_for(key, s)).transpose()?;
    let max = max.map(|s| parse_temporal_for(key, s)).transpose()?;

    let range = if kind == ColumnKind::Date {
        let range = Range::new(min.map(Temporal::date), max.map(Temporal::date))
            .and_then(Range::into_exclusive_max)
            .map_err(|e| invalid_range(key, e))?;
        QueryRange::Date(range)
    } else {
        let range = Range::new(min.map(Temporal::datetime), max.map(Temporal::datetime))
            .and_then(Range::into_exclusive_max)
            .map_err(|e| invalid_range(key, e))?;
        QueryRange::DateTime(range)
    };
    trace!("Query tag '{key}' is the temporal range {range:?}");
    Ok(QueryValue::Range(range))
}

/// A single date means a window of whole days starting at that date; one day
/// unless a `delta` says otherwise.
fn temporal_window(
    key: &str,
    value: &RawValue,
    kind: ColumnKind,
) -> Result<QueryValue, MalformedQueryError> {
    let start = parse_temporal_for(key, &value.text)?;
    let days: u32 = match &value.delta {
        None => 1,
        Some(delta) => delta
            .parse()
            .ok()
            .filter(|&d| d > 0)
            .ok_or_else(|| MalformedQueryError::InvalidValue {
                key: key.to_string(),
                value: delta.clone(),
                expected: "a positive number of days",
            })?,
    };
    let out_of_range = || MalformedQueryError::InvalidValue {
        key: key.to_string(),
        value: value.text.clone(),
        expected: "a date in the supported range",
    };
    let delta = Duration::days(i64::from(days));

    let range = if kind == ColumnKind::Date {
        let start = start.date();
        let end = start.checked_add_signed(delta).ok_or_else(out_of_range)?;
        QueryRange::Date(
            Range::new(Some(start), Some(end))
                .and_then(Range::into_exclusive_max)
                .map_err(|e| invalid_range(key, e))?,
        )
    } else {
        let start = start.datetime();
        let end = start.checked_add_signed(delta).ok_or_else(out_of_range)?;
        QueryRange::DateTime(
            Range::new(Some(start), Some(end))
                .and_then(Range::into_exclusive_max)
                .map_err(|e| invalid_range(key, e))?,
        )
    };
    Ok(QueryValue::Range(range))
}

/// A range on a tag that isn't a configured temporal column. Both bounds are
/// inclusive; their type is the narrowest of integer, float, date and
/// date-time that fits all of them.
fn generic_range(
    key: &str,
    min: Option<&str>,
    max: Option<&str>,
) -> Result<QueryValue, MalformedQueryError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Kind {
        Integer,
        Float,
        Date,
        DateTime,
    }

    let bounds: Vec<&str> = [min, max].into_iter().flatten().collect();
    if bounds.is_empty() {
        return Err(MalformedQueryError::UnboundedRange {
            key: key.to_string(),
        });
    }
    let kinds = bounds
        .iter()
        .map(|b| {
            let b = b.trim();
            if b.parse::<i64>().is_ok() {
                Ok(Kind::Integer)
            } else if b.parse::<f64>().is_ok() {
                Ok(Kind::Float)
            } else {
                match parse_temporal(b) {
                    Some(Temporal::Date(_)) => Ok(Kind::Date),
                    Some(Temporal::DateTime(_)) => Ok(Kind::DateTime),
                    None => Err(MalformedQueryError::InvalidValue {
                        key: key.to_string(),
                        value: b.to_string(),
                        expected: "a number or a date",
                    }),
                }
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let all = |allowed: &[Kind]| kinds.iter().all(|k| allowed.contains(k));
    let range = if all(&[Kind::Integer]) {
        let parse = |s: &str| parse_integer(key, s);
        QueryRange::Integer(
            Range::new(min.map(parse).transpose()?, max.map(parse).transpose()?)
                .map_err(|e| invalid_range(key, e))?,
        )
    } else if all(&[Kind::Integer, Kind::Float]) {
        let parse = |s: &str| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| MalformedQueryError::InvalidValue {
                    key: key.to_string(),
                    value: s.to_string(),
                    expected: "a number",
                })
        };
        QueryRange::Float(
            Range::new(min.map(parse).transpose()?, max.map(parse).transpose()?)
                .map_err(|e| invalid_range(key, e))?,
        )
    } else if all(&[Kind::Date]) {
        let parse = |s: &str| parse_temporal_for(key, s).map(Temporal::date);
        QueryRange::Date(
            Range::new(min.map(parse).transpose()?, max.map(parse).transpose()?)
                .map_err(|e| invalid_range(key, e))?,
        )
    } else if all(&[Kind::Date, Kind::DateTime]) {
        let parse = |s: &str| parse_temporal_for(key, s).map(Temporal::datetime);
        QueryRange::DateTime(
            Range::new(min.map(parse).transpose()?, max.map(parse).transpose()?)
                .map_err(|e| invalid_range(key, e))?,
        )
    } else {
        return Err(MalformedQueryError::MixedRangeBounds {
            key: key.to_string(),
        });
    };
    Ok(QueryValue::Range(range))
}
