// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning a [`QueryHash`] into SQL.
//!
//! Top-level entries are ANDed together. A list of values on a column is an
//! OR of equalities (or `LIKE`s for free-text columns), a range is a pair of
//! `>=`/`<=` comparisons, and a group is an OR of its members, each in its own
//! parentheses. Temporal ranges are expected to already have inclusive
//! maxima; nothing here adjusts bounds.

use std::fmt::Display;

use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use log::trace;

use super::{
    is_valid_column, ArchiveConfig, MalformedQueryError, QueryHash, QueryRange, QueryValue,
    Scalar,
};
use crate::{
    constants::{FREE_TEXT_MARKER, PRIVATE_PREFIX},
    range::Range,
};

/// Types that can be written into SQL as a literal.
pub(crate) trait SqlLiteral {
    fn sql_literal(&self) -> String;
}

/// Single-quote a string, doubling any quotes inside it.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Match a value anywhere in a column. Wildcard characters in the value only
/// match themselves.
fn like_term(column: &str, value: &str) -> String {
    if !value.contains(['%', '_', '[']) {
        return format!("{column} LIKE {}", quote(&format!("%{value}%")));
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if matches!(c, '%' | '_' | '[' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!(
        "{column} LIKE {} ESCAPE '\\'",
        quote(&format!("%{escaped}%"))
    )
}

impl SqlLiteral for str {
    fn sql_literal(&self) -> String {
        quote(self)
    }
}

impl SqlLiteral for i64 {
    fn sql_literal(&self) -> String {
        self.to_string()
    }
}

impl SqlLiteral for f64 {
    fn sql_literal(&self) -> String {
        self.to_string()
    }
}

impl SqlLiteral for NaiveDate {
    fn sql_literal(&self) -> String {
        quote(&self.format("%Y-%m-%d").to_string())
    }
}

impl SqlLiteral for NaiveDateTime {
    fn sql_literal(&self) -> String {
        quote(&self.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl SqlLiteral for Scalar {
    fn sql_literal(&self) -> String {
        match self {
            Scalar::Text(s) => s.sql_literal(),
            Scalar::Integer(i) => i.sql_literal(),
        }
    }
}

/// Translate a query into a WHERE clause (without the "WHERE"). Private
/// (metadata) keys and any keys in `skip_keys` are left out. An empty string
/// is returned if nothing is left.
pub fn translate(hash: &QueryHash, skip_keys: &[&str]) -> Result<String, MalformedQueryError> {
    let clauses = hash
        .iter()
        .filter(|(key, _)| !key.starts_with(PRIVATE_PREFIX) && !skip_keys.contains(&key.as_str()))
        .map(|(key, value)| clause(key, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(clauses.join(" AND "))
}

fn clause(key: &str, value: &QueryValue) -> Result<String, MalformedQueryError> {
    let (column, free_text) = match key.strip_prefix(FREE_TEXT_MARKER) {
        Some(column) => (column, true),
        None => (key, false),
    };

    match value {
        QueryValue::Scalars(values) => {
            if values.is_empty() {
                return Err(MalformedQueryError::EmptyValues {
                    key: key.to_string(),
                });
            }
            check_column(column)?;
            let terms = values.iter().map(|v| {
                if free_text {
                    like_term(column, &v.to_string())
                } else {
                    format!("{column} = {}", v.sql_literal())
                }
            });
            Ok(format!("({})", terms.format(" OR ")))
        }

        QueryValue::Range(range) => {
            if free_text {
                return Err(MalformedQueryError::Misshapen {
                    key: key.to_string(),
                });
            }
            check_column(column)?;
            match range {
                QueryRange::Integer(r) => range_clause(key, column, r),
                QueryRange::Float(r) => range_clause(key, column, r),
                QueryRange::Date(r) => range_clause(key, column, r),
                QueryRange::DateTime(r) => range_clause(key, column, r),
            }
        }

        QueryValue::Group(members) => {
            if members.is_empty() {
                return Err(MalformedQueryError::EmptyGroup {
                    key: key.to_string(),
                });
            }
            let subclauses = members
                .iter()
                .map(|(k, v)| clause(k, v).map(|c| format!("({c})")))
                .collect::<Result<Vec<_>, _>>()?;
            trace!("Query key '{key}' expands to {} alternatives", subclauses.len());
            Ok(format!("({})", subclauses.join(" OR ")))
        }
    }
}

fn range_clause<T>(key: &str, column: &str, range: &Range<T>) -> Result<String, MalformedQueryError>
where
    T: PartialOrd + Display + SqlLiteral,
{
    let mut parts = Vec::with_capacity(2);
    if let Some(min) = range.min() {
        parts.push(format!("{column} >= {}", min.sql_literal()));
    }
    if let Some(max) = range.max() {
        parts.push(format!("{column} <= {}", max.sql_literal()));
    }
    if parts.is_empty() {
        return Err(MalformedQueryError::UnboundedRange {
            key: key.to_string(),
        });
    }
    Ok(parts.join(" AND "))
}

fn check_column(column: &str) -> Result<(), MalformedQueryError> {
    if is_valid_column(column) {
        Ok(())
    } else {
        Err(MalformedQueryError::InvalidColumn(column.to_string()))
    }
}

/// Assemble the full SELECT statement for a built query: the tables recorded
/// in its metadata, their join conditions, the translated clause, and the
/// telescope's ordering (if it has one).
pub fn select_statement(
    hash: &QueryHash,
    config: &ArchiveConfig,
) -> Result<String, MalformedQueryError> {
    let table_names = hash
        .tables()
        .filter(|t| !t.is_empty())
        .ok_or(MalformedQueryError::NoTables)?;
    let telescope_name = hash.telescope().ok_or(MalformedQueryError::NoTelescope)?;
    let telescope = config
        .telescope(telescope_name)
        .ok_or_else(|| MalformedQueryError::UnknownTelescope(telescope_name.to_string()))?;
    let tables = table_names
        .into_iter()
        .map(|name| {
            config
                .table(name)
                .ok_or_else(|| MalformedQueryError::UnknownTable(name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut conditions: Vec<String> = tables.iter().filter_map(|t| t.join.clone()).collect();
    let clause = translate(hash, &[])?;
    if !clause.is_empty() {
        conditions.push(clause);
    }

    let mut sql = format!(
        "SELECT * FROM {}",
        tables
            .iter()
            .map(|t| format!("{} {}", t.name, t.alias))
            .join(", ")
    );
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    if let Some(order_by) = &telescope.order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }
    trace!("{sql}");
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::constants::{TABLES_KEY, TELESCOPE_KEY};

    #[test]
    fn test_literals() {
        assert_eq!("O'Brien".sql_literal(), "'O''Brien'");
        assert_eq!(Scalar::Integer(-3).sql_literal(), "-3");
        assert_eq!(Scalar::from("abc").sql_literal(), "'abc'");
        let d = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(d.sql_literal(), "'2024-05-01'");
        assert_eq!(
            d.and_hms_opt(23, 59, 59).unwrap().sql_literal(),
            "'2024-05-01 23:59:59'"
        );
    }

    #[test]
    fn test_scalar_list() {
        let hash = QueryHash::from([("c".to_string(), QueryValue::text(["a", "b"]))]);
        assert_eq!(translate(&hash, &[]).unwrap(), "(c = 'a' OR c = 'b')");
    }

    #[test]
    fn test_free_text() {
        let hash = QueryHash::from([(
            format!("{FREE_TEXT_MARKER}U.OBJECT"),
            QueryValue::text(["M31"]),
        )]);
        let sql = translate(&hash, &[]).unwrap();
        assert_eq!(sql, "(U.OBJECT LIKE '%M31%')");
        assert!(!sql.contains(FREE_TEXT_MARKER));
    }

    #[test]
    fn test_free_text_wildcards_are_escaped() {
        let hash = QueryHash::from([(
            format!("{FREE_TEXT_MARKER}U.OBJECT"),
            QueryValue::text(["NGC_253%", "a\\b"]),
        )]);
        let sql = translate(&hash, &[]).unwrap();
        assert_eq!(
            sql,
            r"(U.OBJECT LIKE '%NGC\_253\%%' ESCAPE '\' OR U.OBJECT LIKE '%a\b%')"
        );
    }

    #[test]
    fn test_ranges() {
        let hash = QueryHash::from([
            (
                "runnr".to_string(),
                QueryValue::Range(QueryRange::Integer(Range::new(Some(5), Some(10)).unwrap())),
            ),
            (
                "tau".to_string(),
                QueryValue::Range(QueryRange::Float(Range::at_most(0.08))),
            ),
        ]);
        assert_eq!(
            translate(&hash, &[]).unwrap(),
            "runnr >= 5 AND runnr <= 10 AND tau <= 0.08"
        );
        assert_eq!(translate(&hash, &["runnr"]).unwrap(), "tau <= 0.08");

        let hash = QueryHash::from([(
            "runnr".to_string(),
            QueryValue::Range(QueryRange::Integer(Range::unbounded())),
        )]);
        assert_eq!(
            translate(&hash, &[]),
            Err(MalformedQueryError::UnboundedRange {
                key: "runnr".to_string()
            })
        );
    }

    #[test]
    fn test_groups() {
        let group = IndexMap::from([
            ("C.obsnum".to_string(), QueryValue::Scalars(vec![Scalar::Integer(7)])),
            (
                "S.run".to_string(),
                QueryValue::Range(QueryRange::Integer(Range::at_least(3))),
            ),
        ]);
        let hash = QueryHash::from([("runnr".to_string(), QueryValue::Group(group))]);
        assert_eq!(
            translate(&hash, &[]).unwrap(),
            "(((C.obsnum = 7)) OR (S.run >= 3))"
        );
    }

    #[test]
    fn test_private_keys_are_skipped() {
        let hash = QueryHash::from([
            (TELESCOPE_KEY.to_string(), QueryValue::text(["UKIRT"])),
            (TABLES_KEY.to_string(), QueryValue::text(["ukirt.COMMON"])),
        ]);
        assert_eq!(translate(&hash, &[]).unwrap(), "");
    }

    #[test]
    fn test_bad_shapes() {
        let hash = QueryHash::from([("c".to_string(), QueryValue::Scalars(vec![]))]);
        assert_eq!(
            translate(&hash, &[]),
            Err(MalformedQueryError::EmptyValues {
                key: "c".to_string()
            })
        );

        let hash = QueryHash::from([("g".to_string(), QueryValue::Group(IndexMap::new()))]);
        assert_eq!(
            translate(&hash, &[]),
            Err(MalformedQueryError::EmptyGroup {
                key: "g".to_string()
            })
        );

        let hash = QueryHash::from([(
            "x; DROP TABLE y".to_string(),
            QueryValue::text(["1"]),
        )]);
        assert!(matches!(
            translate(&hash, &[]),
            Err(MalformedQueryError::InvalidColumn(_))
        ));
    }

    #[test]
    fn test_select_statement() {
        let config = ArchiveConfig::default();
        let hash = QueryHash::from([
            (
                "projectid".to_string(),
                QueryValue::Group(IndexMap::from([(
                    "C.project".to_string(),
                    QueryValue::text(["M24AP001"]),
                )])),
            ),
            (TELESCOPE_KEY.to_string(), QueryValue::text(["JCMT"])),
            (
                TABLES_KEY.to_string(),
                QueryValue::text(["jcmt.COMMON", "jcmt.ACSIS"]),
            ),
        ]);
        assert_eq!(
            select_statement(&hash, &config).unwrap(),
            "SELECT * FROM jcmt.COMMON C, jcmt.ACSIS A WHERE A.obsid = C.obsid AND (((C.project = 'M24AP001')))"
        );

        let hash = QueryHash::from([
            (TELESCOPE_KEY.to_string(), QueryValue::text(["UKIRT"])),
            (TABLES_KEY.to_string(), QueryValue::text(["ukirt.COMMON"])),
        ]);
        assert_eq!(
            select_statement(&hash, &config).unwrap(),
            "SELECT * FROM ukirt.COMMON U ORDER BY U.UT_DATE"
        );
    }

    #[test]
    fn test_select_statement_errors() {
        let config = ArchiveConfig::default();

        let hash = QueryHash::from([(TELESCOPE_KEY.to_string(), QueryValue::text(["UKIRT"]))]);
        let err = select_statement(&hash, &config).unwrap_err();
        assert_eq!(err, MalformedQueryError::NoTables);
        assert_eq!(err.to_string(), "No tables specified");

        let hash = QueryHash::from([
            (TELESCOPE_KEY.to_string(), QueryValue::text(["UKIRT"])),
            (TABLES_KEY.to_string(), QueryValue::Scalars(vec![])),
        ]);
        assert_eq!(
            select_statement(&hash, &config),
            Err(MalformedQueryError::NoTables)
        );

        let hash = QueryHash::from([
            (TELESCOPE_KEY.to_string(), QueryValue::text(["Keck"])),
            (TABLES_KEY.to_string(), QueryValue::text(["ukirt.COMMON"])),
        ]);
        assert_eq!(
            select_statement(&hash, &config),
            Err(MalformedQueryError::UnknownTelescope("Keck".to_string()))
        );
    }
}
