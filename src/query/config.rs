// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The archive configuration: which telescopes exist, which tables hold their
//! data, which instruments imply which tables, and which physical column each
//! logical query tag maps to in each table.
//!
//! Nothing here is global; a configuration is handed to
//! [`QueryBuilder`](super::QueryBuilder) and
//! [`select_statement`](super::select_statement), so tests (or other
//! archives) can supply their own. The [`Default`] configuration describes the
//! UKIRT and JCMT archives. A configuration may also be read from a toml or
//! json file.

use std::{
    collections::HashSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use vec1::{vec1, Vec1};

use super::{is_valid_column, ConfigError};

/// The file types that an archive configuration can be read from.
#[derive(Debug, Display, EnumIter, EnumString)]
pub(crate) enum ConfigFileType {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Case {
    Upper,
    Lower,
}

impl Case {
    pub fn apply(self, s: &str) -> String {
        match self {
            Case::Upper => s.to_uppercase(),
            Case::Lower => s.to_lowercase(),
        }
    }
}

/// How values for a column are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Values are compared for equality as strings.
    #[default]
    Text,

    /// Values are matched with `LIKE`.
    FreeText,

    /// Values must be integers.
    Integer,

    /// A temporal column with day resolution.
    Date,

    /// A temporal column with second resolution.
    DateTime,
}

/// The physical column that a logical query tag maps to in a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    /// The column name, including the table alias (e.g. "U.UT_DATE").
    pub column: String,

    #[serde(default)]
    pub kind: ColumnKind,

    /// Values are case-folded before comparison, because the column is stored
    /// in only one case.
    #[serde(default)]
    pub case: Option<Case>,
}

impl ColumnConfig {
    pub fn new(column: &str, kind: ColumnKind, case: Option<Case>) -> ColumnConfig {
        ColumnConfig {
            column: column.to_string(),
            kind,
            case,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: String,

    pub alias: String,

    /// A condition that must be ANDed into any query using this table (e.g.
    /// to join it against another table).
    #[serde(default)]
    pub join: Option<String>,

    /// Logical query tags (e.g. "date") and the columns they map to.
    #[serde(default)]
    pub columns: IndexMap<String, ColumnConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelescopeConfig {
    pub name: String,

    /// The tables to query when no instrument is given.
    pub default_tables: Vec1<String>,

    /// A column to order results by. Only telescopes with coarse time
    /// resolution need one to get a stable ordering.
    #[serde(default)]
    pub order_by: Option<String>,
}

/// Maps an instrument name (or a family of names sharing a prefix) to its
/// telescope and tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentRule {
    pub name: String,

    /// If true, any instrument starting with `name` matches.
    #[serde(default)]
    pub prefix: bool,

    pub telescope: String,

    pub tables: Vec1<String>,

    #[serde(default)]
    pub family: Option<String>,
}

impl InstrumentRule {
    fn new(
        name: &str,
        prefix: bool,
        telescope: &str,
        tables: Vec1<String>,
        family: Option<&str>,
    ) -> InstrumentRule {
        InstrumentRule {
            name: name.to_string(),
            prefix,
            telescope: telescope.to_string(),
            tables,
            family: family.map(|f| f.to_string()),
        }
    }

    fn matches_exactly(&self, instrument: &str) -> bool {
        !self.prefix && self.name.eq_ignore_ascii_case(instrument)
    }

    fn matches_prefix(&self, instrument: &str) -> bool {
        self.prefix
            && instrument
                .to_uppercase()
                .starts_with(&self.name.to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    #[serde(rename = "telescope")]
    pub telescopes: Vec<TelescopeConfig>,

    #[serde(rename = "table")]
    pub tables: Vec<TableConfig>,

    #[serde(rename = "instrument")]
    #[serde(default)]
    pub instruments: Vec<InstrumentRule>,

    /// Pairs of instrument families that may not appear in the same query.
    #[serde(default)]
    pub incompatible_families: Vec<[String; 2]>,
}

impl ArchiveConfig {
    /// Read a configuration from a toml or json file (chosen by the file's
    /// extension) and check that it's consistent.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<ArchiveConfig, ConfigError> {
        fn inner(file: &Path) -> Result<ArchiveConfig, ConfigError> {
            debug!("Attempting to parse archive configuration {}", file.display());

            let file_type = file
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .and_then(|e| ConfigFileType::from_str(&e).ok());

            let mut contents = String::new();
            let config: ArchiveConfig = match file_type {
                Some(ConfigFileType::Toml) => {
                    debug!("Parsing toml file...");
                    File::open(file)?.read_to_string(&mut contents)?;
                    toml::from_str(&contents).map_err(|err| ConfigError::Toml {
                        file: file.to_path_buf(),
                        err,
                    })?
                }
                Some(ConfigFileType::Json) => {
                    debug!("Parsing json file...");
                    File::open(file)?.read_to_string(&mut contents)?;
                    serde_json::from_str(&contents).map_err(|err| ConfigError::Json {
                        file: file.to_path_buf(),
                        err,
                    })?
                }
                None => return Err(ConfigError::UnrecognisedExtension(PathBuf::from(file))),
            };
            config.validate()?;
            Ok(config)
        }
        inner(file.as_ref())
    }

    /// Check that everything refers to things that exist, and that all column
    /// names are plain identifiers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for telescope in &self.telescopes {
            if !seen.insert(telescope.name.to_uppercase()) {
                return Err(ConfigError::DuplicateTelescope(telescope.name.clone()));
            }
            for table in telescope.default_tables.iter() {
                if self.table(table).is_none() {
                    return Err(ConfigError::UnknownTable {
                        context: format!("Telescope {}", telescope.name),
                        table: table.clone(),
                    });
                }
            }
            if let Some(order_by) = &telescope.order_by {
                if !is_valid_column(order_by) {
                    return Err(ConfigError::InvalidColumn(order_by.clone()));
                }
            }
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(ConfigError::DuplicateTable(table.name.clone()));
            }
            for name in [&table.name, &table.alias] {
                if !is_valid_column(name) {
                    return Err(ConfigError::InvalidColumn(name.clone()));
                }
            }
            if let Some(c) = table
                .columns
                .values()
                .find(|c| !is_valid_column(&c.column))
            {
                return Err(ConfigError::InvalidColumn(c.column.clone()));
            }
        }

        for rule in &self.instruments {
            if self.telescope(&rule.telescope).is_none() {
                return Err(ConfigError::UnknownTelescope {
                    instrument: rule.name.clone(),
                    telescope: rule.telescope.clone(),
                });
            }
            for table in rule.tables.iter() {
                if self.table(table).is_none() {
                    return Err(ConfigError::UnknownTable {
                        context: format!("Instrument {}", rule.name),
                        table: table.clone(),
                    });
                }
            }
        }

        trace!(
            "Archive configuration OK; telescopes: {}",
            self.telescopes.iter().map(|t| &t.name).join(", ")
        );
        Ok(())
    }

    /// Find a telescope by name (case insensitive).
    pub fn telescope(&self, name: &str) -> Option<&TelescopeConfig> {
        self.telescopes
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Find the rule describing an instrument. Exact names win over prefix
    /// families; otherwise the first matching rule is used.
    pub fn classify_instrument(&self, instrument: &str) -> Option<&InstrumentRule> {
        let instrument = instrument.trim();
        self.instruments
            .iter()
            .find(|r| r.matches_exactly(instrument))
            .or_else(|| self.instruments.iter().find(|r| r.matches_prefix(instrument)))
    }

    /// Is this logical tag mapped to a column in any table?
    pub fn is_logical_tag(&self, tag: &str) -> bool {
        self.tables.iter().any(|t| t.columns.contains_key(tag))
    }

    pub fn families_are_compatible(&self, a: &str, b: &str) -> bool {
        !self.incompatible_families.iter().any(|[x, y]| {
            (x.eq_ignore_ascii_case(a) && y.eq_ignore_ascii_case(b))
                || (x.eq_ignore_ascii_case(b) && y.eq_ignore_ascii_case(a))
        })
    }
}

impl Default for ArchiveConfig {
    /// The UKIRT and JCMT archives.
    fn default() -> Self {
        use ColumnKind::*;

        let ukirt_common = TableConfig {
            name: "ukirt.COMMON".to_string(),
            alias: "U".to_string(),
            join: None,
            columns: IndexMap::from([
                (
                    "date".to_string(),
                    ColumnConfig::new("U.UT_DATE", Date, None),
                ),
                (
                    "instrument".to_string(),
                    ColumnConfig::new("U.INSTRUME", Text, Some(Case::Upper)),
                ),
                (
                    "projectid".to_string(),
                    ColumnConfig::new("U.PROJECT", Text, Some(Case::Upper)),
                ),
                (
                    "runnr".to_string(),
                    ColumnConfig::new("U.OBSNUM", Integer, None),
                ),
                (
                    "object".to_string(),
                    ColumnConfig::new("U.OBJECT", FreeText, None),
                ),
            ]),
        };
        let jcmt_common = TableConfig {
            name: "jcmt.COMMON".to_string(),
            alias: "C".to_string(),
            join: None,
            columns: IndexMap::from([
                (
                    "date".to_string(),
                    ColumnConfig::new("C.date_obs", DateTime, None),
                ),
                (
                    "instrument".to_string(),
                    ColumnConfig::new("C.instrume", Text, Some(Case::Lower)),
                ),
                (
                    "projectid".to_string(),
                    ColumnConfig::new("C.project", Text, Some(Case::Upper)),
                ),
                (
                    "runnr".to_string(),
                    ColumnConfig::new("C.obsnum", Integer, None),
                ),
                (
                    "object".to_string(),
                    ColumnConfig::new("C.object", FreeText, None),
                ),
            ]),
        };
        // The SCUBA table has no instrument column; everything in it is SCUBA.
        let jcmt_scu = TableConfig {
            name: "jcmt.SCU".to_string(),
            alias: "S".to_string(),
            join: None,
            columns: IndexMap::from([
                ("date".to_string(), ColumnConfig::new("S.ut", DateTime, None)),
                (
                    "projectid".to_string(),
                    ColumnConfig::new("S.proj_id", Text, Some(Case::Lower)),
                ),
                ("runnr".to_string(), ColumnConfig::new("S.run", Integer, None)),
                (
                    "object".to_string(),
                    ColumnConfig::new("S.object", FreeText, None),
                ),
            ]),
        };
        let jcmt_acsis = TableConfig {
            name: "jcmt.ACSIS".to_string(),
            alias: "A".to_string(),
            join: Some("A.obsid = C.obsid".to_string()),
            columns: IndexMap::from([(
                "molecule".to_string(),
                ColumnConfig::new("A.molecule", FreeText, None),
            )]),
        };

        let ukirt = |name: &str| {
            InstrumentRule::new(name, false, "UKIRT", vec1!["ukirt.COMMON".to_string()], None)
        };
        let heterodyne = vec1!["jcmt.COMMON".to_string(), "jcmt.ACSIS".to_string()];

        ArchiveConfig {
            telescopes: vec![
                TelescopeConfig {
                    name: "UKIRT".to_string(),
                    default_tables: vec1!["ukirt.COMMON".to_string()],
                    order_by: Some("U.UT_DATE".to_string()),
                },
                TelescopeConfig {
                    name: "JCMT".to_string(),
                    default_tables: vec1!["jcmt.COMMON".to_string()],
                    order_by: None,
                },
            ],
            tables: vec![ukirt_common, jcmt_common, jcmt_scu, jcmt_acsis],
            instruments: vec![
                ukirt("CGS4"),
                ukirt("UFTI"),
                ukirt("UIST"),
                ukirt("MICHELLE"),
                ukirt("IRCAM"),
                ukirt("WFCAM"),
                InstrumentRule::new(
                    "SCUBA",
                    false,
                    "JCMT",
                    vec1!["jcmt.SCU".to_string()],
                    Some("scuba"),
                ),
                InstrumentRule::new(
                    "SCUBA-2",
                    false,
                    "JCMT",
                    vec1!["jcmt.COMMON".to_string()],
                    Some("scuba2"),
                ),
                InstrumentRule::new("HARP", false, "JCMT", heterodyne.clone(), Some("heterodyne")),
                InstrumentRule::new("RX", true, "JCMT", heterodyne, Some("heterodyne")),
            ],
            incompatible_families: vec![["scuba".to_string(), "heterodyne".to_string()]],
        }
    }
}
