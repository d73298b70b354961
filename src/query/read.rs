// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading raw archive queries from XML.
//!
//! A query looks like:
//!
//! ```xml
//! <ArcQuery>
//!   <telescope>UKIRT</telescope>
//!   <instrument>UFTI</instrument>
//!   <date><min>2024-05-01</min><max>2024-05-02</max></date>
//!   <or>
//!     <runnr>5</runnr>
//!     <object>M31</object>
//!   </or>
//! </ArcQuery>
//! ```
//!
//! Nothing is interpreted here; the tags are only sorted into values, ranges
//! and groups.

use indexmap::{map::Entry, IndexMap};
use log::trace;

use super::MalformedQueryError;

/// A single value of a query tag, e.g. the "2024-05-01" in
/// `<date delta="2">2024-05-01</date>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub text: String,

    /// Only meaningful for dates: the number of days the value covers.
    pub delta: Option<String>,
}

impl RawValue {
    pub fn new(text: &str) -> RawValue {
        RawValue {
            text: text.to_string(),
            delta: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEntry {
    /// All the values given for a repeated tag, in order.
    Values(Vec<RawValue>),

    /// A tag with `<min>` and/or `<max>` children.
    Range {
        min: Option<String>,
        max: Option<String>,
    },

    /// A tag with other tags inside it; any of them may match.
    Group(IndexMap<String, RawEntry>),
}

/// A query as it was written, before any telescope-specific processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuery {
    root: String,
    entries: IndexMap<String, RawEntry>,
}

impl RawQuery {
    pub fn new(root: &str, entries: IndexMap<String, RawEntry>) -> RawQuery {
        RawQuery {
            root: root.to_string(),
            entries,
        }
    }

    pub fn from_xml(xml: &str) -> Result<RawQuery, MalformedQueryError> {
        let doc =
            roxmltree::Document::parse(xml).map_err(|e| MalformedQueryError::Xml(e.to_string()))?;
        let root = doc.root_element();
        let entries = read_entries(root)?;
        trace!(
            "Read query <{}> with {} entries",
            root.tag_name().name(),
            entries.len()
        );
        Ok(RawQuery::new(root.tag_name().name(), entries))
    }

    /// The name of the root element, e.g. "ArcQuery".
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn entries(&self) -> &IndexMap<String, RawEntry> {
        &self.entries
    }
}

fn read_entries(node: roxmltree::Node) -> Result<IndexMap<String, RawEntry>, MalformedQueryError> {
    let mut entries: IndexMap<String, RawEntry> = IndexMap::new();

    for child in node.children().filter(|n| n.is_element()) {
        let key = child.tag_name().name().to_string();
        let element_children: Vec<_> = child.children().filter(|n| n.is_element()).collect();

        if element_children.is_empty() {
            let text = child.text().map(str::trim).unwrap_or_default();
            if text.is_empty() {
                trace!("Ignoring empty query tag '{key}'");
                continue;
            }
            let value = RawValue {
                text: text.to_string(),
                delta: child.attribute("delta").map(|d| d.trim().to_string()),
            };
            match entries.entry(key) {
                Entry::Vacant(v) => {
                    v.insert(RawEntry::Values(vec![value]));
                }
                Entry::Occupied(mut o) => match o.get_mut() {
                    RawEntry::Values(values) => values.push(value),
                    _ => {
                        return Err(MalformedQueryError::DuplicateTag {
                            key: o.key().clone(),
                        })
                    }
                },
            }
            continue;
        }

        let entry = if element_children
            .iter()
            .all(|n| matches!(n.tag_name().name(), "min" | "max"))
        {
            let bound = |name: &str| {
                element_children
                    .iter()
                    .find(|n| n.tag_name().name() == name)
                    .and_then(|n| n.text())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
            };
            RawEntry::Range {
                min: bound("min"),
                max: bound("max"),
            }
        } else {
            RawEntry::Group(read_entries(child)?)
        };

        if entries.contains_key(&key) {
            return Err(MalformedQueryError::DuplicateTag { key });
        }
        entries.insert(key, entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn read_simple_query() {
        let q = RawQuery::from_xml(indoc! {r#"
            <ArcQuery>
              <telescope>UKIRT</telescope>
              <instrument>UFTI</instrument>
              <instrument> CGS4 </instrument>
              <date delta="2">2024-05-01</date>
              <empty></empty>
            </ArcQuery>
        "#})
        .unwrap();

        assert_eq!(q.root(), "ArcQuery");
        let keys: Vec<_> = q.entries().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["telescope", "instrument", "date"]);
        assert_eq!(
            q.entries()["instrument"],
            RawEntry::Values(vec![RawValue::new("UFTI"), RawValue::new("CGS4")])
        );
        assert_eq!(
            q.entries()["date"],
            RawEntry::Values(vec![RawValue {
                text: "2024-05-01".to_string(),
                delta: Some("2".to_string())
            }])
        );
    }

    #[test]
    fn read_ranges_and_groups() {
        let q = RawQuery::from_xml(indoc! {r#"
            <ArcQuery>
              <date><min>2024-05-01</min><max>2024-05-02</max></date>
              <runnr><min>10</min></runnr>
              <or>
                <projectid>U/24A/1</projectid>
                <object>M31</object>
              </or>
            </ArcQuery>
        "#})
        .unwrap();

        assert_eq!(
            q.entries()["date"],
            RawEntry::Range {
                min: Some("2024-05-01".to_string()),
                max: Some("2024-05-02".to_string())
            }
        );
        assert_eq!(
            q.entries()["runnr"],
            RawEntry::Range {
                min: Some("10".to_string()),
                max: None
            }
        );
        match &q.entries()["or"] {
            RawEntry::Group(g) => {
                assert_eq!(g.len(), 2);
                assert_eq!(
                    g["projectid"],
                    RawEntry::Values(vec![RawValue::new("U/24A/1")])
                );
            }
            e => panic!("expected a group, got {e:?}"),
        }
    }

    #[test]
    fn read_bad_queries() {
        assert!(matches!(
            RawQuery::from_xml("<ArcQuery><telescope>UKIRT</ArcQuery>"),
            Err(MalformedQueryError::Xml(_))
        ));

        let result = RawQuery::from_xml(
            "<ArcQuery><date><min>1</min></date><date>2024-05-01</date></ArcQuery>",
        );
        assert_eq!(
            result,
            Err(MalformedQueryError::DuplicateTag {
                key: "date".to_string()
            })
        );
    }
}
