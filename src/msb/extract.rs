// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Finding the MSBs of a science programme and checksumming them.

use std::collections::HashSet;

use itertools::Itertools;
use log::{debug, trace};
use sha2::{Digest, Sha256};

use super::{document::escape, Document, MsbError, NodeId, ReferenceIndex};
use crate::constants::{
    ADMIN_ATTRIBUTES, ADMIN_ELEMENTS, DEFAULT_REMAINING, IDREF_ATTRIBUTE, REMOVED,
};

/// An explicit scheduling-unit container.
pub const MSB_CONTAINER: &str = "SpMSB";

/// An observation; it's a scheduling unit by itself when flagged with
/// `msb="true"`.
pub const OBSERVATION: &str = "SpObs";

/// Cross-multiplies the units inside it with its target list.
pub const SURVEY_CONTAINER: &str = "SpSurveyContainer";

const MSB_FLAG: &str = "msb";
const REMAINING: &str = "remaining";
const TARGET_LIST: &str = "TargetList";
const TARGET: &str = "Target";
const TITLE: &str = "title";
const TARGET_NAME: &str = "targetName";
const INSTRUMENT_PREFIX: &str = "SpInst";
const ESTIMATED_DURATION: &str = "estimatedDuration";

/// An MSB found in a science programme.
#[derive(Debug, Clone, PartialEq)]
pub struct MsbRecord {
    /// Hex SHA-256 of the MSB's scheduling content.
    pub checksum: String,

    /// How many more times the MSB should be observed. [`REMOVED`] means the
    /// MSB has been withdrawn, which isn't the same as 0 (complete).
    pub remaining: i64,

    pub title: String,

    pub target_summary: String,

    pub instrument_summary: String,

    /// Seconds.
    pub time_estimate: Option<f64>,

    /// The scheduling unit in the document.
    pub node: NodeId,

    /// If this MSB is one target of a survey, the target. The unit node is
    /// then shared with the survey's other MSBs.
    pub survey_target: Option<NodeId>,
}

impl MsbRecord {
    pub fn is_removed(&self) -> bool {
        self.remaining == REMOVED
    }
}

/// Find every MSB in a document, in document order.
///
/// A scheduling unit is an `SpMSB`, or an `SpObs` flagged as an MSB that isn't
/// inside an `SpMSB`; anything nested inside a unit is part of that unit.
/// Units inside a survey container become one MSB per survey target.
pub fn extract_candidates(
    doc: &Document,
    index: &ReferenceIndex,
) -> Result<Vec<MsbRecord>, MsbError> {
    let mut records = vec![];
    visit(doc, index, doc.root(), None, &mut records)?;
    debug!("Found {} MSB candidates", records.len());
    Ok(records)
}

fn is_unit(doc: &Document, id: NodeId) -> Result<bool, MsbError> {
    Ok(match doc.name(id)? {
        Some(MSB_CONTAINER) => true,
        Some(OBSERVATION) => doc
            .attribute(id, MSB_FLAG)?
            .map(|f| f.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        _ => false,
    })
}

fn visit(
    doc: &Document,
    index: &ReferenceIndex,
    id: NodeId,
    survey_targets: Option<&[NodeId]>,
    records: &mut Vec<MsbRecord>,
) -> Result<(), MsbError> {
    if is_unit(doc, id)? {
        match survey_targets {
            Some(targets) if !targets.is_empty() => {
                for &target in targets {
                    records.push(survey_record(doc, index, id, target)?);
                }
            }
            _ => records.push(record(doc, index, id)?),
        }
        return Ok(());
    }

    let children = doc.child_elements(id)?;
    if doc.is_element_named(id, SURVEY_CONTAINER)? {
        let targets: Vec<NodeId> = match doc.first_child_named(id, TARGET_LIST)? {
            Some(list) => doc
                .child_elements(list)?
                .into_iter()
                .filter(|&t| doc.is_element_named(t, TARGET).unwrap_or(false))
                .collect(),
            None => vec![],
        };
        trace!("Survey container {id} has {} targets", targets.len());
        for child in children {
            if !doc.is_element_named(child, TARGET_LIST)? {
                visit(doc, index, child, Some(targets.as_slice()), records)?;
            }
        }
    } else {
        for child in children {
            visit(doc, index, child, survey_targets, records)?;
        }
    }
    Ok(())
}

fn record(doc: &Document, index: &ReferenceIndex, unit: NodeId) -> Result<MsbRecord, MsbError> {
    let title = title(doc, unit)?;
    let remaining = remaining(doc, unit, &title)?.unwrap_or(DEFAULT_REMAINING);
    let content = resolved_descendants(doc, index, unit)?;

    Ok(MsbRecord {
        checksum: checksum(&[canonical(doc, index, unit)?]),
        remaining,
        title,
        target_summary: summarise_targets(doc, &content)?,
        instrument_summary: summarise_instruments(doc, &content)?,
        time_estimate: time_estimate(doc, &content)?,
        node: unit,
        survey_target: None,
    })
}

fn survey_record(
    doc: &Document,
    index: &ReferenceIndex,
    unit: NodeId,
    target: NodeId,
) -> Result<MsbRecord, MsbError> {
    let template_title = title(doc, unit)?;
    let target_content = resolved_descendants(doc, index, target)?;
    let target_summary = summarise_targets(doc, &target_content)?;
    let title = if target_summary.is_empty() {
        template_title
    } else {
        format!("{template_title}: {target_summary}")
    };

    let remaining = match remaining(doc, target, &title)? {
        Some(r) => r,
        None => remaining(doc, unit, &title)?.unwrap_or(DEFAULT_REMAINING),
    };
    let content = resolved_descendants(doc, index, unit)?;

    Ok(MsbRecord {
        checksum: checksum(&[canonical(doc, index, unit)?, canonical(doc, index, target)?]),
        remaining,
        title,
        target_summary,
        instrument_summary: summarise_instruments(doc, &content)?,
        time_estimate: time_estimate(doc, &content)?,
        node: unit,
        survey_target: Some(target),
    })
}

fn title(doc: &Document, unit: NodeId) -> Result<String, MsbError> {
    Ok(match doc.first_child_named(unit, TITLE)? {
        Some(t) => doc.text(t)?.trim().to_string(),
        None => String::new(),
    })
}

/// The `remaining` attribute of a node, if it has one.
fn remaining(doc: &Document, id: NodeId, title: &str) -> Result<Option<i64>, MsbError> {
    match doc.attribute(id, REMAINING)? {
        None => Ok(None),
        Some(value) => match value.trim().parse::<i64>() {
            Ok(r) if r >= REMOVED => Ok(Some(r)),
            _ => Err(MsbError::InvalidRemaining {
                title: title.to_string(),
                value: value.to_string(),
            }),
        },
    }
}

/// Every node under `id`, also following `idref`s into the nodes they refer
/// to. Each referenced node is only followed once.
fn resolved_descendants(
    doc: &Document,
    index: &ReferenceIndex,
    id: NodeId,
) -> Result<Vec<NodeId>, MsbError> {
    let mut out = vec![];
    let mut followed = HashSet::new();
    let mut stack = vec![id];
    while let Some(next) = stack.pop() {
        for node in doc.descendants(next)? {
            out.push(node);
            if let Some(idref) = doc.attribute(node, IDREF_ATTRIBUTE)? {
                let target = index.lookup(idref)?;
                if followed.insert(target) {
                    stack.push(target);
                }
            }
        }
    }
    Ok(out)
}

fn summarise_targets(doc: &Document, content: &[NodeId]) -> Result<String, MsbError> {
    let mut names = vec![];
    for &node in content {
        if doc.is_element_named(node, TARGET_NAME)? {
            let name = doc.text(node)?.trim().to_string();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names.join("/"))
}

fn summarise_instruments(doc: &Document, content: &[NodeId]) -> Result<String, MsbError> {
    let mut instruments = vec![];
    for &node in content {
        if let Some(instrument) = doc
            .name(node)?
            .and_then(|n| n.strip_prefix(INSTRUMENT_PREFIX))
            .filter(|i| !i.is_empty())
        {
            instruments.push(instrument.to_string());
        }
    }
    Ok(instruments.into_iter().unique().join("/"))
}

fn time_estimate(doc: &Document, content: &[NodeId]) -> Result<Option<f64>, MsbError> {
    for &node in content {
        if doc.is_element_named(node, ESTIMATED_DURATION)? {
            let text = doc.text(node)?;
            return Ok(match text.trim().parse::<f64>() {
                Ok(t) => Some(t),
                Err(_) => {
                    debug!("Ignoring an unreadable time estimate '{}'", text.trim());
                    None
                }
            });
        }
    }
    Ok(None)
}

fn checksum(parts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// A canonical rendering of a subtree's scheduling content. Attributes are
/// sorted, text is trimmed, administrative attributes and elements are left
/// out, and `idref`s are replaced by the content they refer to.
pub(crate) fn canonical(
    doc: &Document,
    index: &ReferenceIndex,
    id: NodeId,
) -> Result<String, MsbError> {
    let mut out = String::new();
    let mut resolving = vec![];
    write_canonical(doc, index, id, &mut out, &mut resolving)?;
    Ok(out)
}

fn write_canonical(
    doc: &Document,
    index: &ReferenceIndex,
    id: NodeId,
    out: &mut String,
    resolving: &mut Vec<NodeId>,
) -> Result<(), MsbError> {
    let name = match doc.name(id)? {
        Some(name) => name,
        None => {
            out.push_str(&escape(doc.text(id)?.trim(), false));
            return Ok(());
        }
    };
    if ADMIN_ELEMENTS.contains(&name) {
        return Ok(());
    }

    // A reference renders as the element it refers to, so a component reads
    // the same whether it's written inline or referred to.
    if let Some(idref) = doc.attribute(id, IDREF_ATTRIBUTE)? {
        let target = index.lookup(idref)?;
        if resolving.contains(&target) {
            out.push_str("<cycle/>");
        } else {
            resolving.push(target);
            write_canonical(doc, index, target, out, resolving)?;
            resolving.pop();
        }
        return Ok(());
    }

    out.push('<');
    out.push_str(name);
    let attributes = doc
        .attributes(id)?
        .iter()
        .filter(|(k, _)| !ADMIN_ATTRIBUTES.contains(&k.as_str()))
        .sorted_by(|a, b| a.0.cmp(&b.0));
    for (k, v) in attributes {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&escape(v, true));
        out.push('"');
    }
    out.push('>');

    for &child in doc.children(id)? {
        write_canonical(doc, index, child, out, resolving)?;
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
    Ok(())
}
