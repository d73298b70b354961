// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Merging MSBs with identical content.

use std::collections::HashSet;

use indexmap::{map::Entry, IndexMap};
use log::{debug, trace, warn};

use super::{Document, MsbRecord, NodeId};
use crate::constants::{ID_ATTRIBUTE, IDREF_ATTRIBUTE, REMOVED};

const REMAINING: &str = "remaining";

#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    /// The first occurrence of each distinct MSB, in document order.
    pub survivors: Vec<MsbRecord>,

    /// Was anything removed from the document? If so, any
    /// [`ReferenceIndex`](super::ReferenceIndex) of it is out of date.
    pub unbound_occurred: bool,

    /// Were any remaining counts in the document given new values?
    pub rewritten: bool,

    /// The number of duplicates merged into survivors.
    pub merged: usize,
}

/// Merge MSBs that have the same checksum. The first occurrence survives and
/// takes on the remaining counts of its duplicates; the duplicates are removed
/// from the document.
///
/// Some duplicates can't be removed: survey MSBs share their unit node with
/// the rest of the survey, and other parts of the programme may refer to ids
/// defined inside a duplicate. These stay in the document, but are marked as
/// withdrawn once their counts have been given to the survivor.
///
/// A survivor's merged count is written back into the document (on the unit,
/// or on the target for survey MSBs). `candidates` must be in document order.
pub fn deduplicate(doc: &mut Document, candidates: Vec<MsbRecord>) -> DedupOutcome {
    let num_candidates = candidates.len();
    let mut seen: IndexMap<String, MsbRecord> = IndexMap::with_capacity(num_candidates);
    let mut updated: Vec<String> = vec![];
    let mut unbound_occurred = false;
    let mut rewritten = false;
    let mut merged = 0;

    for candidate in candidates {
        match seen.entry(candidate.checksum.clone()) {
            Entry::Vacant(v) => {
                v.insert(candidate);
            }
            Entry::Occupied(mut o) => {
                merged += 1;
                let survivor = o.get_mut();
                survivor.remaining = merge_remaining(survivor.remaining, candidate.remaining);
                debug!(
                    "MSB '{}' duplicates '{}'; remaining is now {}",
                    candidate.title, survivor.title, survivor.remaining
                );
                if !updated.contains(&candidate.checksum) {
                    updated.push(candidate.checksum.clone());
                }

                let kept = match candidate.survey_target {
                    Some(target) => {
                        trace!("Not unbinding survey MSB '{}'", candidate.title);
                        Some(target)
                    }
                    None if referenced_elsewhere(doc, candidate.node) => {
                        debug!(
                            "Not unbinding MSB '{}'; other parts of the programme refer to it",
                            candidate.title
                        );
                        Some(candidate.node)
                    }
                    None => None,
                };
                match kept {
                    Some(node) => rewritten |= set_remaining(doc, node, REMOVED, &candidate.title),
                    None => match doc.unbind(candidate.node) {
                        Ok(()) => unbound_occurred = true,
                        Err(e) => {
                            warn!("Couldn't remove duplicate MSB '{}': {e}", candidate.title)
                        }
                    },
                }
            }
        }
    }

    for checksum in updated {
        if let Some(survivor) = seen.get(&checksum) {
            let node = survivor.survey_target.unwrap_or(survivor.node);
            rewritten |= set_remaining(doc, node, survivor.remaining, &survivor.title);
        }
    }

    debug!(
        "{num_candidates} MSB candidates consolidated into {}",
        seen.len()
    );
    DedupOutcome {
        survivors: seen.into_iter().map(|(_, msb)| msb).collect(),
        unbound_occurred,
        rewritten,
        merged,
    }
}

/// Write a remaining count onto a node. Returns whether the value changed.
fn set_remaining(doc: &mut Document, node: NodeId, remaining: i64, title: &str) -> bool {
    let value = remaining.to_string();
    if let Ok(Some(current)) = doc.attribute(node, REMAINING) {
        if current == value {
            return false;
        }
    }
    match doc.set_attribute(node, REMAINING, &value) {
        Ok(()) => true,
        Err(e) => {
            warn!("Couldn't update the remaining count of '{title}': {e}");
            false
        }
    }
}

/// Does anything outside the subtree of `node` refer to an id defined inside
/// it?
fn referenced_elsewhere(doc: &Document, node: NodeId) -> bool {
    let subtree = match doc.descendants(node) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let ids: HashSet<&str> = subtree
        .iter()
        .filter_map(|&n| doc.attribute(n, ID_ATTRIBUTE).ok().flatten())
        .collect();
    if ids.is_empty() {
        return false;
    }

    let inside: HashSet<NodeId> = subtree.into_iter().collect();
    doc.descendants(doc.root())
        .unwrap_or_default()
        .into_iter()
        .filter(|n| !inside.contains(n))
        .any(|n| matches!(doc.attribute(n, IDREF_ATTRIBUTE), Ok(Some(r)) if ids.contains(r)))
}

/// Combine the remaining counts of two copies of an MSB. A withdrawn copy
/// contributes nothing; the result is only withdrawn if both are.
pub fn merge_remaining(a: i64, b: i64) -> i64 {
    match (a, b) {
        (REMOVED, REMOVED) => REMOVED,
        (REMOVED, other) | (other, REMOVED) => other,
        (a, b) => a.saturating_add(b),
    }
}
