// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Science programmes and their MSBs ("Minimum Schedulable Blocks").
//!
//! A [`ScienceProgram`] owns a [`Document`] and a [`ReferenceIndex`] of it.
//! Consolidating the programme finds its MSBs, checksums them, merges MSBs
//! with identical content (removing the duplicates from the document where
//! nothing else refers to them) and rebuilds the index.

mod dedup;
mod document;
mod error;
mod extract;
mod refs;

pub use dedup::{deduplicate, merge_remaining, DedupOutcome};
pub use document::{Document, NodeId};
pub use error::{DocumentError, MsbError, NotFoundError};
pub use extract::{extract_candidates, MsbRecord, MSB_CONTAINER, OBSERVATION, SURVEY_CONTAINER};
pub use refs::ReferenceIndex;

use log::{debug, warn};

const PROJECT_ID: &str = "projectID";

/// A science programme being consolidated.
#[derive(Debug, Clone)]
pub struct ScienceProgram {
    document: Document,
    index: ReferenceIndex,
    msbs: Vec<MsbRecord>,
    changed: bool,
}

impl ScienceProgram {
    pub fn parse(xml: &str) -> Result<ScienceProgram, MsbError> {
        Ok(Self::from_document(Document::parse(xml)?))
    }

    pub fn from_document(document: Document) -> ScienceProgram {
        let index = ReferenceIndex::rebuild(&document);
        ScienceProgram {
            document,
            index,
            msbs: vec![],
            changed: false,
        }
    }

    /// Find and merge the programme's MSBs. The consolidated MSBs are also
    /// available afterwards from [`ScienceProgram::msbs`]. If this fails, the
    /// programme is left as it was.
    pub fn consolidate(&mut self) -> Result<&[MsbRecord], MsbError> {
        let candidates = extract_candidates(&self.document, &self.index)?;
        let mut document = self.document.clone();
        let outcome = deduplicate(&mut document, candidates);

        let index = if outcome.unbound_occurred {
            let index = ReferenceIndex::rebuild(&document);
            let dangling = index.dangling_references(&document);
            if !dangling.is_empty() {
                warn!(
                    "Removing duplicate MSBs would break {} references",
                    dangling.len()
                );
                return Err(MsbError::DanglingReferences(dangling));
            }
            index
        } else {
            self.index.clone()
        };

        self.document = document;
        self.index = index;
        if outcome.unbound_occurred || outcome.rewritten {
            self.changed = true;
        }
        debug!(
            "Programme {} has {} MSBs",
            self.project_id().unwrap_or_default(),
            outcome.survivors.len()
        );
        self.msbs = outcome.survivors;
        Ok(&self.msbs)
    }

    /// The MSBs found by the last consolidation (none before then).
    pub fn msbs(&self) -> &[MsbRecord] {
        &self.msbs
    }

    /// Has consolidation changed the document?
    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn reference_index(&self) -> &ReferenceIndex {
        &self.index
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The project ID recorded in the programme, if any.
    pub fn project_id(&self) -> Option<String> {
        let root = self.document.root();
        let node = self.document.first_child_named(root, PROJECT_ID).ok()??;
        self.document
            .text(node)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn to_xml(&self) -> String {
        self.document.to_xml()
    }
}
