// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Looking up elements by their `id` attribute.

use std::collections::{HashMap, HashSet};

use log::{trace, warn};

use super::{Document, NodeId, NotFoundError};
use crate::constants::{ID_ATTRIBUTE, IDREF_ATTRIBUTE};

/// Maps element ids to nodes. The index is never patched; whenever the
/// document changes, a new one is built with [`ReferenceIndex::rebuild`].
///
/// An index that was never built is different to one that was built from a
/// document without any ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    ids: Option<HashMap<String, NodeId>>,
}

impl ReferenceIndex {
    /// An index that hasn't been built.
    pub fn new() -> ReferenceIndex {
        ReferenceIndex::default()
    }

    /// Index every live element carrying an id. If an id appears more than
    /// once, the first element wins.
    pub fn rebuild(doc: &Document) -> ReferenceIndex {
        let mut ids = HashMap::new();
        // The root is always live.
        for node in doc.descendants(doc.root()).unwrap_or_default() {
            if let Ok(Some(id)) = doc.attribute(node, ID_ATTRIBUTE) {
                if ids.contains_key(id) {
                    warn!("The id '{id}' is used by more than one element; only the first is used");
                } else {
                    ids.insert(id.to_string(), node);
                }
            }
        }
        trace!("Reference index has {} ids", ids.len());
        ReferenceIndex { ids: Some(ids) }
    }

    pub fn lookup(&self, id: &str) -> Result<NodeId, NotFoundError> {
        self.ids
            .as_ref()
            .ok_or(NotFoundError::NotBuilt)?
            .get(id)
            .copied()
            .ok_or_else(|| NotFoundError::Id(id.to_string()))
    }

    pub fn is_built(&self) -> bool {
        self.ids.is_some()
    }

    pub fn len(&self) -> usize {
        self.ids.as_ref().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `idref`s in the document that this index can't resolve (or point
    /// at nodes that are no longer in the document), in document order.
    pub fn dangling_references(&self, doc: &Document) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dangling = vec![];
        for node in doc.descendants(doc.root()).unwrap_or_default() {
            if let Ok(Some(idref)) = doc.attribute(node, IDREF_ATTRIBUTE) {
                let resolves = self
                    .lookup(idref)
                    .map(|target| doc.is_live(target))
                    .unwrap_or(false);
                if !resolves && seen.insert(idref) {
                    dangling.push(idref.to_string());
                }
            }
        }
        dangling
    }
}
