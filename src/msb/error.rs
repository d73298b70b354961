// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use super::NodeId;

/// Errors associated with the document arena.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Could not parse the science programme XML: {0}")]
    Xml(String),

    #[error("{0} has been unbound from the document")]
    Unbound(NodeId),

    #[error("{0} does not belong to this document")]
    NoSuchNode(NodeId),

    #[error("The root element of a document cannot be unbound")]
    UnbindRoot,
}

/// A failed lookup in a [`ReferenceIndex`](super::ReferenceIndex).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("The reference index has not been built")]
    NotBuilt,

    #[error("No element has the id '{0}'")]
    Id(String),
}

/// Errors associated with extracting and consolidating MSBs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MsbError {
    #[error("MSB '{title}' has an invalid remaining count '{value}'; expected an integer no smaller than -1")]
    InvalidRemaining { title: String, value: String },

    #[error("Unresolvable reference: {0}")]
    Reference(#[from] NotFoundError),

    #[error("After consolidation, these references no longer resolve: {}", .0.join(", "))]
    DanglingReferences(Vec<String>),

    #[error(transparent)]
    Document(#[from] DocumentError),
}
