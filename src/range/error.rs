// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidRangeError {
    #[error("Invalid range: the minimum ({min}) is greater than the maximum ({max})")]
    MinAboveMax { min: String, max: String },

    #[error("Invalid range: the exclusive maximum ({max}) has no preceding value")]
    NoPredecessor { max: String },
}
