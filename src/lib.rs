// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Observation management tools for the UKIRT and JCMT archives.

- [`query`] turns archive query XML into SQL;
- [`msb`] consolidates the MSBs ("Minimum Schedulable Blocks") of science
  programmes; and
- [`ledger`] summarises the MSB-done ledger.
 */

mod cli;
pub mod constants;
pub mod ledger;
pub mod msb;
pub mod query;
pub mod range;

pub use cli::{Omp, OmpError};
