// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Tag names and markers that are part of the query language or the science
programme format live here so that the builder, the translator and the MSB
code agree on them.
 */

/// Query tags (and QueryHash keys) starting with this prefix are metadata;
/// they are never translated into SQL.
pub const PRIVATE_PREFIX: &str = "_";

/// A column name (or QueryHash key) starting with this marker is a free-text
/// field and is matched with `LIKE` rather than `=`.
pub const FREE_TEXT_MARKER: &str = "TEXTFIELD__";

/// The QueryHash key holding the resolved telescope.
pub const TELESCOPE_KEY: &str = "_telescope";

/// The QueryHash key holding the resolved tables.
pub const TABLES_KEY: &str = "_tables";

/// The query tag naming a telescope.
pub const TELESCOPE_TAG: &str = "telescope";

/// The query tag naming instruments.
pub const INSTRUMENT_TAG: &str = "instrument";

/// The value of [`crate::msb::MsbRecord::remaining`] for a withdrawn MSB.
pub const REMOVED: i64 = -1;

/// The repeat count given to an MSB that doesn't specify one.
pub const DEFAULT_REMAINING: i64 = 1;

/// The attribute carrying element identifiers in science programmes.
pub const ID_ATTRIBUTE: &str = "id";

/// The attribute referring to an element identifier elsewhere in a science
/// programme.
pub const IDREF_ATTRIBUTE: &str = "idref";

/// Attributes that are administrative metadata; they never contribute to an
/// MSB checksum.
pub const ADMIN_ATTRIBUTES: [&str; 5] = ["id", "remaining", "checksum", "observed", "msb"];

/// Elements that are administrative metadata; they (and their children) never
/// contribute to an MSB checksum.
pub const ADMIN_ELEMENTS: [&str; 3] = ["checksum", "remaining", "observed"];
