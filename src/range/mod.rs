// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Inclusive ranges of ordered values (numbers, dates and date-times).
//!
//! A [`Range`] may be open on either side. Both bounds are inclusive; where a
//! caller is handed an exclusive upper bound (e.g. "up to, but not including,
//! the 2nd of May"), [`Range::into_exclusive_max`] moves the maximum back by
//! one unit of the bound type so that inclusive comparisons give the right
//! answer.

mod error;

pub use error::InvalidRangeError;

use std::fmt::{self, Display};

use chrono::{NaiveDate, NaiveDateTime};

/// Types that know what "one unit less" is. Days for dates, seconds for
/// date-times and 1 for integers. `None` is returned if there's no such value.
pub trait Decrement: Sized {
    fn decrement(&self) -> Option<Self>;
}

impl Decrement for i64 {
    fn decrement(&self) -> Option<Self> {
        self.checked_sub(1)
    }
}

impl Decrement for NaiveDate {
    fn decrement(&self) -> Option<Self> {
        self.pred_opt()
    }
}

impl Decrement for NaiveDateTime {
    fn decrement(&self) -> Option<Self> {
        self.checked_sub_signed(chrono::Duration::seconds(1))
    }
}

/// A range with optional minimum and maximum. If both are set, the minimum is
/// never greater than the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range<T> {
    min: Option<T>,
    max: Option<T>,
}

impl<T: PartialOrd + Display> Range<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Result<Range<T>, InvalidRangeError> {
        check_bounds(min.as_ref(), max.as_ref())?;
        Ok(Range { min, max })
    }

    /// A range containing everything.
    pub fn unbounded() -> Range<T> {
        Range {
            min: None,
            max: None,
        }
    }

    pub fn at_least(min: T) -> Range<T> {
        Range {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: T) -> Range<T> {
        Range {
            min: None,
            max: Some(max),
        }
    }

    pub fn min(&self) -> Option<&T> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&T> {
        self.max.as_ref()
    }

    /// Is neither bound set?
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Is the value inside this range? Both bounds are inclusive.
    pub fn contains(&self, value: &T) -> bool {
        self.min.as_ref().map(|min| value >= min).unwrap_or(true)
            && self.max.as_ref().map(|max| value <= max).unwrap_or(true)
    }

    /// Replace the minimum. The range is left untouched if the new minimum
    /// would be greater than the maximum.
    pub fn set_min(&mut self, min: Option<T>) -> Result<(), InvalidRangeError> {
        check_bounds(min.as_ref(), self.max.as_ref())?;
        self.min = min;
        Ok(())
    }

    /// Replace the maximum. The range is left untouched if the new maximum
    /// would be less than the minimum.
    pub fn set_max(&mut self, max: Option<T>) -> Result<(), InvalidRangeError> {
        check_bounds(self.min.as_ref(), max.as_ref())?;
        self.max = max;
        Ok(())
    }
}

impl<T: PartialOrd + Display + Decrement + Clone> Range<T> {
    /// Get the bounds of this range when the maximum is treated as exclusive,
    /// i.e. the maximum is moved back by one unit.
    pub fn as_exclusive_max_pair(&self) -> Result<(Option<T>, Option<T>), InvalidRangeError> {
        let max = match &self.max {
            Some(max) => Some(
                max.decrement()
                    .ok_or_else(|| InvalidRangeError::NoPredecessor {
                        max: max.to_string(),
                    })?,
            ),
            None => None,
        };
        Ok((self.min.clone(), max))
    }

    /// Consume this range, treating its maximum as exclusive. The result only
    /// has inclusive bounds. An empty window (e.g. `[d, d)`) is an error.
    pub fn into_exclusive_max(self) -> Result<Range<T>, InvalidRangeError> {
        let (min, max) = self.as_exclusive_max_pair()?;
        Range::new(min, max)
    }
}

impl<T: Display> Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.min {
            Some(min) => write!(f, "[{min}, ")?,
            None => write!(f, "[-inf, ")?,
        }
        match &self.max {
            Some(max) => write!(f, "{max}]"),
            None => write!(f, "+inf]"),
        }
    }
}

fn check_bounds<T: PartialOrd + Display>(
    min: Option<&T>,
    max: Option<&T>,
) -> Result<(), InvalidRangeError> {
    match (min, max) {
        // Incomparable values (NaN) are rejected too.
        (Some(min), Some(max)) if !(min <= max) => Err(InvalidRangeError::MinAboveMax {
            min: min.to_string(),
            max: max.to_string(),
        }),
        _ => Ok(()),
    }
}
