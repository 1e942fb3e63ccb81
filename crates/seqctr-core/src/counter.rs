//! Counter record type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CounterValueError;
use crate::CounterName;

/// Largest value a counter can hold.
pub const MAX_VALUE: u32 = u32::MAX;

/// A named counter as read from the store.
///
/// `value` is the last value handed out; a freshly created counter holds 0 and
/// the first increment yields 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    /// Surrogate key of the backing row.
    pub id: i64,

    /// The counter name.
    pub name: CounterName,

    /// Current value.
    pub value: u32,

    /// When the counter was created.
    pub created_at: DateTime<Utc>,

    /// When the counter was last incremented.
    pub updated_at: DateTime<Utc>,
}

impl Counter {
    /// Build a counter from a stored row, checking the value domain.
    ///
    /// # Errors
    ///
    /// Returns `CounterValueError::OutOfRange` if `value` does not fit in a `u32`.
    pub fn from_stored(
        id: i64,
        name: CounterName,
        value: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, CounterValueError> {
        let value = u32::try_from(value).map_err(|_| CounterValueError::OutOfRange {
            name: name.to_string(),
            value,
        })?;

        Ok(Self {
            id,
            name,
            value,
            created_at,
            updated_at,
        })
    }

    /// Move the counter to its next value, stamping `updated_at`.
    ///
    /// Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `CounterValueError::Overflow` if the counter already holds
    /// [`MAX_VALUE`]. The counter is left unchanged in that case.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<u32, CounterValueError> {
        self.value = self
            .value
            .checked_add(1)
            .ok_or_else(|| CounterValueError::Overflow {
                name: self.name.to_string(),
                value: self.value,
            })?;
        self.updated_at = now;
        Ok(self.value)
    }

    /// Value as stored in a signed 64-bit column.
    #[must_use]
    pub fn stored_value(&self) -> i64 {
        i64::from(self.value)
    }
}
