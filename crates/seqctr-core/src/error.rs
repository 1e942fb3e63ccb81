//! Error types for seqctr core types.

/// Errors raised when a string is not a valid counter name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The name is empty.
    #[error("counter name is empty")]
    Empty,

    /// The name exceeds the maximum length.
    #[error("counter name is {len} bytes, maximum is {max}")]
    TooLong {
        /// Length of the rejected name in bytes.
        len: usize,
        /// Maximum allowed length in bytes.
        max: usize,
    },

    /// The name contains a NUL or other control character.
    #[error("counter name contains a control character at byte {index}")]
    ControlCharacter {
        /// Byte offset of the offending character.
        index: usize,
    },
}

/// Errors raised when a counter value leaves the `u32` domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterValueError {
    /// Incrementing would exceed `u32::MAX`.
    #[error("counter {name} is exhausted at {value}")]
    Overflow {
        /// The counter that overflowed.
        name: String,
        /// The value it holds.
        value: u32,
    },

    /// A stored value does not fit in a `u32`.
    #[error("counter {name} holds out-of-range value {value}")]
    OutOfRange {
        /// The counter whose row was rejected.
        name: String,
        /// The raw stored value.
        value: i64,
    },
}
