//! Core types for seqctr.
//!
//! This crate provides the store-independent types used throughout the workspace:
//!
//! - **Names**: `CounterName`, a validated counter identifier
//! - **Counters**: `Counter`, the in-memory image of one persisted counter row
//! - **Errors**: `NameError`, `CounterValueError`
//!
//! # Counter Values
//!
//! Values are `u32`. A new counter starts at 0 and every committed increment
//! moves it forward by exactly 1, so the committed sequence reads 1, 2, 3, ...
//! with no gaps. Persistence (and the locking that keeps the sequence gapless)
//! lives in `seqctr-store`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod counter;
pub mod error;
pub mod name;

pub use counter::{Counter, MAX_VALUE};
pub use error::{CounterValueError, NameError};
pub use name::{CounterName, MAX_NAME_LEN};
