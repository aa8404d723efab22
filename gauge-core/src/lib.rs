//! Gauge Core - Fundamental types
//!
//! This crate provides the pieces shared by the unit engine and its front ends:
//! - `Status`: outcome codes carried by units and converters
//! - `Diagnostic`: structured error reports for service consumers
//! - `format_general`: `%g`-style rendering of reals
//! - calendar helpers for timestamps counted from 2001-01-01 UTC

mod calendar;
mod error;
mod number;
mod status;

pub use calendar::{
    days_in_month, decode_time, encode_time, is_leap_year, CivilTime, DateTimeError,
};
pub use error::{Diagnostic, Severity};
pub use number::{format_general, format_real, DEFAULT_PRECISION};
pub use status::Status;
