//! Engine status codes
//!
//! Every operation of the unit engine reports its outcome through one of
//! these codes. They travel inside invalid units and converters instead of
//! being raised, so a caller can check once at the end of a chain.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of an engine operation (machine-readable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    #[error("success")]
    Success,

    #[error("bad argument")]
    BadArgument,

    #[error("identifier or unit already exists")]
    Exists,

    #[error("no such unit")]
    NoUnit,

    #[error("operating-system error")]
    OsError,

    #[error("units belong to different unit-systems")]
    NotSameSystem,

    #[error("operation on the unit(s) is meaningless")]
    Meaningless,

    #[error("unit-system doesn't have a unit named \"second\"")]
    NoSecond,

    #[error("unit can't be formatted")]
    CantFormat,

    #[error("syntax error in unit expression")]
    SyntaxError,

    #[error("unknown identifier in unit expression")]
    UnknownIdentifier,

    #[error("can't open argument-specified unit database")]
    OpenArgument,

    #[error("can't open environment-specified unit database")]
    OpenEnvironment,

    #[error("can't open installed, default unit database")]
    OpenDefault,

    #[error("error parsing unit database")]
    ParseError,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Stable upper-case code used at service boundaries
    pub fn code(self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::BadArgument => "BAD_ARG",
            Status::Exists => "EXISTS",
            Status::NoUnit => "NO_UNIT",
            Status::OsError => "OS",
            Status::NotSameSystem => "NOT_SAME_SYSTEM",
            Status::Meaningless => "MEANINGLESS",
            Status::NoSecond => "NO_SECOND",
            Status::CantFormat => "CANT_FORMAT",
            Status::SyntaxError => "SYNTAX",
            Status::UnknownIdentifier => "UNKNOWN",
            Status::OpenArgument => "OPEN_ARG",
            Status::OpenEnvironment => "OPEN_ENV",
            Status::OpenDefault => "OPEN_DEFAULT",
            Status::ParseError => "PARSE",
        }
    }
}
