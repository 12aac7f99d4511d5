/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! The crate-wide error taxonomy. All codec failures are reported through
//! [Error]; nothing in the library panics on malformed input.

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid binary shape tag: 0x{0:02x}")]
    InvalidTag(u8),
    #[error("unknown primitive: {0}")]
    UnknownOpCode(String),
    #[error("unexpected end of input")]
    ShortBuffer,
    #[error("invalid annotation: {0:?}")]
    InvalidAnnotation(String),
    #[error("malformed string: {0}")]
    InvalidString(String),
    #[error("unknown entrypoint: {0:?}")]
    UnknownEntrypoint(String),
    #[error("invalid entrypoint name: {0:?}")]
    InvalidEntrypoint(String),
    #[error("type mismatch: value {value} does not fit type {typ}")]
    TypeMismatch { typ: String, value: String },
    #[error("maximum nesting depth exceeded")]
    MaxDepth,
    #[error("malformed integer")]
    MalformedInt,
    #[error("json: {0}")]
    Json(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}
