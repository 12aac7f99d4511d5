/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Micheline codec: lossless JSON and binary (de)serialization of the
//! tagged-tree format, typed rendering of (type, value) pairs into labeled
//! maps, entrypoint resolution over annotated `or` trees, and the
//! entrypoint-wrapped call envelope.

#![warn(clippy::redundant_clone)]

pub mod ast;
pub mod entrypoints;
pub mod error;
mod json;
pub mod parameters;
pub mod prim;
pub mod serializer;
pub mod typ;
pub mod value;

pub use ast::{
    Address, AddressHash, Annotation, Annotations, Key, Micheline, Node, Signature,
};
pub use entrypoints::{Entrypoint, Entrypoints};
pub use error::{Error, Result};
pub use parameters::Parameters;
pub use prim::{Prim, PrimKind};
pub use typ::Type;
pub use value::{Render, Value, MAX_DEPTH};
