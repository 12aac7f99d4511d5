/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Serialization to and deserialization from the compact binary form. Covers
//! the `PACK`/`UNPACK` byte layout and general-purpose Micheline wire data.
//!
//! Functions are defined as associated functions on [crate::ast::Micheline].

pub mod constants;
mod decode;
mod encode;

pub(crate) use decode::BytesIt;
pub(crate) use encode::with_patchback_len;
