/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

pub mod address;
pub mod annotations;
pub mod key;
pub mod micheline;
pub mod signature;

pub use address::{Address, AddressHash};
pub use annotations::{Annotation, Annotations};
pub use key::Key;
pub use micheline::{Micheline, Node};
pub use signature::Signature;
