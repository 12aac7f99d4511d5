/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Signatures, kept opaque behind [tezos_crypto_rs] types. Raw signature
//! bytes are untagged, so the 64-byte forms can only be read back
//! generically; 96 bytes means BLS.

use tezos_crypto_rs::base58::FromBase58CheckError;
use tezos_crypto_rs::hash::{BlsSignature, HashTrait, UnknownSignature};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// An `edsig`/`spsig1`/`p2sig`/`sig` form, 64 bytes.
    Generic(UnknownSignature),
    /// A `BLsig` form, 96 bytes.
    Bls(BlsSignature),
}

impl Signature {
    /// Conversion from a base58check string (with prefix).
    pub fn from_b58check(data: &str) -> Result<Self, FromBase58CheckError> {
        if data.starts_with("BLsig") {
            Ok(Signature::Bls(HashTrait::from_b58check(data)?))
        } else {
            Ok(Signature::Generic(UnknownSignature::from_base58_check(data)?))
        }
    }

    /// Conversion to the base58check string (with prefix).
    pub fn to_b58check(&self) -> String {
        match self {
            Signature::Generic(s) => s.to_base58_check(),
            Signature::Bls(s) => s.to_b58check(),
        }
    }

    /// Read raw signature bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            64 => Some(Signature::Generic(HashTrait::try_from_bytes(bytes).ok()?)),
            96 => Some(Signature::Bls(HashTrait::try_from_bytes(bytes).ok()?)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_b58check())
    }
}

impl TryFrom<&str> for Signature {
    type Error = FromBase58CheckError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_b58check(value)
    }
}
