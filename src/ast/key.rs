/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Public keys, kept opaque. Parsing and rendering delegate to
//! [tezos_crypto_rs]; only the curve dispatch lives here.

use tezos_crypto_rs::base58::{FromBase58Check, FromBase58CheckError};
use tezos_crypto_rs::hash::{
    HashTrait, HashType, PublicKeyBls, PublicKeyEd25519, PublicKeyP256, PublicKeySecp256k1,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Ed25519(PublicKeyEd25519),
    Secp256k1(PublicKeySecp256k1),
    P256(PublicKeyP256),
    Bls(PublicKeyBls),
}

impl Key {
    /// Conversion from a base58check string (with prefix).
    pub fn from_b58check(data: &str) -> Result<Self, FromBase58CheckError> {
        use Key::*;
        let bytes = data.from_base58check()?;
        Ok(
            if bytes.starts_with(HashType::PublicKeyEd25519.base58check_prefix()) {
                Ed25519(HashTrait::from_b58check(data)?)
            } else if bytes.starts_with(HashType::PublicKeySecp256k1.base58check_prefix()) {
                Secp256k1(HashTrait::from_b58check(data)?)
            } else if bytes.starts_with(HashType::PublicKeyP256.base58check_prefix()) {
                P256(HashTrait::from_b58check(data)?)
            } else if bytes.starts_with(HashType::PublicKeyBls.base58check_prefix()) {
                Bls(HashTrait::from_b58check(data)?)
            } else {
                return Err(FromBase58CheckError::InvalidBase58);
            },
        )
    }

    /// Conversion to the base58check string (with prefix).
    pub fn to_b58check(&self) -> String {
        use Key::*;
        match self {
            Ed25519(k) => k.to_b58check(),
            Secp256k1(k) => k.to_b58check(),
            P256(k) => k.to_b58check(),
            Bls(k) => k.to_b58check(),
        }
    }

    /// Read the optimized form: a curve tag byte followed by the raw key.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        use Key::*;
        let (tag, key) = bytes.split_first()?;
        Some(match tag {
            0 => Ed25519(HashTrait::try_from_bytes(key).ok()?),
            1 => Secp256k1(HashTrait::try_from_bytes(key).ok()?),
            2 => P256(HashTrait::try_from_bytes(key).ok()?),
            3 => Bls(HashTrait::try_from_bytes(key).ok()?),
            _ => return None,
        })
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_b58check())
    }
}

impl TryFrom<&str> for Key {
    type Error = FromBase58CheckError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_b58check(value)
    }
}
