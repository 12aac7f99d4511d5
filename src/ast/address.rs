/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Addresses, as the opaque collaborator type the walker and accessors hand
//! out. All encoding is delegated to [tezos_crypto_rs]; this module only
//! dispatches between the hash variants and splits off the `%entrypoint`
//! suffix.

use tezos_crypto_rs::base58::{FromBase58Check, FromBase58CheckError};
use tezos_crypto_rs::hash::{
    ContractKt1Hash, ContractTz1Hash, ContractTz2Hash, ContractTz3Hash, ContractTz4Hash,
    HashTrait, HashType, SmartRollupHash,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressHash {
    Tz1(ContractTz1Hash),
    Tz2(ContractTz2Hash),
    Tz3(ContractTz3Hash),
    Tz4(ContractTz4Hash),
    Kt1(ContractKt1Hash),
    Sr1(SmartRollupHash),
}

impl AddressHash {
    /// Conversion from a base58check string (with prefix).
    pub fn from_b58check(data: &str) -> Result<Self, FromBase58CheckError> {
        use AddressHash::*;
        let bytes = data.from_base58check()?;
        Ok(
            if bytes.starts_with(HashType::ContractTz1Hash.base58check_prefix()) {
                Tz1(HashTrait::from_b58check(data)?)
            } else if bytes.starts_with(HashType::ContractTz2Hash.base58check_prefix()) {
                Tz2(HashTrait::from_b58check(data)?)
            } else if bytes.starts_with(HashType::ContractTz3Hash.base58check_prefix()) {
                Tz3(HashTrait::from_b58check(data)?)
            } else if bytes.starts_with(HashType::ContractTz4Hash.base58check_prefix()) {
                Tz4(HashTrait::from_b58check(data)?)
            } else if bytes.starts_with(HashType::ContractKt1Hash.base58check_prefix()) {
                Kt1(HashTrait::from_b58check(data)?)
            } else if bytes.starts_with(HashType::SmartRollupHash.base58check_prefix()) {
                Sr1(HashTrait::from_b58check(data)?)
            } else {
                return Err(FromBase58CheckError::InvalidBase58);
            },
        )
    }

    /// Conversion to the base58check string (with prefix).
    pub fn to_b58check(&self) -> String {
        use AddressHash::*;
        match self {
            Tz1(h) => h.to_b58check(),
            Tz2(h) => h.to_b58check(),
            Tz3(h) => h.to_b58check(),
            Tz4(h) => h.to_b58check(),
            Kt1(h) => h.to_b58check(),
            Sr1(h) => h.to_b58check(),
        }
    }

    /// Read the optimized form: `0x00` + curve tag + hash for implicit
    /// accounts, `0x01`/`0x03` + hash + `0x00` padding for originated
    /// contracts and rollups.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        use AddressHash::*;
        let (tag, rest) = bytes.split_first()?;
        Some(match tag {
            0 => {
                let (curve, h) = rest.split_first()?;
                match curve {
                    0 => Tz1(HashTrait::try_from_bytes(h).ok()?),
                    1 => Tz2(HashTrait::try_from_bytes(h).ok()?),
                    2 => Tz3(HashTrait::try_from_bytes(h).ok()?),
                    3 => Tz4(HashTrait::try_from_bytes(h).ok()?),
                    _ => return None,
                }
            }
            1 => Kt1(HashTrait::try_from_bytes(rest.strip_suffix(&[0])?).ok()?),
            3 => Sr1(HashTrait::try_from_bytes(rest.strip_suffix(&[0])?).ok()?),
            _ => return None,
        })
    }
}

impl std::fmt::Display for AddressHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_b58check())
    }
}

/// An address together with the entrypoint suffix, the part after `%` in
/// `KT1BRd2ka5q2cPRdXALtXD1QZ38CPam2j1ye%foo`. An empty suffix means the
/// default entrypoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub hash: AddressHash,
    entrypoint: String,
}

impl Address {
    pub fn new(hash: AddressHash, entrypoint: &str) -> Self {
        Address {
            hash,
            // the two spellings of the default entrypoint coincide
            entrypoint: if entrypoint == "default" {
                String::new()
            } else {
                entrypoint.to_owned()
            },
        }
    }

    /// The entrypoint name, `"default"` when none was given.
    pub fn entrypoint(&self) -> &str {
        if self.entrypoint.is_empty() {
            "default"
        } else {
            &self.entrypoint
        }
    }

    pub fn from_b58check(data: &str) -> Result<Self, FromBase58CheckError> {
        let (hash, ep) = match data.find('%') {
            Some(pos) => (&data[..pos], &data[pos + 1..]),
            None => (data, ""),
        };
        Ok(Address::new(AddressHash::from_b58check(hash)?, ep))
    }

    pub fn to_b58check(&self) -> String {
        if self.entrypoint.is_empty() {
            self.hash.to_b58check()
        } else {
            format!("{}%{}", self.hash.to_b58check(), self.entrypoint)
        }
    }

    /// Read the optimized form: a 22-byte address, optionally followed by
    /// the entrypoint name.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        const HASH_BYTES: usize = 22;
        if bytes.len() < HASH_BYTES {
            return None;
        }
        let (hash, ep) = bytes.split_at(HASH_BYTES);
        Some(Address::new(
            AddressHash::from_bytes(hash)?,
            std::str::from_utf8(ep).ok()?,
        ))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_b58check())
    }
}

impl TryFrom<&str> for Address {
    type Error = FromBase58CheckError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_b58check(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // optimized representations produced with
    // `octez-client --mode mockup normalize data ... of type address
    //  --unparsing-mode Optimized`
    const FIXTURES: &[(&str, &str)] = &[
        (
            "tz1WrbkDrzKVqcGXkjw4Qk4fXkjXpAJuNP1j",
            "00007b09f782e0bcd67739510afa819d85976119d5ef",
        ),
        (
            "tz1WrbkDrzKVqcGXkjw4Qk4fXkjXpAJuNP1j%bar",
            "00007b09f782e0bcd67739510afa819d85976119d5ef626172",
        ),
        (
            "tz3UoffC7FG7zfpmvmjUmUeAaHvzdcUvAj6r",
            "00025cfa532f50de3e12befc0ad21603835dd7698d35",
        ),
        (
            "KT1BRd2ka5q2cPRdXALtXD1QZ38CPam2j1ye",
            "011f2d825fdd9da219235510335e558520235f4f5400",
        ),
        (
            "KT1BRd2ka5q2cPRdXALtXD1QZ38CPam2j1ye%foo",
            "011f2d825fdd9da219235510335e558520235f4f5400666f6f",
        ),
        (
            "sr1RYurGZtN8KNSpkMcCt9CgWeUaNkzsAfXf",
            "03d601f22256d2ad1faec0c64374e527c6e62f2e5a00",
        ),
    ];

    #[test]
    fn b58check_round_trip() {
        for (b58, _) in FIXTURES {
            assert_eq!(&Address::from_b58check(b58).unwrap().to_b58check(), b58);
        }
    }

    #[test]
    fn optimized_to_readable() {
        for (b58, hex) in FIXTURES {
            assert_eq!(
                &Address::from_bytes(&hex::decode(hex).unwrap())
                    .unwrap()
                    .to_b58check(),
                b58,
            );
        }
    }

    #[test]
    fn default_entrypoint_spellings_coincide() {
        let plain = Address::from_b58check("tz1WrbkDrzKVqcGXkjw4Qk4fXkjXpAJuNP1j").unwrap();
        let spelled =
            Address::from_b58check("tz1WrbkDrzKVqcGXkjw4Qk4fXkjXpAJuNP1j%default").unwrap();
        assert_eq!(plain, spelled);
        assert_eq!(plain.entrypoint(), "default");
    }

    #[test]
    fn rejects_junk() {
        assert!(Address::from_b58check("junk").is_err());
        assert!(Address::from_bytes(&[0xff; 22]).is_none());
        assert!(Address::from_bytes(&[0x00; 4]).is_none());
    }
}
