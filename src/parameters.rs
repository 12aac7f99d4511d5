/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! The call envelope wrapping an entrypoint name and a value, in the wire
//! layout introduced with the v005 transaction format.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};

use crate::ast::Micheline;
use crate::entrypoints::{Entrypoint, Entrypoints};
use crate::error::{Error, Result};
use crate::prim::Prim;
use crate::serializer::{with_patchback_len, BytesIt};
use crate::typ::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub entrypoint: String,
    pub value: Micheline,
}

// Entrypoint tag bytes of the long form.
const EP_DEFAULT: u8 = 0x00;
const EP_ROOT: u8 = 0x01;
const EP_DO: u8 = 0x02;
const EP_SET_DELEGATE: u8 = 0x03;
const EP_REMOVE_DELEGATE: u8 = 0x04;
const EP_NAMED: u8 = 0xff;

impl Parameters {
    pub fn new(entrypoint: impl Into<String>, value: Micheline) -> Self {
        Parameters {
            entrypoint: entrypoint.into(),
            value,
        }
    }

    /// A call of the default entrypoint with a `Unit` argument, the shape of
    /// a plain transfer.
    pub fn unit() -> Self {
        Parameters {
            entrypoint: String::new(),
            value: Micheline::prim0(Prim::Unit),
        }
    }

    pub fn encode_binary(&self) -> Result<Vec<u8>> {
        // the 1-byte short form
        if self.entrypoint.is_empty() && self.value.opcode() == Some(Prim::Unit) {
            return Ok(vec![EP_DEFAULT]);
        }
        let mut out = vec![0x01];
        match self.entrypoint.as_str() {
            "" | "default" => out.push(EP_DEFAULT),
            "root" => out.push(EP_ROOT),
            "do" => out.push(EP_DO),
            "set_delegate" => out.push(EP_SET_DELEGATE),
            "remove_delegate" => out.push(EP_REMOVE_DELEGATE),
            name => {
                if name.len() > u8::MAX as usize || name.contains('\0') {
                    return Err(Error::InvalidEntrypoint(name.to_owned()));
                }
                out.push(EP_NAMED);
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
            }
        }
        with_patchback_len(&mut out, |out| self.value.encode_into(out));
        Ok(out)
    }

    pub fn decode_binary(data: &[u8]) -> Result<Parameters> {
        match data.first() {
            None => Err(Error::ShortBuffer),
            Some(&EP_DEFAULT) if data.len() == 1 => Ok(Parameters {
                entrypoint: "default".to_owned(),
                value: Micheline::prim0(Prim::Unit),
            }),
            Some(0x01) => {
                let mut it: BytesIt = data[1..].into();
                let entrypoint = match it.next().ok_or(Error::ShortBuffer)? {
                    EP_DEFAULT => "default".to_owned(),
                    EP_ROOT => "root".to_owned(),
                    EP_DO => "do".to_owned(),
                    EP_SET_DELEGATE => "set_delegate".to_owned(),
                    EP_REMOVE_DELEGATE => "remove_delegate".to_owned(),
                    EP_NAMED => {
                        let len = it.next().ok_or(Error::ShortBuffer)?;
                        let raw = it.take(len as usize).ok_or(Error::ShortBuffer)?;
                        String::from_utf8(raw.to_vec()).map_err(|_| {
                            Error::InvalidEntrypoint(format!("0x{}", hex::encode(raw)))
                        })?
                    }
                    b => return Err(Error::InvalidTag(b)),
                };
                let len = u32::from_be_bytes(
                    it.take(4).ok_or(Error::ShortBuffer)?.try_into().unwrap(),
                ) as usize;
                let raw = it.take(len).ok_or(Error::ShortBuffer)?;
                let value = Micheline::decode_buffer(&mut raw.into(), false)?;
                Ok(Parameters { entrypoint, value })
            }
            Some(&b) => Err(Error::InvalidTag(b)),
        }
    }

    pub fn to_json(&self) -> Json {
        if self.entrypoint.is_empty()
            || (self.entrypoint == "default" && self.value.opcode() == Some(Prim::Unit))
        {
            return self.value.to_json();
        }
        let mut m = Map::new();
        m.insert(
            "entrypoint".to_owned(),
            Json::String(self.entrypoint.clone()),
        );
        m.insert("value".to_owned(), self.value.to_json());
        Json::Object(m)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Parse the canonical `{"entrypoint", "value"}` form, a bare prim, or
    /// the legacy array form; the latter two imply the default entrypoint.
    pub fn from_json(v: &Json) -> Result<Parameters> {
        if let Json::Object(obj) = v {
            if let (Some(ep), Some(value)) = (obj.get("entrypoint"), obj.get("value")) {
                let entrypoint = ep
                    .as_str()
                    .ok_or_else(|| {
                        Error::Json(format!("entrypoint must be a string, got {ep}"))
                    })?
                    .to_owned();
                return Ok(Parameters {
                    entrypoint,
                    value: Micheline::from_json(value)?,
                });
            }
        }
        Ok(Parameters {
            entrypoint: "default".to_owned(),
            value: Micheline::from_json(v)?,
        })
    }

    pub fn from_json_str(s: &str) -> Result<Parameters> {
        Parameters::from_json(&serde_json::from_str(s)?)
    }

    /// Route this call to an entrypoint of `typ` and peel the branch
    /// wrappers off the value.
    pub fn map_entrypoint(&self, typ: &Type) -> Result<(Entrypoint, Micheline)> {
        let eps = typ.entrypoints(true);
        let unknown = || Error::UnknownEntrypoint(self.entrypoint.clone());

        match self.entrypoint.as_str() {
            "default" => {
                // rebase on the path of the named default entrypoint, if any
                let prefix = typ.search_entrypoint_name("default").unwrap_or_default();
                let branch = self.branch(&prefix, &eps);
                match eps.find_branch(&branch) {
                    Some(ep) => {
                        let sub = ep.branch.strip_prefix(&prefix).unwrap_or(&ep.branch);
                        let sub = sub.to_owned();
                        Ok((ep.clone(), self.unwrap_branch(&sub)))
                    }
                    None => {
                        let ep = eps.find_id(0).ok_or_else(unknown)?;
                        Ok((ep.clone(), self.value.clone()))
                    }
                }
            }
            "" | "root" => {
                // derive the branch purely from the value's wrappers
                let branch = self.branch("", &eps);
                let ep = eps
                    .find_branch(&branch)
                    .or_else(|| eps.find_id(0))
                    .ok_or_else(unknown)?;
                Ok((ep.clone(), self.unwrap_branch(&ep.branch.clone())))
            }
            name => {
                if let Some(ep) = eps.get(name) {
                    return Ok((ep.clone(), self.value.clone()));
                }
                // the call may extend an annotated branch with further
                // Left/Right wrappers inside the value
                let prefix = typ.search_entrypoint_name(name).ok_or_else(unknown)?;
                let branch = self.branch(&prefix, &eps);
                let ep = eps.find_branch(&branch).ok_or_else(unknown)?;
                let sub = ep
                    .branch
                    .strip_prefix(&prefix)
                    .unwrap_or(&ep.branch)
                    .to_owned();
                Ok((ep.clone(), self.unwrap_branch(&sub)))
            }
        }
    }

    /// The branch string of this call: `prefix` extended with one `/L` or
    /// `/R` per `Left`/`Right` wrapper of the value, stopping early at a
    /// known entrypoint.
    pub fn branch(&self, prefix: &str, eps: &Entrypoints) -> String {
        let mut node = &self.value;
        let mut branch = prefix.to_owned();
        loop {
            match node.opcode() {
                Some(Prim::Left) => branch.push_str("/L"),
                Some(Prim::Right) => branch.push_str("/R"),
                _ => break,
            }
            node = match node.args().first() {
                Some(n) => n,
                None => break,
            };
            if eps.find_branch(&branch).is_some() {
                break;
            }
        }
        branch
    }

    /// Peel the `Left`/`Right` wrappers named by `branch` off the value.
    pub fn unwrap_branch(&self, branch: &str) -> Micheline {
        let mut node = &self.value;
        for seg in branch.split('/') {
            if !matches!(seg, "L" | "R") {
                continue;
            }
            match node.args().first() {
                Some(inner) if matches!(node.opcode(), Some(Prim::Left | Prim::Right)) => {
                    node = inner
                }
                _ => break,
            }
        }
        node.clone()
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let v = Json::deserialize(deserializer)?;
        Parameters::from_json(&v).map_err(de::Error::custom)
    }
}
