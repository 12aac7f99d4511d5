/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! The standard Micheline JSON form: `{"int": …}`, `{"string": …}`,
//! `{"bytes": …}`, arrays for sequences, and `{"prim": …, "args": …,
//! "annots": …}` applications with empty fields omitted.

use std::str::FromStr;

use num_bigint::BigInt;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};

use crate::ast::annotations::{Annotation, Annotations};
use crate::ast::{Micheline, Node};
use crate::error::{Error, Result};
use crate::prim::Prim;

impl Micheline {
    /// Render to the standard Micheline JSON document.
    pub fn to_json(&self) -> Json {
        match &self.node {
            Node::Int(n) => {
                let mut m = Map::new();
                m.insert("int".to_owned(), Json::String(n.to_string()));
                Json::Object(m)
            }
            Node::String(s) => {
                let mut m = Map::new();
                m.insert("string".to_owned(), Json::String(s.clone()));
                Json::Object(m)
            }
            Node::Bytes(b) => {
                let mut m = Map::new();
                m.insert("bytes".to_owned(), Json::String(hex::encode(b)));
                Json::Object(m)
            }
            Node::Seq(elts) => Json::Array(elts.iter().map(Micheline::to_json).collect()),
            Node::App(prim, args, anns) => {
                let mut m = Map::new();
                m.insert("prim".to_owned(), Json::String(prim.to_string()));
                if !args.is_empty() {
                    m.insert(
                        "args".to_owned(),
                        Json::Array(args.iter().map(Micheline::to_json).collect()),
                    );
                }
                if !anns.is_empty() {
                    m.insert(
                        "annots".to_owned(),
                        Json::Array(
                            anns.iter()
                                .map(|a| Json::String(a.to_string()))
                                .collect(),
                        ),
                    );
                }
                Json::Object(m)
            }
        }
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Parse a node from its JSON document.
    pub fn from_json(v: &Json) -> Result<Micheline> {
        match v {
            Json::Array(elts) => Ok(Micheline::seq(
                elts.iter().map(Micheline::from_json).collect::<Result<_>>()?,
            )),
            Json::Object(obj) => from_json_object(obj),
            other => Err(Error::Json(format!("unexpected micheline json: {other}"))),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Micheline> {
        Micheline::from_json(&serde_json::from_str(s)?)
    }
}

fn from_json_object(obj: &Map<String, Json>) -> Result<Micheline> {
    if let Some(v) = obj.get("int") {
        return match v {
            Json::String(s) => Ok(Micheline::int(
                BigInt::from_str(s).map_err(|_| Error::MalformedInt)?,
            )),
            // tolerated, though the wire form is always a string
            Json::Number(n) => Ok(Micheline::int(
                BigInt::from_str(&n.to_string()).map_err(|_| Error::MalformedInt)?,
            )),
            _ => Err(Error::MalformedInt),
        };
    }
    if let Some(v) = obj.get("string") {
        return match v {
            Json::String(s) => Ok(Micheline::string(s.clone())),
            _ => Err(Error::InvalidString(v.to_string())),
        };
    }
    if let Some(v) = obj.get("bytes") {
        return match v {
            Json::String(s) => Ok(Micheline::bytes(
                hex::decode(s).map_err(|_| Error::InvalidString(s.clone()))?,
            )),
            _ => Err(Error::InvalidString(v.to_string())),
        };
    }
    if let Some(v) = obj.get("prim") {
        let name = v
            .as_str()
            .ok_or_else(|| Error::Json(format!("prim name must be a string, got {v}")))?;
        let prim =
            Prim::from_str(name).map_err(|_| Error::UnknownOpCode(name.to_owned()))?;
        let args = match obj.get("args") {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(elts)) => elts
                .iter()
                .map(Micheline::from_json)
                .collect::<Result<_>>()?,
            Some(other) => {
                return Err(Error::Json(format!("prim args must be an array, got {other}")))
            }
        };
        let anns = match obj.get("annots") {
            None | Some(Json::Null) => Annotations::new(),
            Some(Json::Array(elts)) => elts
                .iter()
                .map(|a| match a {
                    Json::String(s) => Annotation::parse(s),
                    other => Err(Error::InvalidAnnotation(other.to_string())),
                })
                .collect::<Result<Annotations>>()?,
            Some(other) => {
                return Err(Error::Json(format!(
                    "prim annots must be an array, got {other}"
                )))
            }
        };
        return Ok(Micheline::app(prim, args, anns));
    }
    Err(Error::Json("unrecognized micheline object".to_owned()))
}

impl Serialize for Micheline {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Micheline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let v = Json::deserialize(deserializer)?;
        Micheline::from_json(&v).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::micheline::test_helpers::{app, seq};

    #[track_caller]
    fn check(v: impl Into<Micheline>, json: &str) {
        let v = v.into();
        assert_eq!(v.to_json_string(), json);
        assert_eq!(Micheline::from_json_str(json), Ok(v));
    }

    fn ann(s: &str) -> Annotation {
        Annotation::parse(s).unwrap()
    }

    #[test]
    fn literals() {
        check(42, r#"{"int":"42"}"#);
        check(-7, r#"{"int":"-7"}"#);
        check("abc", r#"{"string":"abc"}"#);
        check(
            hex::decode("001234abff").unwrap(),
            r#"{"bytes":"001234abff"}"#,
        );
    }

    #[test]
    fn applications() {
        check(app!(Unit), r#"{"prim":"Unit"}"#);
        check(
            app!(pair[app!(int), app!(string)]),
            r#"{"prim":"pair","args":[{"prim":"int"},{"prim":"string"}]}"#,
        );
        check(
            app!(Pair[1, "x"]),
            r#"{"prim":"Pair","args":[{"int":"1"},{"string":"x"}]}"#,
        );
    }

    #[test]
    fn sequences() {
        check(seq! {}, "[]");
        check(seq! {1; 2}, r#"[{"int":"1"},{"int":"2"}]"#);
    }

    #[test]
    fn annotations_round_trip() {
        check(
            Micheline::app(
                Prim::or,
                vec![
                    Micheline::app(Prim::unit, vec![], [ann("%a")].into()),
                    Micheline::app(Prim::unit, vec![], [ann("%b"), ann(":t")].into()),
                ],
                [ann("@root")].into(),
            ),
            r#"{"prim":"or","args":[{"prim":"unit","annots":["%a"]},{"prim":"unit","annots":["%b",":t"]}],"annots":["@root"]}"#,
        );
    }

    #[test]
    fn missing_args_mean_empty() {
        assert_eq!(
            Micheline::from_json_str(r#"{"prim":"unit"}"#),
            Ok(app!(unit))
        );
    }

    #[test]
    fn unknown_prim_name_fails() {
        assert_eq!(
            Micheline::from_json_str(r#"{"prim":"frobnicate"}"#),
            Err(Error::UnknownOpCode("frobnicate".to_owned()))
        );
    }

    #[test]
    fn non_decimal_int_fails() {
        assert_eq!(
            Micheline::from_json_str(r#"{"int":"0x2a"}"#),
            Err(Error::MalformedInt)
        );
    }

    #[test]
    fn big_int_survives() {
        let big = "123456789123456789123456789123456789";
        let m = Micheline::from_json_str(&format!(r#"{{"int":"{big}"}}"#)).unwrap();
        assert_eq!(m.to_json_string(), format!(r#"{{"int":"{big}"}}"#));
    }

    #[test]
    fn cross_format_equivalence() {
        let v = app!(Pair[
            1,
            app!(Some[Micheline::app(
                Prim::int,
                vec![],
                [ann("%n")].into()
            )])
        ]);
        let via_binary = Micheline::decode(&v.encode()).unwrap();
        let via_json = Micheline::from_json_str(&v.to_json_string()).unwrap();
        assert_eq!(via_binary, via_json);
    }
}
