/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Typed rendering of Micheline values.
//!
//! A [Value] binds a type expression to a payload and renders the pair as a
//! labeled mapping: field annotations become keys, containers become nested
//! maps and arrays, scalars decode through their type (addresses and keys to
//! base58, timestamps to RFC 3339, big numbers to JSON numbers or decimal
//! strings). Comb pairs are flattened through an explicit value stack, so
//! the type tree and the value tree may disagree on pairing arity.

use std::cell::OnceCell;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as Json};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::ast::annotations::Annotations;
use crate::ast::{Address, Key, Micheline, Node, Signature};
use crate::error::{Error, Result};
use crate::prim::Prim;
use crate::typ::{ticket_type, Type};

/// Recursion bound of the walker. Hard, not configurable.
pub const MAX_DEPTH: usize = 99;

/// What [Value::map] does when the type and the value disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Render {
    /// Log an error marker and fall back to the raw prim tree.
    #[default]
    Prim,
    /// Report the error.
    Fail,
    /// Abort. Meant for tests only.
    Panic,
}

/// A type expression bound to a concrete payload.
#[derive(Debug, Clone)]
pub struct Value {
    pub typ: Type,
    pub value: Micheline,
    pub render: Render,
    mapped: OnceCell<Json>,
}

impl Value {
    pub fn new(typ: Type, value: Micheline) -> Self {
        Value {
            typ,
            value,
            render: Render::default(),
            mapped: OnceCell::new(),
        }
    }

    pub fn with_render(mut self, render: Render) -> Self {
        self.render = render;
        self
    }

    /// Replace the payload from its binary form.
    pub fn decode(&mut self, buf: &[u8]) -> Result<()> {
        self.value = Micheline::decode(buf)?;
        self.mapped = OnceCell::new();
        Ok(())
    }

    pub fn is_packed(&self) -> bool {
        self.value.is_packed()
    }

    pub fn is_packed_any(&self) -> bool {
        self.value.is_packed_any()
    }

    pub fn unpack(&self) -> Result<Value> {
        Ok(Value {
            typ: self.typ.clone(),
            value: self.value.unpack()?,
            render: self.render,
            mapped: OnceCell::new(),
        })
    }

    pub fn unpack_all(&self) -> Result<Value> {
        Ok(Value {
            typ: self.typ.clone(),
            value: self.value.unpack_all()?,
            render: self.render,
            mapped: OnceCell::new(),
        })
    }

    /// Re-derive the type from the payload, keeping the labels of the
    /// current type root.
    pub fn fix_type(&mut self) {
        let anns: Annotations = self.typ.prim().anns().to_vec().into();
        let mut typ = self.value.build_type();
        typ.0.set_anns(anns);
        self.typ = typ;
        self.mapped = OnceCell::new();
    }

    /// The labeled mapping for this (type, value) pair. The result is
    /// memoized per [Value]; repeated calls are cheap and yield the same
    /// object.
    ///
    /// On a walk failure the [Render] policy applies: [Render::Prim]
    /// memoizes the raw prim tree instead, [Render::Fail] reports the
    /// error, [Render::Panic] aborts.
    pub fn map(&self) -> Result<&Json> {
        if let Some(m) = self.mapped.get() {
            return Ok(m);
        }
        match self.render_map() {
            Ok(m) => Ok(self.mapped.get_or_init(|| m)),
            Err(err) => match self.render {
                Render::Prim => {
                    tracing::error!(
                        error = %err,
                        value = %self.value.to_json_string(),
                        "rendering raw prim tree instead of labeled map"
                    );
                    Ok(self.mapped.get_or_init(|| self.value.to_json()))
                }
                Render::Fail => Err(err),
                Render::Panic => panic!("micheline: {err}"),
            },
        }
    }

    fn render_map(&self) -> Result<Json> {
        let mut m = Map::new();
        let mut stack = WalkStack::new(self.value.clone());
        walk_tree(&mut m, None, self.typ.clone(), &mut stack, 0)?;

        // lift a lone anonymous entry to a scalar
        if m.len() == 1 && m.contains_key("0") {
            return Ok(m.remove("0").unwrap());
        }
        Ok(Json::Object(m))
    }

    /// Look a rendered value up by its slash-delimited label path, e.g.
    /// `"ledger/0/balance"`.
    pub fn get_value(&self, label: &str) -> Option<&Json> {
        get_path(self.map().ok()?, label)
    }

    pub fn get_string(&self, label: &str) -> Option<String> {
        match self.get_value(label)? {
            Json::String(s) => Some(s.clone()),
            Json::Number(n) => Some(n.to_string()),
            Json::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_bytes(&self, label: &str) -> Option<Vec<u8>> {
        match self.get_value(label)? {
            Json::String(s) => hex::decode(s).ok(),
            _ => None,
        }
    }

    pub fn get_int64(&self, label: &str) -> Option<i64> {
        match self.get_value(label)? {
            Json::Number(n) => n.as_i64(),
            Json::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_big(&self, label: &str) -> Option<BigInt> {
        match self.get_value(label)? {
            Json::Number(n) => n.to_string().parse().ok(),
            Json::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, label: &str) -> Option<bool> {
        match self.get_value(label)? {
            Json::Bool(b) => Some(*b),
            Json::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_time(&self, label: &str) -> Option<OffsetDateTime> {
        match self.get_value(label)? {
            Json::String(s) => OffsetDateTime::parse(s, &Rfc3339)
                .ok()
                .or_else(|| OffsetDateTime::from_unix_timestamp(s.parse().ok()?).ok()),
            Json::Number(n) => OffsetDateTime::from_unix_timestamp(n.as_i64()?).ok(),
            _ => None,
        }
    }

    pub fn get_address(&self, label: &str) -> Option<Address> {
        match self.get_value(label)? {
            Json::String(s) => Address::from_b58check(s).ok(),
            _ => None,
        }
    }

    pub fn get_key(&self, label: &str) -> Option<Key> {
        match self.get_value(label)? {
            Json::String(s) => Key::from_b58check(s).ok(),
            _ => None,
        }
    }

    pub fn get_signature(&self, label: &str) -> Option<Signature> {
        match self.get_value(label)? {
            Json::String(s) => Signature::from_b58check(s).ok(),
            _ => None,
        }
    }

    /// Deserialize the labeled mapping into any serde-deserializable shape.
    pub fn unmarshal<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.map()?.clone())?)
    }

    /// Visit the rendered value at `label` and everything below it.
    pub fn walk<F>(&self, label: &str, f: &mut F) -> Result<()>
    where
        F: FnMut(&str, &Json) -> Result<()>,
    {
        let Some(v) = self.get_value(label) else {
            return Ok(());
        };
        walk_json(label, v, f)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.map()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

fn walk_json<F>(label: &str, v: &Json, f: &mut F) -> Result<()>
where
    F: FnMut(&str, &Json) -> Result<()>,
{
    f(label, v)?;
    match v {
        Json::Object(m) => {
            for (k, vv) in m {
                walk_json(k, vv, f)?;
            }
        }
        Json::Array(a) => {
            for (i, vv) in a.iter().enumerate() {
                walk_json(&i.to_string(), vv, f)?;
            }
        }
        _ => (),
    }
    Ok(())
}

fn get_path<'a>(v: &'a Json, path: &str) -> Option<&'a Json> {
    let mut cur = v;
    for seg in path.split('/') {
        if seg.is_empty() {
            continue;
        }
        cur = match cur {
            Json::Object(m) => m.get(seg)?,
            Json::Array(a) => a.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

struct WalkStack(Vec<Micheline>);

impl WalkStack {
    fn new(v: Micheline) -> Self {
        WalkStack(vec![v])
    }

    fn pop(&mut self) -> Option<Micheline> {
        self.0.pop()
    }

    fn push(&mut self, v: Micheline) {
        self.0.push(v)
    }

    /// Push several values so that the first is popped first.
    fn push_many(&mut self, vals: Vec<Micheline>) {
        for v in vals.into_iter().rev() {
            self.0.push(v)
        }
    }
}

fn mismatch(typ: &Type, val: Option<&Micheline>) -> Error {
    fn limit(mut s: String) -> String {
        if s.len() > 256 {
            s.truncate(256);
            s.push('…');
        }
        s
    }
    Error::TypeMismatch {
        typ: limit(typ.prim().to_json_string()),
        value: limit(
            val.map(Micheline::to_json_string)
                .unwrap_or_else(|| "<none>".to_owned()),
        ),
    }
}

/// The forgiving value/type compatibility relation. Pairs and sequences are
/// accepted broadly since they unfold again during the walk.
fn matches_opcode(val: &Micheline, oc: Option<Prim>) -> bool {
    let Some(oc) = oc else { return false };
    match &val.node {
        Node::Seq(_) => matches!(
            oc,
            Prim::list
                | Prim::map
                | Prim::big_map
                | Prim::set
                | Prim::lambda
                | Prim::or
                | Prim::option
                | Prim::pair
                | Prim::sapling_state
                | Prim::ticket
        ),
        Node::Int(_) => matches!(
            oc,
            Prim::int
                | Prim::nat
                | Prim::mutez
                | Prim::timestamp
                | Prim::big_map
                | Prim::or
                | Prim::option
                | Prim::sapling_state
                | Prim::bls12_381_g1
                | Prim::bls12_381_g2
                | Prim::bls12_381_fr
                | Prim::ticket
        ),
        Node::String(_) => matches!(
            oc,
            Prim::bytes
                | Prim::string
                | Prim::address
                | Prim::contract
                | Prim::key_hash
                | Prim::key
                | Prim::signature
                | Prim::timestamp
                | Prim::or
                | Prim::chain_id
                | Prim::option
                | Prim::ticket
        ),
        Node::Bytes(_) => matches!(
            oc,
            Prim::bytes
                | Prim::string
                | Prim::bool
                | Prim::address
                | Prim::key_hash
                | Prim::key
                | Prim::contract
                | Prim::signature
                | Prim::operation
                | Prim::lambda
                | Prim::or
                | Prim::chain_id
                | Prim::option
                | Prim::sapling_state
                | Prim::sapling_transaction
                | Prim::sapling_transaction_deprecated
                | Prim::bls12_381_g1
                | Prim::bls12_381_g2
                | Prim::bls12_381_fr
                | Prim::ticket
        ),
        Node::App(prim, ..) => match prim {
            Prim::Pair => matches!(
                oc,
                Prim::pair | Prim::or | Prim::list | Prim::option | Prim::ticket
            ),
            Prim::Some | Prim::None => oc == Prim::option,
            Prim::Unit => matches!(oc, Prim::unit | Prim::parameter),
            Prim::Left | Prim::Right => oc == Prim::or,
            _ => true,
        },
    }
}

fn walk_tree(
    m: &mut Map<String, Json>,
    label: Option<&str>,
    typ: Type,
    stack: &mut WalkStack,
    lvl: usize,
) -> Result<()> {
    // abort infinite type recursions
    if lvl > MAX_DEPTH {
        return Err(Error::MaxDepth);
    }

    let mut typ = typ;
    let mut val = stack.pop().ok_or_else(|| mismatch(&typ, None))?;

    // unfold unexpected pairs
    if !val.was_packed && val.is_pair() && !typ.is_pair() {
        let unfolded = val.unfold_pair(typ.prim());
        stack.push_many(unfolded);
        val = stack.pop().ok_or_else(|| mismatch(&typ, None))?;
    }

    // re-derive the type for unpacked subtrees
    if val.was_packed && (!val.is_scalar() || typ.opcode() == Some(Prim::bytes)) {
        let anns: Annotations = typ.prim().anns().to_vec().into();
        let mut fixed = val.build_type();
        fixed.0.set_anns(anns);
        typ = fixed;
    }

    // make sure the value and the type we are about to walk line up; pairs
    // and sequences get another chance to unfold below
    if !typ.is_pair() && !val.is_sequence() && !matches_opcode(&val, typ.opcode()) {
        return Err(mismatch(&typ, Some(&val)));
    }

    let type_label = typ.label().map(str::to_owned);
    let have_type_label = type_label.is_some();
    let have_key_label = label.is_some_and(|l| !l.is_empty());
    let out_label = match label {
        Some(l) => l.to_owned(),
        None => type_label.unwrap_or_else(|| m.len().to_string()),
    };

    match typ.opcode() {
        Some(Prim::set) => {
            let elt_typ = typ
                .arg(0)
                .cloned()
                .unwrap_or_else(|| Micheline::prim0(Prim::unit));
            let mut arr = Vec::with_capacity(val.args().len());
            for v in val.args() {
                if v.is_scalar() && !v.is_sequence() {
                    arr.push(render_scalar(v, elt_typ.opcode())?);
                } else {
                    let mut mm = Map::new();
                    walk_tree(
                        &mut mm,
                        None,
                        Type::new(elt_typ.clone()),
                        &mut WalkStack::new(v.clone()),
                        lvl + 1,
                    )?;
                    arr.push(Json::Object(mm));
                }
            }
            m.insert(out_label, Json::Array(arr));
        }

        Some(Prim::list) => {
            let mut arr = Vec::with_capacity(val.args().len());
            for (i, v) in val.args().iter().enumerate() {
                // lists may carry one element type per position after a
                // packed re-derivation
                let elt_typ = typ
                    .arg(i)
                    .or_else(|| typ.arg(0))
                    .cloned()
                    .unwrap_or_else(|| Micheline::prim0(Prim::unit));
                let mut mm = Map::new();
                walk_tree(
                    &mut mm,
                    None,
                    Type::new(elt_typ),
                    &mut WalkStack::new(v.clone()),
                    lvl + 1,
                )?;
                // lift simple elements out of their wrapper
                if mm.len() == 1 && mm.contains_key("0") {
                    arr.push(mm.remove("0").unwrap());
                } else {
                    arr.push(Json::Object(mm));
                }
            }
            m.insert(out_label, Json::Array(arr));
        }

        Some(Prim::lambda) => {
            m.insert(out_label, val.to_json());
        }

        Some(oc @ (Prim::map | Prim::big_map)) => {
            // a bare big_map reference
            if oc == Prim::big_map && val.args().is_empty() {
                match &val.node {
                    Node::Int(_) => {
                        let id = render_scalar(&val, Some(Prim::int))?;
                        m.insert(out_label, id);
                    }
                    Node::Seq(_) => {
                        m.insert(out_label, Json::Null);
                    }
                    _ => return Err(mismatch(&typ, Some(&val))),
                }
                return Ok(());
            }

            let elt_types = |elt: &Micheline| -> (Type, Type) {
                let k = &elt.args()[0];
                let v = &elt.args()[1];
                let kt = if k.was_packed {
                    k.build_type()
                } else {
                    Type::new(
                        typ.arg(0)
                            .cloned()
                            .unwrap_or_else(|| Micheline::prim0(Prim::unit)),
                    )
                };
                let vt = if v.was_packed {
                    v.build_type()
                } else {
                    Type::new(
                        typ.arg(1)
                            .cloned()
                            .unwrap_or_else(|| Micheline::prim0(Prim::unit)),
                    )
                };
                (kt, vt)
            };

            match &val.node {
                // a single bare Elt
                Node::App(Prim::Elt, args, _) if args.len() == 2 => {
                    let (kt, vt) = elt_types(&val);
                    let key = render_map_key(&kt, &args[0])?;
                    let mut mm = Map::new();
                    walk_tree(
                        &mut mm,
                        Some(&key),
                        vt,
                        &mut WalkStack::new(args[1].clone()),
                        lvl + 1,
                    )?;
                    m.insert(out_label, Json::Object(mm));
                }
                // the regular Elt sequence
                Node::Seq(elts) => {
                    let mut mm = Map::new();
                    for elt in elts {
                        if elt.opcode() != Some(Prim::Elt) || elt.args().len() != 2 {
                            return Err(mismatch(&typ, Some(elt)));
                        }
                        let (kt, vt) = elt_types(elt);
                        let key = render_map_key(&kt, &elt.args()[0])?;
                        walk_tree(
                            &mut mm,
                            Some(&key),
                            vt,
                            &mut WalkStack::new(elt.args()[1].clone()),
                            lvl + 1,
                        )?;
                    }
                    m.insert(out_label, Json::Object(mm));
                }
                _ => return Err(mismatch(&typ, Some(&val))),
            }
        }

        Some(Prim::pair) => {
            let nested = have_type_label || have_key_label;
            let mut mm = Map::new();
            if val.can_unfold() {
                stack.push_many(val.args().to_vec());
            } else {
                // let the shared stack feed this type's arguments
                stack.push(val);
            }
            {
                let target: &mut Map<String, Json> = if nested { &mut mm } else { &mut *m };
                for t in typ.args() {
                    walk_tree(&mut *target, None, Type::new(t.clone()), stack, lvl + 1)?;
                }
            }
            if nested {
                m.insert(out_label, Json::Object(mm));
            }
        }

        Some(Prim::option) => match val.opcode() {
            Some(Prim::None) => {
                m.insert(out_label, Json::Null);
            }
            Some(Prim::Some) => {
                let inner = val
                    .args()
                    .first()
                    .cloned()
                    .ok_or_else(|| mismatch(&typ, Some(&val)))?;
                let inner_typ = typ
                    .arg(0)
                    .cloned()
                    .unwrap_or_else(|| Micheline::prim0(Prim::unit));
                // hoist scalars and identically-named wrappers into the
                // parent label
                let hoist = val.is_scalar()
                    || inner_typ.first_var_ann() == Some(out_label.as_str());
                if hoist {
                    walk_tree(
                        m,
                        Some(&out_label),
                        Type::new(inner_typ),
                        &mut WalkStack::new(inner),
                        lvl + 1,
                    )?;
                } else {
                    let mut mm = Map::new();
                    walk_tree(
                        &mut mm,
                        None,
                        Type::new(inner_typ),
                        &mut WalkStack::new(inner),
                        lvl + 1,
                    )?;
                    m.insert(out_label, Json::Object(mm));
                }
            }
            _ => return Err(mismatch(&typ, Some(&val))),
        },

        Some(Prim::or) => {
            let (idx, anon_key) = match val.opcode() {
                Some(Prim::Left) => (0, "@or_0"),
                Some(Prim::Right) => (1, "@or_1"),
                _ => return Err(mismatch(&typ, Some(&val))),
            };
            let inner = val
                .args()
                .first()
                .cloned()
                .ok_or_else(|| mismatch(&typ, Some(&val)))?;
            let inner_typ = typ
                .arg(idx)
                .cloned()
                .unwrap_or_else(|| Micheline::prim0(Prim::unit));

            let mut mm = Map::new();
            if !(have_type_label || have_key_label) {
                let mut mmm = Map::new();
                walk_tree(
                    &mut mmm,
                    None,
                    Type::new(inner_typ),
                    &mut WalkStack::new(inner),
                    lvl + 1,
                )?;
                // lift named content, keep anonymous branches apart
                if mmm.len() == 1 {
                    let (name, v) = mmm.into_iter().next().unwrap();
                    if name == "0" {
                        mm.insert(anon_key.to_owned(), v);
                    } else {
                        mm.insert(name, v);
                    }
                } else {
                    mm.insert(anon_key.to_owned(), Json::Object(mmm));
                }
            } else {
                walk_tree(
                    &mut mm,
                    None,
                    Type::new(inner_typ),
                    &mut WalkStack::new(inner),
                    lvl + 1,
                )?;
            }

            // lift anonymous single entries
            if mm.len() == 1 && mm.contains_key("0") {
                m.insert(out_label, mm.remove("0").unwrap());
            } else {
                m.insert(out_label, Json::Object(mm));
            }
        }

        Some(Prim::ticket) => {
            // always pair(address, value, int) under the hood
            stack.push(val);
            walk_tree(m, Some(&out_label), ticket_type(typ.arg(0)), stack, lvl + 1)?;
        }

        Some(Prim::sapling_state) => {
            let mut mm = Map::new();
            let memo = typ
                .arg(0)
                .cloned()
                .unwrap_or_else(|| Micheline::int(0));
            walk_tree(
                &mut mm,
                Some("memo_size"),
                Type::new(Micheline::prim0(Prim::int)),
                &mut WalkStack::new(memo),
                lvl + 1,
            )?;
            let content_typ = val.build_type();
            walk_tree(
                &mut mm,
                Some("content"),
                content_typ,
                &mut WalkStack::new(val),
                lvl + 1,
            )?;
            m.insert(out_label, Json::Object(mm));
        }

        _ => {
            // comb parts that slipped through as naked sequences unfold
            // into the shared stack here
            let mut val = val;
            if val.is_sequence() {
                stack.push_many(val.args().to_vec());
                val = stack.pop().ok_or_else(|| mismatch(&typ, None))?;
            }
            if val.is_scalar() {
                m.insert(out_label, render_scalar(&val, typ.opcode())?);
            } else {
                let mut mm = Map::new();
                walk_tree(&mut mm, None, typ.clone(), &mut WalkStack::new(val), lvl + 1)?;
                m.insert(out_label, Json::Object(mm));
            }
        }
    }
    Ok(())
}

/// Render a map key as its string form: integers decimal, bytes hex,
/// strings verbatim, addresses and keys in base58. Pair keys join their
/// components with commas.
fn render_map_key(key_typ: &Type, key: &Micheline) -> Result<String> {
    if key.is_pair() {
        let parts = key
            .args()
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let kt = key_typ
                    .arg(i)
                    .cloned()
                    .unwrap_or_else(|| Micheline::prim0(Prim::unit));
                render_map_key(&Type::new(kt), k)
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(parts.join(","));
    }
    Ok(json_to_key_string(&render_scalar(key, key_typ.opcode())?))
}

fn json_to_key_string(v: &Json) -> String {
    match v {
        Json::String(s) => s.clone(),
        Json::Number(n) => n.to_string(),
        Json::Bool(b) => b.to_string(),
        Json::Null => "Unit".to_owned(),
        other => other.to_string(),
    }
}

fn render_bigint(n: &BigInt) -> Json {
    if let Some(i) = n.to_i64() {
        return Json::Number(i.into());
    }
    if let Some(u) = n.to_u64() {
        return Json::Number(u.into());
    }
    Json::String(n.to_string())
}

fn render_timestamp_secs(n: &BigInt) -> Json {
    let formatted = n
        .to_i64()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|t| t.format(&Rfc3339).ok());
    match formatted {
        Some(s) => Json::String(s),
        None => Json::String(n.to_string()),
    }
}

fn render_timestamp_str(s: &str) -> Json {
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        if let Ok(formatted) = t.format(&Rfc3339) {
            return Json::String(formatted);
        }
    }
    if let Ok(n) = s.parse::<BigInt>() {
        return render_timestamp_secs(&n);
    }
    Json::String(s.to_owned())
}

/// Decode a scalar leaf through its type opcode.
fn render_scalar(val: &Micheline, oc: Option<Prim>) -> Result<Json> {
    Ok(match &val.node {
        Node::Int(n) => match oc {
            Some(Prim::timestamp) => render_timestamp_secs(n),
            _ => render_bigint(n),
        },
        Node::String(s) => match oc {
            Some(Prim::timestamp) => render_timestamp_str(s),
            _ => Json::String(s.clone()),
        },
        Node::Bytes(b) => match oc {
            Some(Prim::address | Prim::contract | Prim::key_hash) => {
                match Address::from_bytes(b) {
                    Some(a) => Json::String(a.to_b58check()),
                    None => Json::String(hex::encode(b)),
                }
            }
            Some(Prim::key) => match Key::from_bytes(b) {
                Some(k) => Json::String(k.to_b58check()),
                None => Json::String(hex::encode(b)),
            },
            Some(Prim::signature) => match Signature::from_bytes(b) {
                Some(s) => Json::String(s.to_b58check()),
                None => Json::String(hex::encode(b)),
            },
            Some(Prim::chain_id) => {
                use tezos_crypto_rs::hash::{ChainId, HashTrait};
                match ChainId::try_from_bytes(b) {
                    Ok(c) => Json::String(c.to_b58check()),
                    Err(_) => Json::String(hex::encode(b)),
                }
            }
            Some(Prim::string) => match std::str::from_utf8(b) {
                Ok(s) => Json::String(s.to_owned()),
                Err(_) => Json::String(hex::encode(b)),
            },
            _ => Json::String(hex::encode(b)),
        },
        Node::App(prim, args, _) => match prim {
            Prim::True => Json::Bool(true),
            Prim::False => Json::Bool(false),
            Prim::Unit | Prim::None => Json::Null,
            Prim::Some | Prim::Left | Prim::Right if args.len() == 1 => {
                render_scalar(&args[0], oc)?
            }
            _ if args.is_empty() => Json::String(prim.to_string()),
            _ => val.to_json(),
        },
        Node::Seq(_) => val.to_json(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::annotations::Annotation;
    use crate::ast::micheline::test_helpers::{app, seq};
    use serde_json::json;

    fn ann(s: &str) -> Annotation {
        Annotation::parse(s).unwrap()
    }

    fn tprim(prim: Prim, anns: &[&str]) -> Micheline {
        tprim_args(prim, vec![], anns)
    }

    fn tprim_args(prim: Prim, args: Vec<Micheline>, anns: &[&str]) -> Micheline {
        Micheline::app(
            prim,
            args,
            anns.iter().copied().map(ann).collect::<Annotations>(),
        )
    }

    #[track_caller]
    fn check_map(typ: Micheline, val: Micheline, expected: Json) {
        let v = Value::new(Type::new(typ), val).with_render(Render::Fail);
        assert_eq!(v.map().unwrap(), &expected);
    }

    #[test]
    fn string_int_map() {
        // map string int: { Elt "k" 7 ; Elt "l" 8 } renders to {"k":7,"l":8}
        check_map(
            app!(map[app!(string), app!(int)]),
            seq! { app!(Elt["k", 7]); app!(Elt["l", 8]) },
            json!({"k": 7, "l": 8}),
        );
    }

    #[test]
    fn labeled_pair() {
        check_map(
            app!(pair[tprim(Prim::int, &["%a"]), tprim(Prim::string, &["%b"])]),
            app!(Pair[1, "x"]),
            json!({"a": 1, "b": "x"}),
        );
    }

    #[test]
    fn comb_value_against_nested_type() {
        // value Pair 1 2 3 against pair (int %a) (pair (int %b) (int %c))
        check_map(
            app!(pair[
                tprim(Prim::int, &["%a"]),
                app!(pair[tprim(Prim::int, &["%b"]), tprim(Prim::int, &["%c"])]),
            ]),
            app!(Pair[1, 2, 3]),
            json!({"a": 1, "b": 2, "c": 3}),
        );
    }

    #[test]
    fn nested_value_against_comb_type() {
        // value Pair 1 (Pair 2 3) against pair (int %a) (int %b) (int %c)
        check_map(
            app!(pair[
                tprim(Prim::int, &["%a"]),
                tprim(Prim::int, &["%b"]),
                tprim(Prim::int, &["%c"]),
            ]),
            app!(Pair[1, app!(Pair[2, 3])]),
            json!({"a": 1, "b": 2, "c": 3}),
        );
    }

    #[test]
    fn naked_comb_sequence() {
        check_map(
            app!(pair[
                tprim(Prim::int, &["%a"]),
                tprim(Prim::string, &["%b"]),
            ]),
            seq! {1; "x"},
            json!({"a": 1, "b": "x"}),
        );
    }

    #[test]
    fn anonymous_or() {
        check_map(
            app!(or[app!(int), app!(string)]),
            app!(Left[42]),
            json!({"@or_0": 42}),
        );
        check_map(
            app!(or[app!(int), app!(string)]),
            app!(Right["x"]),
            json!({"@or_1": "x"}),
        );
    }

    #[test]
    fn named_or() {
        check_map(
            app!(or[tprim(Prim::int, &["%left"]), tprim(Prim::string, &["%right"])]),
            app!(Right["x"]),
            json!({"right": "x"}),
        );
    }

    #[test]
    fn options() {
        check_map(app!(option[app!(int)]), app!(Some[5]), json!(5));
        check_map(app!(option[app!(int)]), app!(None), json!(null));
        check_map(
            app!(pair[
                tprim_args(Prim::option, vec![app!(int)], &["%opt"]),
                tprim(Prim::int, &["%n"]),
            ]),
            app!(Pair[app!(Some[5]), 7]),
            json!({"opt": 5, "n": 7}),
        );
    }

    #[test]
    fn lists_and_sets() {
        check_map(app!(list[app!(int)]), seq! {1; 2; 3}, json!([1, 2, 3]));
        check_map(app!(set[app!(string)]), seq! {"a"; "b"}, json!(["a", "b"]));
        check_map(
            app!(list[app!(pair[tprim(Prim::int, &["%x"]), tprim(Prim::int, &["%y"])])]),
            seq! { app!(Pair[1, 2]); app!(Pair[3, 4]) },
            json!([{"x": 1, "y": 2}, {"x": 3, "y": 4}]),
        );
    }

    #[test]
    fn big_map_reference() {
        check_map(
            app!(big_map[app!(string), app!(int)]),
            Micheline::int(42),
            json!(42),
        );
        check_map(
            app!(big_map[app!(string), app!(int)]),
            seq! { app!(Elt["k", 7]) },
            json!({"k": 7}),
        );
    }

    #[test]
    fn map_keys_render_as_strings() {
        check_map(
            app!(map[app!(int), app!(string)]),
            seq! { app!(Elt[7, "seven"]) },
            json!({"7": "seven"}),
        );
        check_map(
            app!(map[app!(bytes), app!(int)]),
            seq! { app!(Elt[vec![0xab, 0xcd], 1]) },
            json!({"abcd": 1}),
        );
        // pair keys join with commas
        check_map(
            app!(map[app!(pair[app!(string), app!(int)]), app!(int)]),
            seq! { app!(Elt[app!(Pair["k", 2]), 1]) },
            json!({"k,2": 1}),
        );
    }

    #[test]
    fn scalars_decode_through_their_type() {
        // address bytes render in base58
        check_map(
            app!(address),
            Micheline::bytes(
                hex::decode("00007b09f782e0bcd67739510afa819d85976119d5ef").unwrap(),
            ),
            json!("tz1WrbkDrzKVqcGXkjw4Qk4fXkjXpAJuNP1j"),
        );
        // chain ids too
        check_map(
            app!(chain_id),
            Micheline::bytes(hex::decode("7a06a770").unwrap()),
            json!("NetXdQprcVkpaWU"),
        );
        // booleans
        check_map(app!(bool), app!(True), json!(true));
        // timestamps, from seconds and from strings
        check_map(app!(timestamp), Micheline::int(0), json!("1970-01-01T00:00:00Z"));
        check_map(
            app!(timestamp),
            Micheline::string("2021-03-01T00:00:00Z"),
            json!("2021-03-01T00:00:00Z"),
        );
        check_map(
            app!(timestamp),
            Micheline::string("1614556800"),
            json!("2021-03-01T00:00:00Z"),
        );
        // unit is null
        check_map(app!(unit), app!(Unit), json!(null));
    }

    #[test]
    fn huge_numbers_become_strings() {
        let huge: BigInt = BigInt::from(1u8) << 80;
        check_map(
            app!(nat),
            Micheline::int(huge.clone()),
            Json::String(huge.to_string()),
        );
    }

    #[test]
    fn packed_bytes_retype_after_unpack() {
        let packed = app!(Pair[1, "x"]).pack();
        let typ = app!(bytes);

        // without unpacking, bytes under a bytes type stay hex
        let v = Value::new(Type::new(typ.clone()), Micheline::bytes(packed.clone()))
            .with_render(Render::Fail);
        assert_eq!(v.map().unwrap(), &Json::String(hex::encode(&packed)));

        // after unpacking the walker re-derives the type
        let v = v.unpack().unwrap();
        assert_eq!(v.map().unwrap(), &json!({"0": 1, "1": "x"}));
    }

    #[test]
    fn ticket_values() {
        check_map(
            app!(ticket[app!(string)]),
            app!(Pair["KT1BRd2ka5q2cPRdXALtXD1QZ38CPam2j1ye", app!(Pair["content", 3])]),
            json!({
                "ticketer": "KT1BRd2ka5q2cPRdXALtXD1QZ38CPam2j1ye",
                "1": "content",
                "amount": 3,
            }),
        );
    }

    #[test]
    fn sapling_state_shape() {
        check_map(
            app!(sapling_state[8]),
            seq! {},
            json!({"memo_size": 8, "content": []}),
        );
    }

    #[test]
    fn depth_bound() {
        let mut typ = app!(int);
        let mut val = Micheline::int(1);
        for _ in 0..(MAX_DEPTH + 3) {
            typ = app!(option[typ]);
            val = app!(Some[val]);
        }
        let v = Value::new(Type::new(typ), val).with_render(Render::Fail);
        assert_eq!(v.map(), Err(Error::MaxDepth));
    }

    #[test]
    fn render_policies() {
        // int type against a string value is a mismatch
        let v = Value::new(Type::new(app!(int)), Micheline::string("x"))
            .with_render(Render::Fail);
        assert!(matches!(v.map(), Err(Error::TypeMismatch { .. })));

        // the default policy falls back to the raw prim tree
        let v = Value::new(Type::new(app!(int)), Micheline::string("x"));
        assert_eq!(v.map().unwrap(), &json!({"string": "x"}));
    }

    #[test]
    #[should_panic(expected = "micheline")]
    fn panic_policy_panics() {
        let v = Value::new(Type::new(app!(int)), Micheline::string("x"))
            .with_render(Render::Panic);
        let _ = v.map();
    }

    #[test]
    fn map_is_memoized() {
        let v = Value::new(
            Type::new(app!(pair[tprim(Prim::int, &["%a"]), tprim(Prim::int, &["%b"])])),
            app!(Pair[1, 2]),
        );
        let first = v.map().unwrap() as *const Json;
        let second = v.map().unwrap() as *const Json;
        assert_eq!(first, second);
    }

    #[test]
    fn accessors() {
        let typ = app!(pair[
            tprim(Prim::string, &["%owner"]),
            tprim(Prim::nat, &["%balance"]),
            tprim_args(Prim::pair, vec![
                tprim(Prim::bool, &["%paused"]),
                tprim(Prim::timestamp, &["%since"]),
            ], &["%state"]),
        ]);
        let val = app!(Pair[
            "alice",
            1000,
            app!(Pair[app!(True), 0]),
        ]);
        let v = Value::new(Type::new(typ), val).with_render(Render::Fail);

        assert_eq!(v.get_string("owner"), Some("alice".to_owned()));
        assert_eq!(v.get_int64("balance"), Some(1000));
        assert_eq!(v.get_big("balance"), Some(BigInt::from(1000)));
        assert_eq!(v.get_bool("state/paused"), Some(true));
        assert_eq!(
            v.get_time("state/since"),
            Some(OffsetDateTime::from_unix_timestamp(0).unwrap())
        );
        assert_eq!(v.get_value("missing"), None);
    }

    #[test]
    fn get_address_from_storage() {
        let v = Value::new(
            Type::new(tprim(Prim::address, &["%admin"])),
            Micheline::bytes(
                hex::decode("00007b09f782e0bcd67739510afa819d85976119d5ef").unwrap(),
            ),
        );
        let addr = v.get_address("admin").unwrap();
        assert_eq!(addr.to_b58check(), "tz1WrbkDrzKVqcGXkjw4Qk4fXkjXpAJuNP1j");
    }

    #[test]
    fn unmarshal_into_plain_shapes() {
        let v = Value::new(
            Type::new(app!(pair[tprim(Prim::int, &["%a"]), tprim(Prim::int, &["%b"])])),
            app!(Pair[1, 2]),
        );
        let m: std::collections::BTreeMap<String, i64> = v.unmarshal().unwrap();
        assert_eq!(m["a"], 1);
        assert_eq!(m["b"], 2);
    }

    #[test]
    fn walk_visits_labels() {
        let v = Value::new(
            Type::new(app!(pair[
                tprim(Prim::int, &["%a"]),
                tprim_args(Prim::pair, vec![
                    tprim(Prim::int, &["%x"]),
                    tprim(Prim::int, &["%y"]),
                ], &["%inner"]),
            ])),
            app!(Pair[1, app!(Pair[2, 3])]),
        );
        let mut seen = Vec::new();
        v.walk("inner", &mut |label, _| {
            seen.push(label.to_owned());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, ["inner", "x", "y"]);
    }

    #[test]
    fn fix_type_keeps_root_labels() {
        let mut v = Value::new(
            Type::new(tprim(Prim::bytes, &["%payload"])),
            app!(Pair[1, "x"]),
        );
        v.fix_type();
        assert_eq!(v.typ.opcode(), Some(Prim::pair));
        assert_eq!(v.typ.label(), Some("payload"));
        assert!(v.typ.was_packed());
    }
}
