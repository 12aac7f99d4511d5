/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

use num_bigint::BigInt;

use super::annotations::{Annotation, Annotations, NO_ANNS};
use crate::prim::{Prim, PrimKind};
use crate::serializer::constants::PACK_TAG;

/// The shape of a Micheline node: one of the three literals, a sequence, or
/// the application of a primitive to some arguments with optional
/// annotations.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Node {
    Int(BigInt),
    String(String),
    Bytes(Vec<u8>),
    Seq(Vec<Micheline>),
    /// The primitive is the first field, arguments the second, annotations
    /// the last.
    App(Prim, Vec<Micheline>, Annotations),
}

/// A Micheline expression with owned children.
///
/// `was_packed` records that the node was produced by decoding a `PACK`ed
/// byte string. It is never serialized and is ignored by equality; it only
/// steers the typed walker.
#[derive(Debug, Clone, Eq)]
pub struct Micheline {
    pub node: Node,
    pub was_packed: bool,
}

impl PartialEq for Micheline {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl From<Node> for Micheline {
    fn from(node: Node) -> Self {
        Micheline {
            node,
            was_packed: false,
        }
    }
}

impl Micheline {
    pub fn int(v: impl Into<BigInt>) -> Self {
        Node::Int(v.into()).into()
    }

    pub fn string(v: impl Into<String>) -> Self {
        Node::String(v.into()).into()
    }

    pub fn bytes(v: Vec<u8>) -> Self {
        Node::Bytes(v).into()
    }

    pub fn seq(elts: Vec<Micheline>) -> Self {
        Node::Seq(elts).into()
    }

    pub fn prim0(prim: Prim) -> Self {
        Node::App(prim, Vec::new(), NO_ANNS).into()
    }

    pub fn prim1(prim: Prim, arg: Micheline) -> Self {
        Node::App(prim, vec![arg], NO_ANNS).into()
    }

    pub fn prim2(prim: Prim, arg1: Micheline, arg2: Micheline) -> Self {
        Node::App(prim, vec![arg1, arg2], NO_ANNS).into()
    }

    pub fn app(prim: Prim, args: Vec<Micheline>, anns: Annotations) -> Self {
        Node::App(prim, args, anns).into()
    }

    /// The applied primitive, for application nodes.
    pub fn opcode(&self) -> Option<Prim> {
        match &self.node {
            Node::App(prim, ..) => Some(*prim),
            _ => None,
        }
    }

    /// Child nodes: application arguments or sequence elements.
    pub fn args(&self) -> &[Micheline] {
        match &self.node {
            Node::App(_, args, _) => args,
            Node::Seq(elts) => elts,
            _ => &[],
        }
    }

    pub fn anns(&self) -> &[Annotation] {
        match &self.node {
            Node::App(_, _, anns) => anns.as_slice(),
            _ => &[],
        }
    }

    /// Replace the annotations of an application node.
    pub fn set_anns(&mut self, anns: Annotations) {
        if let Node::App(_, _, slot) = &mut self.node {
            *slot = anns;
        }
    }

    /// The first `%`-annotation, if any.
    pub fn first_field_ann(&self) -> Option<&str> {
        self.anns().iter().find_map(|a| match a {
            Annotation::Field(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The first `@`-annotation, if any.
    pub fn first_var_ann(&self) -> Option<&str> {
        self.anns().iter().find_map(|a| match a {
            Annotation::Variable(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.node, Node::Seq(_))
    }

    /// True for `Pair` values and `pair` types.
    pub fn is_pair(&self) -> bool {
        matches!(self.opcode(), Some(Prim::Pair | Prim::pair))
    }

    /// A scalar renders as a single leaf: a literal, a nullary application,
    /// or `Left`/`Right`/`Some` wrapping a scalar.
    pub fn is_scalar(&self) -> bool {
        match &self.node {
            Node::Int(_) | Node::String(_) | Node::Bytes(_) => true,
            Node::Seq(_) => false,
            Node::App(prim, args, _) => match args.as_slice() {
                [] => true,
                [inner] => {
                    matches!(prim, Prim::Left | Prim::Right | Prim::Some) && inner.is_scalar()
                }
                _ => false,
            },
        }
    }

    /// A sequence whose elements are all `Elt` applications, i.e. a map
    /// literal.
    pub fn looks_like_map(&self) -> bool {
        match &self.node {
            Node::Seq(elts) => {
                !elts.is_empty() && elts.iter().all(|e| e.opcode() == Some(Prim::Elt))
            }
            _ => false,
        }
    }

    /// A sequence that reads as code: every element an instruction
    /// application or a nested block.
    pub fn looks_like_code(&self) -> bool {
        match &self.node {
            Node::Seq(elts) => {
                !elts.is_empty()
                    && elts.iter().all(|e| {
                        e.is_sequence()
                            || e.opcode().and_then(Prim::kind) == Some(PrimKind::Instr)
                    })
            }
            _ => false,
        }
    }

    /// Whether the walker may feed this value's children to the argument
    /// list of a `pair` type. Pairs always unfold; naked comb sequences do
    /// too, unless they read as a map or as code.
    pub fn can_unfold(&self) -> bool {
        self.is_pair()
            || (self.is_sequence() && !self.looks_like_map() && !self.looks_like_code())
    }

    /// Flatten a pair-shaped value so its children line up with the
    /// argument list of `typ`. Nested pairs unfold recursively wherever the
    /// type does not expect a pair at that position.
    pub fn unfold_pair(&self, typ: &Micheline) -> Vec<Micheline> {
        let unit = Micheline::prim0(Prim::unit);
        let mut out = Vec::new();
        for (i, v) in self.args().iter().enumerate() {
            let t = typ.args().get(i);
            if !v.was_packed && v.is_pair() && !t.is_some_and(|t| t.is_pair()) {
                out.extend(v.unfold_pair(t.unwrap_or(&unit)));
            } else {
                out.push(v.clone());
            }
        }
        out
    }

    /// Bytes holding a `PACK`ed Micheline tree, going by the leading tag.
    pub fn is_packed(&self) -> bool {
        match &self.node {
            Node::Bytes(b) => b.len() > 1 && b[0] == PACK_TAG,
            _ => false,
        }
    }

    /// Whether this node or any descendant is packed bytes.
    pub fn is_packed_any(&self) -> bool {
        self.is_packed() || self.args().iter().any(Micheline::is_packed_any)
    }

    pub(crate) fn mark_packed(&mut self) {
        self.was_packed = true;
        match &mut self.node {
            Node::Seq(elts) => elts.iter_mut().for_each(Micheline::mark_packed),
            Node::App(_, args, _) => args.iter_mut().for_each(Micheline::mark_packed),
            _ => (),
        }
    }
}

// the single integral impl keeps bare literals unambiguous
impl From<i64> for Micheline {
    fn from(x: i64) -> Self {
        Micheline::int(x)
    }
}

impl From<BigInt> for Micheline {
    fn from(x: BigInt) -> Self {
        Micheline::int(x)
    }
}

impl From<String> for Micheline {
    fn from(x: String) -> Self {
        Micheline::string(x)
    }
}

impl From<&str> for Micheline {
    fn from(s: &str) -> Self {
        Micheline::string(s)
    }
}

impl From<Vec<u8>> for Micheline {
    fn from(x: Vec<u8>) -> Self {
        Micheline::bytes(x)
    }
}

impl From<bool> for Micheline {
    fn from(x: bool) -> Self {
        Micheline::prim0(if x { Prim::True } else { Prim::False })
    }
}

impl From<()> for Micheline {
    fn from(_: ()) -> Self {
        Micheline::prim0(Prim::Unit)
    }
}


#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use super::*;

    #[test]
    fn equality_ignores_packed_flag() {
        let a = Micheline::int(42);
        let mut b = Micheline::int(42);
        b.mark_packed();
        assert_eq!(a, b);
        assert!(b.was_packed);
    }

    #[test]
    fn scalar_predicate() {
        assert!(Micheline::int(1).is_scalar());
        assert!(Micheline::string("x").is_scalar());
        assert!(app!(Unit).is_scalar());
        assert!(app!(Some[1]).is_scalar());
        assert!(app!(Left["x"]).is_scalar());
        assert!(!app!(Pair[1, 2]).is_scalar());
        assert!(!app!(Some[app!(Pair[1, 2])]).is_scalar());
        assert!(!seq! {1; 2}.is_scalar());
    }

    #[test]
    fn container_shapes() {
        assert!(seq! { app!(Elt["k", 1]) }.looks_like_map());
        assert!(!seq! { app!(Elt["k", 1]); 2 }.looks_like_map());
        assert!(seq! { app!(DROP); seq!{ app!(DUP) } }.looks_like_code());
        assert!(seq! {1; 2}.can_unfold());
        assert!(app!(Pair[1, 2]).can_unfold());
        assert!(!seq! { app!(Elt["k", 1]) }.can_unfold());
    }

    #[test]
    fn unfold_pair_aligns_to_type() {
        // value Pair 1 (Pair 2 3) against comb type (pair int int int)
        let val = app!(Pair[1, app!(Pair[2, 3])]);
        let typ = app!(pair[app!(int), app!(int), app!(int)]);
        assert_eq!(
            val.unfold_pair(&typ),
            vec![Micheline::int(1), Micheline::int(2), Micheline::int(3)]
        );

        // against (pair int (pair int int)) the nested pair is kept
        let typ = app!(pair[app!(int), app!(pair[app!(int), app!(int)])]);
        assert_eq!(
            val.unfold_pair(&typ),
            vec![Micheline::int(1), app!(Pair[2, 3])]
        );
    }

    #[test]
    fn packed_detection() {
        assert!(Micheline::bytes(vec![0x05, 0x00, 0x2a]).is_packed());
        assert!(!Micheline::bytes(vec![0x05]).is_packed());
        assert!(!Micheline::bytes(vec![0x00, 0x2a]).is_packed());
        assert!(app!(Pair[Micheline::bytes(vec![0x05, 0x00, 0x2a]), 1]).is_packed_any());
        assert!(!app!(Pair[1, 2]).is_packed_any());
    }
}
