/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Micheline type expressions and type reconstruction for untyped trees.

use crate::ast::annotations::Annotation;
use crate::ast::{Micheline, Node};
use crate::prim::Prim;

/// A type expression: a Micheline node whose root applies a type opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type(pub Micheline);

impl Type {
    pub fn new(prim: Micheline) -> Self {
        Type(prim)
    }

    pub fn prim(&self) -> &Micheline {
        &self.0
    }

    pub fn opcode(&self) -> Option<Prim> {
        self.0.opcode()
    }

    pub fn args(&self) -> &[Micheline] {
        self.0.args()
    }

    pub fn arg(&self, i: usize) -> Option<&Micheline> {
        self.0.args().get(i)
    }

    /// The label of the root: its first `%`-annotation, falling back to the
    /// first `@`-annotation.
    pub fn label(&self) -> Option<&str> {
        self.0.first_field_ann().or_else(|| self.0.first_var_ann())
    }

    pub fn is_pair(&self) -> bool {
        self.opcode() == Some(Prim::pair)
    }

    /// A comb: a `pair` flattened to more than two arguments, or the root of
    /// a right-leaning `pair` chain.
    pub fn is_comb(&self) -> bool {
        self.is_pair()
            && (self.args().len() > 2
                || self
                    .args()
                    .last()
                    .is_some_and(|t| t.opcode() == Some(Prim::pair)))
    }

    /// True for types that render as a single leaf.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self.opcode(),
            Some(
                Prim::pair
                    | Prim::or
                    | Prim::option
                    | Prim::list
                    | Prim::set
                    | Prim::map
                    | Prim::big_map
                    | Prim::lambda
                    | Prim::ticket
                    | Prim::sapling_state
            )
        )
    }

    pub fn was_packed(&self) -> bool {
        self.0.was_packed
    }
}

fn field(name: &str) -> Annotation {
    Annotation::Field(name.to_owned())
}

/// The synthetic pair type a `ticket` value inhabits:
/// `pair (address %ticketer) <content type> (int %amount)`.
pub(crate) fn ticket_type(content: Option<&Micheline>) -> Type {
    let content = content
        .cloned()
        .unwrap_or_else(|| Micheline::prim0(Prim::unit));
    Type::new(Micheline::app(
        Prim::pair,
        vec![
            Micheline::app(Prim::address, vec![], [field("ticketer")].into()),
            content,
            Micheline::app(Prim::int, vec![], [field("amount")].into()),
        ],
        Default::default(),
    ))
}

impl Micheline {
    /// Reconstruct a plausible type for an untyped tree, as needed after
    /// `UNPACK`. Annotations of the source are dropped and the produced root
    /// is flagged as packed.
    pub fn build_type(&self) -> Type {
        let mut t = self.build_type_prim();
        t.was_packed = true;
        Type(t)
    }

    fn build_type_prim(&self) -> Micheline {
        match &self.node {
            Node::Int(_) => Micheline::prim0(Prim::int),
            Node::String(_) => Micheline::prim0(Prim::string),
            Node::Bytes(_) => Micheline::prim0(Prim::bytes),
            Node::Seq(elts) => {
                if self.looks_like_map() {
                    let first = &elts[0];
                    return Micheline::prim2(
                        Prim::map,
                        first.args()[0].build_type_prim(),
                        first.args()[1].build_type_prim(),
                    );
                }
                if self.looks_like_code() {
                    return Micheline::prim0(Prim::lambda);
                }
                let mut types: Vec<Micheline> =
                    elts.iter().map(Micheline::build_type_prim).collect();
                if let Some(first) = types.first() {
                    if types.iter().all(|t| t == first) {
                        types.truncate(1);
                    }
                }
                Micheline::app(Prim::list, types, Default::default())
            }
            Node::App(prim, args, _) => match prim {
                Prim::Pair => Micheline::app(
                    Prim::pair,
                    args.iter().map(Micheline::build_type_prim).collect(),
                    Default::default(),
                ),
                Prim::Some => Micheline::app(
                    Prim::option,
                    args.iter().map(Micheline::build_type_prim).collect(),
                    Default::default(),
                ),
                Prim::None => Micheline::prim0(Prim::option),
                Prim::Left => Micheline::prim2(
                    Prim::or,
                    args.first()
                        .map(Micheline::build_type_prim)
                        .unwrap_or_else(|| Micheline::prim0(Prim::unit)),
                    Micheline::prim0(Prim::unit),
                ),
                Prim::Right => Micheline::prim2(
                    Prim::or,
                    Micheline::prim0(Prim::unit),
                    args.first()
                        .map(Micheline::build_type_prim)
                        .unwrap_or_else(|| Micheline::prim0(Prim::unit)),
                ),
                Prim::Elt if args.len() == 2 => Micheline::prim2(
                    Prim::map,
                    args[0].build_type_prim(),
                    args[1].build_type_prim(),
                ),
                Prim::True | Prim::False => Micheline::prim0(Prim::bool),
                _ => Micheline::prim0(Prim::unit),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::micheline::test_helpers::{app, seq};

    fn ann(s: &str) -> Annotation {
        Annotation::parse(s).unwrap()
    }

    fn typ(m: Micheline) -> Type {
        Type::new(m)
    }

    #[test]
    fn labels() {
        let t = typ(Micheline::app(
            Prim::int,
            vec![],
            [ann("@var"), ann("%fld")].into(),
        ));
        assert_eq!(t.label(), Some("fld"));

        let t = typ(Micheline::app(Prim::int, vec![], [ann("@var")].into()));
        assert_eq!(t.label(), Some("var"));

        assert_eq!(typ(app!(int)).label(), None);
    }

    #[test]
    fn comb_recognition() {
        assert!(!typ(app!(pair[app!(int), app!(int)])).is_comb());
        assert!(typ(app!(pair[app!(int), app!(int), app!(int)])).is_comb());
        assert!(typ(app!(pair[app!(int), app!(pair[app!(int), app!(int)])])).is_comb());
        assert!(!typ(app!(int)).is_comb());
    }

    #[test]
    fn scalar_types() {
        assert!(typ(app!(int)).is_scalar());
        assert!(typ(app!(address)).is_scalar());
        assert!(!typ(app!(pair[app!(int), app!(int)])).is_scalar());
        assert!(!typ(app!(big_map[app!(string), app!(int)])).is_scalar());
    }

    #[test]
    fn build_type_literals() {
        assert_eq!(Micheline::int(1).build_type().prim(), &app!(int));
        assert_eq!(Micheline::string("x").build_type().prim(), &app!(string));
        assert_eq!(
            Micheline::bytes(vec![0x00]).build_type().prim(),
            &app!(bytes)
        );
        assert!(Micheline::int(1).build_type().was_packed());
    }

    #[test]
    fn build_type_containers() {
        assert_eq!(
            app!(Pair[1, "x"]).build_type().prim(),
            &app!(pair[app!(int), app!(string)])
        );
        assert_eq!(
            app!(Some[1]).build_type().prim(),
            &app!(option[app!(int)])
        );
        assert_eq!(
            app!(Left[1]).build_type().prim(),
            &app!(or[app!(int), app!(unit)])
        );
        assert_eq!(
            seq! {1; 2; 3}.build_type().prim(),
            &app!(list[app!(int)])
        );
        assert_eq!(
            seq! {1; "x"}.build_type().prim(),
            &app!(list[app!(int), app!(string)])
        );
        assert_eq!(
            seq! { app!(Elt["k", 1]) }.build_type().prim(),
            &app!(map[app!(string), app!(int)])
        );
        assert_eq!(
            seq! { app!(DROP); app!(DUP) }.build_type().prim(),
            &app!(lambda)
        );
    }

    #[test]
    fn build_type_drops_annotations() {
        let v = Micheline::app(Prim::Pair, vec![1.into(), 2.into()], [ann("%kept")].into());
        let t = v.build_type();
        assert_eq!(t.prim().anns(), &[] as &[Annotation]);
    }

    #[test]
    fn ticket_shape() {
        let t = ticket_type(Some(&app!(string)));
        assert_eq!(t.opcode(), Some(Prim::pair));
        assert_eq!(t.args().len(), 3);
        assert_eq!(t.args()[0].opcode(), Some(Prim::address));
        assert_eq!(t.args()[0].first_field_ann(), Some("ticketer"));
        assert_eq!(t.args()[1], app!(string));
        assert_eq!(t.args()[2].first_field_ann(), Some("amount"));
    }
}
