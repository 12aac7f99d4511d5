/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Entrypoint discovery over annotated `or` trees.
//!
//! A parameter type routes calls through its outermost chain of `or` types.
//! Every `%`-annotated branch is a named entrypoint; the path of
//! `Left`/`Right` decisions leading to it is its branch, written `/L/R/…`.

use crate::ast::Micheline;
use crate::prim::Prim;
use crate::typ::Type;

/// A named route into a parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    /// Position in depth-first discovery order.
    pub id: usize,
    pub name: String,
    /// The `Left`/`Right` path from the root, e.g. `/R/L`.
    pub branch: String,
    /// The sub-type at the end of the branch.
    pub typ: Micheline,
}

/// The set of entrypoints derived from a parameter type, keyed by name with
/// branch and id lookup. Names are unique; the first discovery wins.
#[derive(Debug, Clone, Default)]
pub struct Entrypoints(Vec<Entrypoint>);

impl Entrypoints {
    pub fn get(&self, name: &str) -> Option<&Entrypoint> {
        self.0.iter().find(|e| e.name == name)
    }

    pub fn find_branch(&self, branch: &str) -> Option<&Entrypoint> {
        self.0.iter().find(|e| e.branch == branch)
    }

    pub fn find_id(&self, id: usize) -> Option<&Entrypoint> {
        self.0.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entrypoint> {
        self.0.iter()
    }

    fn insert(&mut self, name: &str, branch: &str, typ: &Micheline) {
        if self.get(name).is_some() {
            return;
        }
        self.0.push(Entrypoint {
            id: self.0.len(),
            name: name.to_owned(),
            branch: branch.to_owned(),
            typ: typ.clone(),
        });
    }
}

impl Type {
    /// Enumerate the entrypoints of this parameter type.
    ///
    /// A `%`-named `or` branch is an entrypoint at its branch path; the walk
    /// does not continue past it unless `include_interior` is set. A
    /// `%root`- or `%default`-annotated root is recorded under that name. An
    /// unnamed root exposes the terminus of its all-left spine as the
    /// implicit `default` entrypoint.
    pub fn entrypoints(&self, include_interior: bool) -> Entrypoints {
        let mut eps = Entrypoints::default();
        let root = self.prim();
        match root.first_field_ann() {
            Some(name @ ("root" | "default")) => eps.insert(name, "", root),
            _ => (),
        }
        if root.opcode() == Some(Prim::or) {
            collect(root, "", &mut eps, include_interior, false);
        } else if eps.is_empty() {
            eps.insert("default", "", root);
        }
        eps
    }

    /// The branch of the `%name`-annotated node anywhere in the `or` tree,
    /// or [None] when no such annotation exists.
    pub fn search_entrypoint_name(&self, name: &str) -> Option<String> {
        search(self.prim(), name, String::new())
    }
}

fn collect(
    node: &Micheline,
    branch: &str,
    eps: &mut Entrypoints,
    interior: bool,
    below_named: bool,
) {
    for (i, child) in node.args().iter().take(2).enumerate() {
        let br = format!("{branch}/{}", if i == 0 { 'L' } else { 'R' });
        match child.first_field_ann() {
            Some(name) => {
                eps.insert(name, &br, child);
                if interior && child.opcode() == Some(Prim::or) {
                    collect(child, &br, eps, interior, true);
                }
            }
            None if child.opcode() == Some(Prim::or) => {
                collect(child, &br, eps, interior, below_named);
            }
            None => {
                // implicit default at the all-left terminus of an unnamed
                // root chain
                if !below_named && !br.contains('R') {
                    eps.insert("default", &br, child);
                }
            }
        }
    }
}

fn search(node: &Micheline, name: &str, branch: String) -> Option<String> {
    if node.first_field_ann() == Some(name) {
        return Some(branch);
    }
    if node.opcode() != Some(Prim::or) {
        return None;
    }
    for (i, child) in node.args().iter().take(2).enumerate() {
        let br = format!("{branch}/{}", if i == 0 { 'L' } else { 'R' });
        if let Some(found) = search(child, name, br) {
            return Some(found);
        }
    }
    None
}
