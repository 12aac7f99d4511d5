/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Micheline annotations. An annotation is a short textual label sigiled by
//! `%` (field), `@` (variable), `:` (type) or `$` (free), plus the special
//! forms `@%`, `@%%` and `%@` used by Michelson macros.

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// `@%`, `@%%` or `%@`, stored verbatim.
    Special(String),
    /// `%`-sigiled field name.
    Field(String),
    /// `@`-sigiled variable name.
    Variable(String),
    /// `:`-sigiled type name.
    Type(String),
    /// `$`-sigiled free-form label.
    Free(String),
}

impl Annotation {
    /// Parse an annotation from its sigiled form. The sigil is mandatory;
    /// anything else is [Error::InvalidAnnotation].
    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "@%" | "@%%" | "%@" => return Ok(Annotation::Special(s.to_owned())),
            _ => (),
        }
        let rest = || s[1..].to_owned();
        match s.as_bytes().first() {
            Some(b'@') => Ok(Annotation::Variable(rest())),
            Some(b'%') => Ok(Annotation::Field(rest())),
            Some(b':') => Ok(Annotation::Type(rest())),
            Some(b'$') => Ok(Annotation::Free(rest())),
            _ => Err(Error::InvalidAnnotation(s.to_owned())),
        }
    }
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Annotation::Special(s) => write!(f, "{s}"),
            Annotation::Field(s) => write!(f, "%{s}"),
            Annotation::Variable(s) => write!(f, "@{s}"),
            Annotation::Type(s) => write!(f, ":{s}"),
            Annotation::Free(s) => write!(f, "${s}"),
        }
    }
}

/// An ordered annotation list. Order and exact bytes are preserved across
/// all serialization round-trips.
#[derive(Clone, Default, Eq, PartialEq, Hash)]
pub struct Annotations(Vec<Annotation>);

pub const NO_ANNS: Annotations = Annotations::new();

impl std::fmt::Debug for Annotations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Annotations {
    pub const fn new() -> Self {
        Annotations(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.0
    }

    pub fn push(&mut self, ann: Annotation) {
        self.0.push(ann)
    }

    /// The first `%`-annotation, if any.
    pub fn first_field(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Annotation::Field(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The first `@`-annotation, if any.
    pub fn first_variable(&self) -> Option<&str> {
        self.0.iter().find_map(|a| match a {
            Annotation::Variable(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

impl<T> From<T> for Annotations
where
    T: AsRef<[Annotation]>,
{
    fn from(x: T) -> Self {
        Annotations(Vec::from(x.as_ref()))
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<T: IntoIterator<Item = Annotation>>(iter: T) -> Self {
        Annotations(Vec::from_iter(iter))
    }
}

/// Returns all annotations in the order in which they were given initially.
impl<'a> IntoIterator for &'a Annotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
