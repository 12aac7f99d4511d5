/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Micheline serialization.

use std::mem::size_of;

use tezos_data_encoding::{enc::BinWriter, types::Zarith};

use super::constants::*;
use crate::ast::annotations::{Annotation, Annotations};
use crate::ast::{Micheline, Node};
use crate::prim::Prim;

impl Annotation {
    pub fn encode_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Annotation::Special(s) => out.extend_from_slice(s.as_bytes()),
            Annotation::Field(s) => {
                out.push(b'%');
                out.extend_from_slice(s.as_bytes());
            }
            Annotation::Variable(s) => {
                out.push(b'@');
                out.extend_from_slice(s.as_bytes());
            }
            Annotation::Type(s) => {
                out.push(b':');
                out.extend_from_slice(s.as_bytes());
            }
            Annotation::Free(s) => {
                out.push(b'$');
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
}

impl Annotations {
    /// The length-prefixed annotation block: annotations space-separated, no
    /// trailing space.
    pub fn encode_bytes(&self, out: &mut Vec<u8>) {
        with_patchback_len(out, |out| {
            let mut is_first = true;
            for ann in self.iter() {
                if !is_first {
                    out.push(b' ')
                }
                is_first = false;
                ann.encode_bytes(out);
            }
        })
    }
}

/// Length of some container, stored as a fixed-length big-endian number.
type Len = u32;

fn put_len(len: Len, out: &mut Vec<u8>) {
    out.extend_from_slice(&len.to_be_bytes())
}

fn put_bytes(bs: &[u8], out: &mut Vec<u8>) {
    out.push(BYTES_TAG);
    put_len(bs.len() as Len, out);
    out.extend_from_slice(bs)
}

fn put_string(s: &str, out: &mut Vec<u8>) {
    out.push(STRING_TAG);
    put_len(s.len() as Len, out);
    out.extend_from_slice(s.as_bytes())
}

/// Run `f` against `out` and prefix whatever it wrote with its byte length.
pub(crate) fn with_patchback_len(out: &mut Vec<u8>, f: impl FnOnce(&mut Vec<u8>)) {
    put_len(0, out); // don't know the right length in advance
    let i = out.len();
    let len_place = (i - size_of::<Len>())..i; // to fill length later
    f(out);
    let len_of_written = (out.len() - i) as Len;
    out[len_place].copy_from_slice(&len_of_written.to_be_bytes())
}

fn put_seq(list: &[Micheline], out: &mut Vec<u8>) {
    out.push(SEQ_TAG);
    with_patchback_len(out, |out| {
        for val in list {
            encode_micheline(val, out)
        }
    });
}

fn encode_app(prim: Prim, args: &[Micheline], anns: &Annotations, out: &mut Vec<u8>) {
    match args.len() {
        n @ (0 | 1 | 2) => {
            out.push(match (n, anns.is_empty()) {
                (0, true) => APP_NO_ARGS_NO_ANNOTS_TAG,
                (0, false) => APP_NO_ARGS_WITH_ANNOTS_TAG,
                (1, true) => APP_ONE_ARG_NO_ANNOTS_TAG,
                (1, false) => APP_ONE_ARG_WITH_ANNOTS_TAG,
                (2, true) => APP_TWO_ARGS_NO_ANNOTS_TAG,
                _ => APP_TWO_ARGS_WITH_ANNOTS_TAG,
            });
            out.push(prim.tag());
            for arg in args {
                encode_micheline(arg, out)
            }
            if !anns.is_empty() {
                anns.encode_bytes(out)
            }
        }
        _ => {
            // the generic form always carries an annotation block
            out.push(APP_GENERIC_TAG);
            out.push(prim.tag());
            with_patchback_len(out, |out| {
                for arg in args {
                    encode_micheline(arg, out)
                }
            });
            anns.encode_bytes(out)
        }
    }
}

fn encode_micheline(mich: &Micheline, out: &mut Vec<u8>) {
    match &mich.node {
        Node::Int(n) => {
            out.push(NUMBER_TAG);
            Zarith(n.clone())
                .bin_write(out)
                .unwrap_or_else(|err| panic!("encoding a zarith number unexpectedly failed: {err}"))
        }
        Node::String(s) => put_string(s, out),
        Node::Bytes(b) => put_bytes(b, out),
        Node::Seq(s) => put_seq(s, out),
        Node::App(prim, args, anns) => encode_app(*prim, args, anns, out),
    }
}

impl Micheline {
    /// Serialize a node to the compact binary form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    /// Serialize like `PACK` does, with the leading `0x05` tag.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = vec![PACK_TAG];
        self.encode_into(&mut out);
        out
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        encode_micheline(self, out)
    }
}
