/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! Micheline deserialization.

use bitvec::{order::Lsb0, vec::BitVec, view::BitView};
use num_bigint::{BigInt, Sign};
use smallvec::{smallvec, SmallVec};

use super::constants::*;
use crate::ast::annotations::{Annotation, Annotations, NO_ANNS};
use crate::ast::{Micheline, Node};
use crate::error::{Error, Result};
use crate::prim::Prim;

/// If the number of arguments is small, an allocation-avoiding optimization
/// is used. This constant specifies the upper bound for the number of
/// arguments where it triggers. At most we expect primitives with 3
/// arguments.
const EXPECTED_MAX_APP_ARGS: usize = 3;

/// As [EXPECTED_MAX_APP_ARGS], but for sequence elements. 3 elements does
/// not waste too much stack space and covers most small sequences.
const EXPECTED_MAX_SEQ_ELTS: usize = 3;

impl Micheline {
    /// Decode raw binary data. Unknown primitive tags are preserved as
    /// [Prim::Unknown].
    pub fn decode(bytes: &[u8]) -> Result<Micheline> {
        let mut it = bytes.into();
        decode_micheline(&mut it, false)
    }

    /// Decode raw binary data, refusing unknown primitive tags with
    /// [Error::UnknownOpCode].
    pub fn decode_strict(bytes: &[u8]) -> Result<Micheline> {
        let mut it = bytes.into();
        decode_micheline(&mut it, true)
    }

    pub(crate) fn decode_buffer(it: &mut BytesIt, strict: bool) -> Result<Micheline> {
        decode_micheline(it, strict)
    }

    /// Decode the payload of a packed bytes node. Nodes that are not packed
    /// bytes are returned unchanged. Every node produced from the payload is
    /// flagged [Micheline::was_packed].
    pub fn unpack(&self) -> Result<Micheline> {
        match &self.node {
            Node::Bytes(b) if self.is_packed() => {
                let mut up = Micheline::decode(&b[1..])?;
                up.mark_packed();
                Ok(up)
            }
            _ => Ok(self.clone()),
        }
    }

    /// Recursively unpack every bytes node in the tree that holds a
    /// well-formed packed payload. Bytes that merely start with the pack tag
    /// are left alone, so one application reaches a fixed point.
    pub fn unpack_all(&self) -> Result<Micheline> {
        if self.is_packed() {
            return match self.unpack() {
                // the payload may hold packed bytes of its own
                Ok(up) => up.unpack_all(),
                Err(_) => Ok(self.clone()),
            };
        }
        let node = match &self.node {
            Node::Seq(elts) => Node::Seq(
                elts.iter()
                    .map(Micheline::unpack_all)
                    .collect::<Result<_>>()?,
            ),
            Node::App(prim, args, anns) => Node::App(
                *prim,
                args.iter()
                    .map(Micheline::unpack_all)
                    .collect::<Result<_>>()?,
                anns.clone(),
            ),
            other => other.clone(),
        };
        Ok(Micheline {
            node,
            was_packed: self.was_packed,
        })
    }
}

pub(crate) struct BytesIt<'a>(&'a [u8]);

impl<'a> BytesIt<'a> {
    pub(crate) fn take(&mut self, num: usize) -> Option<&'a [u8]> {
        if self.0.len() < num {
            return None;
        }
        let (cur, rest) = self.0.split_at(num);
        self.0 = rest;
        Some(cur)
    }

    fn take_const<const N: usize>(&mut self) -> Option<&'a [u8; N]> {
        self.take(N).map(|x| x.try_into().unwrap())
    }

    pub(crate) fn next(&mut self) -> Option<u8> {
        self.next_ref().copied()
    }

    fn next_ref(&mut self) -> Option<&u8> {
        if self.0.is_empty() {
            return None;
        }
        let res = &self.0[0];
        self.0 = &self.0[1..];
        Some(res)
    }

    fn peek(&self) -> Option<u8> {
        self.0.first().copied()
    }
}

impl<'a> From<&'a [u8]> for BytesIt<'a> {
    fn from(value: &'a [u8]) -> Self {
        BytesIt(value)
    }
}

enum NumArgs {
    Zero,
    One,
    Two,
    Many,
}

fn decode_micheline(bytes: &mut BytesIt, strict: bool) -> Result<Micheline> {
    match bytes.next() {
        None => Err(Error::ShortBuffer),
        Some(b) => match b {
            NUMBER_TAG => decode_int(bytes),
            STRING_TAG => decode_string(bytes),
            SEQ_TAG => decode_seq(bytes, strict),
            BYTES_TAG => decode_bytes(bytes),
            APP_NO_ARGS_NO_ANNOTS_TAG => decode_app(NumArgs::Zero, false, bytes, strict),
            APP_NO_ARGS_WITH_ANNOTS_TAG => decode_app(NumArgs::Zero, true, bytes, strict),
            APP_ONE_ARG_NO_ANNOTS_TAG => decode_app(NumArgs::One, false, bytes, strict),
            APP_ONE_ARG_WITH_ANNOTS_TAG => decode_app(NumArgs::One, true, bytes, strict),
            APP_TWO_ARGS_NO_ANNOTS_TAG => decode_app(NumArgs::Two, false, bytes, strict),
            APP_TWO_ARGS_WITH_ANNOTS_TAG => decode_app(NumArgs::Two, true, bytes, strict),
            APP_GENERIC_TAG => decode_app(NumArgs::Many, true, bytes, strict),
            b => Err(Error::InvalidTag(b)),
        },
    }
}

fn get_len(bytes: &mut BytesIt) -> Result<u32> {
    Ok(u32::from_be_bytes(
        *bytes.take_const::<4>().ok_or(Error::ShortBuffer)?,
    ))
}

fn decode_int(bytes: &mut BytesIt) -> Result<Micheline> {
    let mut bitvec: BitVec<u8, Lsb0> = BitVec::new();
    let mut sign = Sign::Plus;
    let mut first = true;
    loop {
        let bits = bytes
            .next_ref()
            .ok_or(Error::MalformedInt)?
            .view_bits::<Lsb0>();
        let data_len = if first {
            sign = if bits[6] { Sign::Minus } else { Sign::Plus };
            first = false;
            6
        } else {
            7
        };
        bitvec.extend_from_bitslice(&bits[..data_len]);
        if !bits[7] {
            break;
        }
    }
    bitvec.set_uninitialized(false);
    Ok(Micheline::int(BigInt::from_bytes_le(
        sign,
        &bitvec.into_vec(),
    )))
}

fn get_bytes<'a>(bytes: &mut BytesIt<'a>) -> Result<&'a [u8]> {
    let len = get_len(bytes)? as usize;
    bytes.take(len).ok_or(Error::ShortBuffer)
}

fn decode_string(bytes: &mut BytesIt) -> Result<Micheline> {
    let raw = get_bytes(bytes)?;
    let s = std::str::from_utf8(raw)
        .map_err(|_| Error::InvalidString(format!("0x{}", hex::encode(raw))))?;
    Ok(Micheline::string(s))
}

fn decode_bytes(bytes: &mut BytesIt) -> Result<Micheline> {
    Ok(Micheline::bytes(get_bytes(bytes)?.to_vec()))
}

fn decode_seq_raw<const EXPECTED_MAX_ELTS: usize>(
    bytes: &mut BytesIt,
    strict: bool,
) -> Result<SmallVec<[Micheline; EXPECTED_MAX_ELTS]>> {
    let mut bytes: BytesIt = get_bytes(bytes)?.into();
    let mut buf = SmallVec::new();
    while bytes.peek().is_some() {
        buf.push(decode_micheline(&mut bytes, strict)?);
    }
    Ok(buf)
}

fn decode_seq(bytes: &mut BytesIt, strict: bool) -> Result<Micheline> {
    let buf = decode_seq_raw::<EXPECTED_MAX_SEQ_ELTS>(bytes, strict)?;
    Ok(Micheline::seq(buf.into_vec()))
}

fn decode_ann(bytes: &[u8]) -> Result<Annotation> {
    let s = std::str::from_utf8(bytes)
        .map_err(|_| Error::InvalidAnnotation(format!("0x{}", hex::encode(bytes))))?;
    Annotation::parse(s)
}

fn decode_app(
    num_args: NumArgs,
    annotations: bool,
    bytes: &mut BytesIt,
    strict: bool,
) -> Result<Micheline> {
    let tag = bytes.next().ok_or(Error::ShortBuffer)?;
    let prim = match Prim::from_tag(tag) {
        Some(prim) => prim,
        None if strict => return Err(Error::UnknownOpCode(format!("0x{tag:02x}"))),
        None => Prim::Unknown(tag),
    };
    let args: SmallVec<[_; EXPECTED_MAX_APP_ARGS]> = match num_args {
        NumArgs::Zero => SmallVec::new(),
        NumArgs::One => smallvec![decode_micheline(bytes, strict)?],
        NumArgs::Two => smallvec![
            decode_micheline(bytes, strict)?,
            decode_micheline(bytes, strict)?,
        ],
        NumArgs::Many => decode_seq_raw(bytes, strict)?,
    };
    let anns = if annotations {
        let block = get_bytes(bytes)?;
        if block.is_empty() {
            NO_ANNS
        } else {
            block
                .split(|c| c == &b' ')
                .map(decode_ann)
                .collect::<Result<Annotations>>()?
        }
    } else {
        NO_ANNS
    };
    Ok(Micheline::app(prim, args.into_vec(), anns))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::micheline::test_helpers::{app, seq};

    #[track_caller]
    fn check(v: impl Into<Micheline>, hex_bytes: &str) {
        let hex_bytes: &str = hex_bytes
            .strip_prefix("0x")
            .expect("The `expected` argument must start from 0x");
        assert_eq!(
            Micheline::decode(&hex::decode(hex_bytes).expect("Bad hex string")),
            Ok(v.into())
        );
    }

    #[track_caller]
    fn check_err(hex_bytes: &str, err: Error) {
        let hex_bytes: &str = hex_bytes
            .strip_prefix("0x")
            .expect("The `expected` argument must start from 0x");
        assert_eq!(
            Micheline::decode(&hex::decode(hex_bytes).expect("Bad hex string")),
            Err(err)
        );
    }

    fn ann(s: &str) -> Annotation {
        Annotation::parse(s).unwrap()
    }

    #[test]
    fn primitive_values() {
        check((), "0x030b");
        check(true, "0x030a");
        check(false, "0x0303");
    }

    #[test]
    fn errors() {
        check_err("0x", Error::ShortBuffer);
        check_err("0x03", Error::ShortBuffer);
        check_err("0x02", Error::ShortBuffer);
        check_err("0x09", Error::ShortBuffer);
        check_err("0xff", Error::InvalidTag(0xff));
        check_err("0x0100000005abcd", Error::ShortBuffer);
        // unterminated zarith continuation
        check_err("0x0080", Error::MalformedInt);
        // bad annotation sigil
        check_err("0x045b000000026161", Error::InvalidAnnotation("aa".to_owned()));
    }

    #[test]
    fn unknown_prims() {
        // lenient decoding round-trips the unknown tag
        let m = Micheline::decode(&hex::decode("03ff").unwrap()).unwrap();
        assert_eq!(m, Micheline::prim0(Prim::Unknown(0xff)));
        assert_eq!(m.encode(), hex::decode("03ff").unwrap());
        assert_eq!(
            Micheline::decode_strict(&hex::decode("03ff").unwrap()),
            Err(Error::UnknownOpCode("0xff".to_owned()))
        );
    }

    mod number {
        use super::*;

        #[test]
        fn zero() {
            check(0, "0x0000");
        }

        #[test]
        fn few_trivial_samples() {
            check(1, "0x0001");
            check(13, "0x000d");
        }

        #[test]
        fn largest_1_byte_long() {
            check(63, "0x003f");
        }

        #[test]
        fn smallest_2_bytes_long() {
            check(64, "0x008001");
        }

        #[test]
        fn large() {
            check(123456789, "0x0095b4de75");
        }

        #[test]
        fn negative() {
            check(-1, "0x0041");
            check(-36, "0x0064");
            check(-64, "0x00c001");
            check(-987654321, "0x00f1a2f3ad07");
        }
    }

    #[test]
    fn simple_nested() {
        check(app!(Pair[true, ""]), "0x0707030a0100000000");
        check(app!(None), "0x0306");
        check(app!(Some[()]), "0x0509030b");
        check(app!(Elt[true, ()]), "0x0704030a030b");
    }

    #[test]
    fn string() {
        check("", "0x0100000000");
        check("abc", "0x0100000003616263");
    }

    #[test]
    fn bytes() {
        check(Vec::<u8>::new(), "0x0a00000000");
        check(hex::decode("001234abff").unwrap(), "0x0a00000005001234abff");
    }

    #[test]
    fn list() {
        check(seq! {}, "0x0200000000");
        check(seq! {true; false}, "0x0200000004030a0303");
        check(
            seq! {seq!{}; seq!{true}},
            "0x020000000c02000000000200000002030a",
        );
        check(
            seq! {app!(Pair[3, 4]); app!(Pair[5, 6])},
            "0x020000000c070700030004070700050006",
        );
    }

    #[test]
    fn annotations() {
        check(
            Micheline::app(Prim::int, vec![], [ann("%a")].into()),
            "0x045b000000022561",
        );
        check(
            Micheline::app(
                Prim::int,
                vec![],
                [ann("%a"), ann(":b"), ann("@c"), ann("%d")].into(),
            ),
            "0x045b0000000b2561203a62204063202564",
        );
        check(
            Micheline::app(
                Prim::pair,
                vec![Micheline::app(Prim::int, vec![], [ann("%b")].into())],
                [ann("%a")].into(),
            ),
            "0x0665045b000000022562000000022561",
        );
    }

    #[test]
    fn generic_application_round_trips_as_two_arg_form() {
        // a 0x09-framed application with two children re-encodes with 0x08
        let bytes = hex::decode("09650000000400000001000000023a74").unwrap();
        let decoded = Micheline::decode(&bytes).unwrap();
        assert_eq!(
            decoded,
            Micheline::app(
                Prim::pair,
                vec![Micheline::int(0), Micheline::int(1)],
                [ann(":t")].into(),
            )
        );
        assert_eq!(
            decoded.encode(),
            hex::decode("086500000001000000023a74").unwrap()
        );
    }

    mod unpack {
        use super::*;

        #[test]
        fn strips_the_tag_and_flags_nodes() {
            let packed = Micheline::bytes(hex::decode("0507070001070700020003").unwrap());
            let up = packed.unpack().unwrap();
            assert_eq!(up, app!(Pair[1, app!(Pair[2, 3])]));
            assert!(up.was_packed);
            assert!(up.args().iter().all(|a| a.was_packed));
        }

        #[test]
        fn round_trip() {
            let v = app!(Pair[1, seq!{ "x"; "y" }]);
            assert_eq!(Micheline::bytes(v.pack()).unpack().unwrap(), v);
        }

        #[test]
        fn non_packed_nodes_pass_through() {
            let v = Micheline::bytes(vec![0x00, 0x2a]);
            assert_eq!(v.unpack().unwrap(), v);
        }

        #[test]
        fn unpack_all_is_a_fixed_point() {
            let inner = Micheline::int(7).pack();
            let v = app!(Pair[Micheline::bytes(inner), Micheline::bytes(vec![0x05, 0xff])]);
            let once = v.unpack_all().unwrap();
            // the well-formed child was expanded, the junk one kept
            assert_eq!(once.args()[0], Micheline::int(7));
            assert_eq!(once.args()[1], Micheline::bytes(vec![0x05, 0xff]));
            assert_eq!(once.unpack_all().unwrap(), once);
        }

        #[test]
        fn bad_payload_is_an_error() {
            assert_eq!(
                Micheline::bytes(vec![0x05, 0xff]).unpack(),
                Err(Error::InvalidTag(0xff))
            );
        }
    }
}
