/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

//! The Michelson primitive registry: every known keyword, data constructor,
//! instruction and type constructor, with its canonical name and its single
//! wire tag byte.
//!
//! The list follows the protocol's canonical ordering, so the wire tag of
//! each primitive is simply its position in the table. Wire tags outside the
//! table decode to [Prim::Unknown], which survives re-encoding unchanged;
//! strict decoding refuses them instead.

/// The broad kind of a primitive. Keywords shape scripts (`parameter`,
/// `storage`, `code`, `view`), data constructors shape values, instructions
/// shape code, type constructors shape types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimKind {
    Keyword,
    Data,
    Instr,
    Type,
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("unknown primitive: {0}")]
pub struct PrimError(pub String);

/// Takes the table of primitives in canonical wire order and defines the
/// `Prim` enum together with its tag, name and kind mappings. `FromStr` and
/// `Display` use the stringified identifiers, which are the canonical
/// protocol names.
macro_rules! defprim {
    ($($prim:ident = ($tag:literal, $kind:ident)),* $(,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(non_camel_case_types, clippy::upper_case_acronyms)]
        pub enum Prim {
            $($prim,)*
            /// A wire tag outside the registry, preserved for re-encoding.
            Unknown(u8),
        }

        impl Prim {
            /// The wire tag byte of this primitive.
            pub fn tag(self) -> u8 {
                match self {
                    $(Prim::$prim => $tag,)*
                    Prim::Unknown(tag) => tag,
                }
            }

            /// Look a primitive up by wire tag.
            pub fn from_tag(tag: u8) -> Option<Self> {
                match tag {
                    $($tag => Some(Prim::$prim),)*
                    _ => None,
                }
            }

            /// The kind of this primitive; [None] for unknown tags.
            pub fn kind(self) -> Option<PrimKind> {
                match self {
                    $(Prim::$prim => Some(PrimKind::$kind),)*
                    Prim::Unknown(_) => None,
                }
            }
        }

        impl std::fmt::Display for Prim {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Prim::$prim => write!(f, "{}", stringify!($prim)),)*
                    Prim::Unknown(tag) => write!(f, "UNKNOWN_0x{tag:02x}"),
                }
            }
        }

        impl std::str::FromStr for Prim {
            type Err = PrimError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($prim) => Ok(Prim::$prim),)*
                    _ => Err(PrimError(s.to_owned())),
                }
            }
        }
    };
}

defprim! {
    parameter = (0x00, Keyword),
    storage = (0x01, Keyword),
    code = (0x02, Keyword),
    False = (0x03, Data),
    Elt = (0x04, Data),
    Left = (0x05, Data),
    None = (0x06, Data),
    Pair = (0x07, Data),
    Right = (0x08, Data),
    Some = (0x09, Data),
    True = (0x0a, Data),
    Unit = (0x0b, Data),
    PACK = (0x0c, Instr),
    UNPACK = (0x0d, Instr),
    BLAKE2B = (0x0e, Instr),
    SHA256 = (0x0f, Instr),
    SHA512 = (0x10, Instr),
    ABS = (0x11, Instr),
    ADD = (0x12, Instr),
    AMOUNT = (0x13, Instr),
    AND = (0x14, Instr),
    BALANCE = (0x15, Instr),
    CAR = (0x16, Instr),
    CDR = (0x17, Instr),
    CHECK_SIGNATURE = (0x18, Instr),
    COMPARE = (0x19, Instr),
    CONCAT = (0x1a, Instr),
    CONS = (0x1b, Instr),
    CREATE_ACCOUNT = (0x1c, Instr),
    CREATE_CONTRACT = (0x1d, Instr),
    IMPLICIT_ACCOUNT = (0x1e, Instr),
    DIP = (0x1f, Instr),
    DROP = (0x20, Instr),
    DUP = (0x21, Instr),
    EDIV = (0x22, Instr),
    EMPTY_MAP = (0x23, Instr),
    EMPTY_SET = (0x24, Instr),
    EQ = (0x25, Instr),
    EXEC = (0x26, Instr),
    FAILWITH = (0x27, Instr),
    GE = (0x28, Instr),
    GET = (0x29, Instr),
    GT = (0x2a, Instr),
    HASH_KEY = (0x2b, Instr),
    IF = (0x2c, Instr),
    IF_CONS = (0x2d, Instr),
    IF_LEFT = (0x2e, Instr),
    IF_NONE = (0x2f, Instr),
    INT = (0x30, Instr),
    LAMBDA = (0x31, Instr),
    LE = (0x32, Instr),
    LEFT = (0x33, Instr),
    LOOP = (0x34, Instr),
    LSL = (0x35, Instr),
    LSR = (0x36, Instr),
    LT = (0x37, Instr),
    MAP = (0x38, Instr),
    MEM = (0x39, Instr),
    MUL = (0x3a, Instr),
    NEG = (0x3b, Instr),
    NEQ = (0x3c, Instr),
    NIL = (0x3d, Instr),
    NONE = (0x3e, Instr),
    NOT = (0x3f, Instr),
    NOW = (0x40, Instr),
    OR = (0x41, Instr),
    PAIR = (0x42, Instr),
    PUSH = (0x43, Instr),
    RIGHT = (0x44, Instr),
    SIZE = (0x45, Instr),
    SOME = (0x46, Instr),
    SOURCE = (0x47, Instr),
    SENDER = (0x48, Instr),
    SELF = (0x49, Instr),
    STEPS_TO_QUOTA = (0x4a, Instr),
    SUB = (0x4b, Instr),
    SWAP = (0x4c, Instr),
    TRANSFER_TOKENS = (0x4d, Instr),
    SET_DELEGATE = (0x4e, Instr),
    UNIT = (0x4f, Instr),
    UPDATE = (0x50, Instr),
    XOR = (0x51, Instr),
    ITER = (0x52, Instr),
    LOOP_LEFT = (0x53, Instr),
    ADDRESS = (0x54, Instr),
    CONTRACT = (0x55, Instr),
    ISNAT = (0x56, Instr),
    CAST = (0x57, Instr),
    RENAME = (0x58, Instr),
    bool = (0x59, Type),
    contract = (0x5a, Type),
    int = (0x5b, Type),
    key = (0x5c, Type),
    key_hash = (0x5d, Type),
    lambda = (0x5e, Type),
    list = (0x5f, Type),
    map = (0x60, Type),
    big_map = (0x61, Type),
    nat = (0x62, Type),
    option = (0x63, Type),
    or = (0x64, Type),
    pair = (0x65, Type),
    set = (0x66, Type),
    signature = (0x67, Type),
    string = (0x68, Type),
    bytes = (0x69, Type),
    mutez = (0x6a, Type),
    timestamp = (0x6b, Type),
    unit = (0x6c, Type),
    operation = (0x6d, Type),
    address = (0x6e, Type),
    SLICE = (0x6f, Instr),
    DIG = (0x70, Instr),
    DUG = (0x71, Instr),
    EMPTY_BIG_MAP = (0x72, Instr),
    APPLY = (0x73, Instr),
    chain_id = (0x74, Type),
    CHAIN_ID = (0x75, Instr),
    LEVEL = (0x76, Instr),
    SELF_ADDRESS = (0x77, Instr),
    never = (0x78, Type),
    NEVER = (0x79, Instr),
    UNPAIR = (0x7a, Instr),
    VOTING_POWER = (0x7b, Instr),
    TOTAL_VOTING_POWER = (0x7c, Instr),
    KECCAK = (0x7d, Instr),
    SHA3 = (0x7e, Instr),
    PAIRING_CHECK = (0x7f, Instr),
    bls12_381_g1 = (0x80, Type),
    bls12_381_g2 = (0x81, Type),
    bls12_381_fr = (0x82, Type),
    sapling_state = (0x83, Type),
    sapling_transaction_deprecated = (0x84, Type),
    SAPLING_EMPTY_STATE = (0x85, Instr),
    SAPLING_VERIFY_UPDATE = (0x86, Instr),
    ticket = (0x87, Type),
    TICKET_DEPRECATED = (0x88, Instr),
    READ_TICKET = (0x89, Instr),
    SPLIT_TICKET = (0x8a, Instr),
    JOIN_TICKETS = (0x8b, Instr),
    GET_AND_UPDATE = (0x8c, Instr),
    chest = (0x8d, Type),
    chest_key = (0x8e, Type),
    OPEN_CHEST = (0x8f, Instr),
    VIEW = (0x90, Instr),
    view = (0x91, Keyword),
    constant = (0x92, Keyword),
    SUB_MUTEZ = (0x93, Instr),
    tx_rollup_l2_address = (0x94, Type),
    MIN_BLOCK_TIME = (0x95, Instr),
    sapling_transaction = (0x96, Type),
    EMIT = (0x97, Instr),
    Lambda_rec = (0x98, Data),
    LAMBDA_REC = (0x99, Instr),
    TICKET = (0x9a, Instr),
    BYTES = (0x9b, Instr),
    NAT = (0x9c, Instr),
    Ticket = (0x9d, Data),
}

impl Prim {
    pub fn is_keyword(self) -> bool {
        self.kind() == Some(PrimKind::Keyword)
    }

    pub fn is_data(self) -> bool {
        self.kind() == Some(PrimKind::Data)
    }

    pub fn is_instr(self) -> bool {
        self.kind() == Some(PrimKind::Instr)
    }

    pub fn is_type(self) -> bool {
        self.kind() == Some(PrimKind::Type)
    }
}
