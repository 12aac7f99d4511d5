/******************************************************************************/
/*                                                                            */
/* SPDX-License-Identifier: MIT                                               */
/* Copyright (c) [2023] Serokell <hi@serokell.io>                             */
/*                                                                            */
/******************************************************************************/

/// Prefix denoting an encoded number.
pub const NUMBER_TAG: u8 = 0x00;
/// Prefix denoting an encoded string.
pub const STRING_TAG: u8 = 0x01;
/// Prefix denoting an encoded sequence.
pub const SEQ_TAG: u8 = 0x02;
/// Prefix denoting an encoded bytes sequence.
pub const BYTES_TAG: u8 = 0x0a;

// Tags for primitive applications.
pub const APP_NO_ARGS_NO_ANNOTS_TAG: u8 = 0x03;
pub const APP_NO_ARGS_WITH_ANNOTS_TAG: u8 = 0x04;
pub const APP_ONE_ARG_NO_ANNOTS_TAG: u8 = 0x05;
pub const APP_ONE_ARG_WITH_ANNOTS_TAG: u8 = 0x06;
pub const APP_TWO_ARGS_NO_ANNOTS_TAG: u8 = 0x07;
pub const APP_TWO_ARGS_WITH_ANNOTS_TAG: u8 = 0x08;
pub const APP_GENERIC_TAG: u8 = 0x09;

/// Leading byte of a `PACK`ed blob. Coincides with
/// [APP_ONE_ARG_NO_ANNOTS_TAG] but is applied to a whole byte string.
pub const PACK_TAG: u8 = 0x05;
