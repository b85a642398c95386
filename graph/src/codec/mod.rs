/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Variable-length integer codes and compressed blocks.
//!
//! Adjacency lists are stored as sorted sequences of target ids, which are
//! [gap-encoded](encode_adjacency) and then written using a little-endian
//! base-128 code: each byte carries seven bits of payload, and the highest bit
//! is set on every byte but the last one of a value. Small gaps thus occupy a
//! single byte.
//!
//! Compressed data lives in [paged blocks](pages::Pages), addressed by a single
//! `u64` combining a page index and an in-page index. Address zero is reserved
//! as the sentinel for empty lists.

pub mod adjacency;
pub mod pages;
pub mod properties;

pub use adjacency::*;
pub use pages::*;
pub use properties::*;

use thiserror::Error;

/// Errors raised while reading compressed blocks.
///
/// These errors signal that an address or a length stored in an offset index
/// does not agree with the block it refers to: the data is corrupt, and no
/// value read from it can be trusted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Address {address:#x} points outside of the compressed block")]
    OffsetOutOfBounds { address: u64 },
    #[error("The compressed block ends in the middle of a value (page {page}, index {index})")]
    UnexpectedEnd { page: usize, index: usize },
    #[error("Decoded value at page {page}, index {index} does not fit in a node id")]
    Overflow { page: usize, index: usize },
}

/// Writes `value` to `buf` using a variable-length code, returning the number
/// of bytes written.
#[inline]
pub fn write_vlong(buf: &mut Vec<u8>, mut value: u64) -> usize {
    let mut written = 1;
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
        written += 1;
    }
    buf.push(value as u8);
    written
}

/// Returns the number of bytes [`write_vlong`] would use for `value`.
#[inline(always)]
pub fn vlong_len(value: u64) -> usize {
    // One byte every seven significant bits, and at least one byte.
    (64 - (value | 1).leading_zeros() as usize).div_ceil(7)
}

/// Reads a value written by [`write_vlong`] starting at `bytes[index]`.
///
/// Returns the value and the index of the first byte after it. `page` is used
/// only to report errors.
#[inline]
pub fn read_vlong(bytes: &[u8], page: usize, index: usize) -> Result<(u64, usize), DecodeError> {
    let mut value = 0_u64;
    let mut shift = 0;
    let mut pos = index;
    loop {
        let &byte = bytes
            .get(pos)
            .ok_or(DecodeError::UnexpectedEnd { page, index: pos })?;
        pos += 1;
        let payload = (byte & 0x7F) as u64;
        if shift == 63 && payload > 1 || shift > 63 {
            return Err(DecodeError::Overflow { page, index });
        }
        value |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok((value, pos));
        }
        shift += 7;
    }
}

/// Gap-encodes a sorted list of target ids into `buf`.
///
/// The first id is written as is, every following id as the difference with
/// its predecessor. Returns the number of bytes written.
///
/// # Panics
///
/// Panics if `targets` is not sorted in nondecreasing order.
pub fn encode_adjacency(buf: &mut Vec<u8>, targets: &[usize]) -> usize {
    let mut prev = 0;
    let mut written = 0;
    for &target in targets {
        assert!(
            target >= prev,
            "Adjacency lists must be sorted ({target} follows {prev})"
        );
        written += write_vlong(buf, (target - prev) as u64);
        prev = target;
    }
    written
}

/// Returns the number of bytes [`encode_adjacency`] would use for `targets`.
pub fn adjacency_len(targets: &[usize]) -> usize {
    let mut prev = 0;
    targets
        .iter()
        .map(|&target| {
            let len = vlong_len(target.wrapping_sub(prev) as u64);
            prev = target;
            len
        })
        .sum()
}
