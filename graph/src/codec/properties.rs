/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{DecodeError, Pages, PagesBuilder};
use std::sync::Arc;

/// A paged block of relationship property values.
///
/// Values are stored as raw 64-bit patterns, one per relationship, in the
/// same order as the targets of the corresponding
/// [adjacency list](super::AdjacencyList). They are usually the bits of an
/// `f64`.
pub type PropertyList = Pages<u64>;

/// Packs per-node property values into a [`PropertyList`], recording
/// addresses.
///
/// Values must be added in node order, one slice per node.
#[derive(Debug)]
pub struct PropertyListBuilder {
    pages: PagesBuilder<u64>,
    offsets: Vec<u64>,
}

impl PropertyListBuilder {
    pub fn new(page_shift: u32, num_nodes: usize) -> Self {
        Self {
            pages: PagesBuilder::new(page_shift),
            offsets: Vec::with_capacity(num_nodes),
        }
    }

    pub fn add(&mut self, values: &[u64]) {
        if values.is_empty() {
            self.offsets.push(0);
        } else {
            self.offsets.push(self.pages.push(values));
        }
    }

    pub fn build(self) -> (PropertyList, Box<[u64]>) {
        (self.pages.build(), self.offsets.into_boxed_slice())
    }
}

/// A reusable cursor over the property values of a node.
///
/// Advanced in lockstep with a [`DecompressingCursor`](super::DecompressingCursor)
/// positioned on the same node, it yields the value of each relationship.
#[derive(Debug, Clone)]
pub struct PropertyCursor {
    list: Arc<PropertyList>,
    page: usize,
    index: usize,
    remaining: usize,
}

impl PropertyCursor {
    pub fn new(list: Arc<PropertyList>) -> Self {
        Self {
            list,
            page: 0,
            index: 0,
            remaining: 0,
        }
    }

    /// Positions the cursor at the `degree` values with the given address.
    ///
    /// Checks that the whole record lies in the block, so that
    /// [`next_bits`](Self::next_bits) cannot fail afterwards. Address zero
    /// holds no values, so it is valid only with a zero degree.
    pub fn init(&mut self, address: u64, degree: usize) -> Result<(), DecodeError> {
        if address == 0 {
            if degree != 0 {
                return Err(DecodeError::OffsetOutOfBounds { address });
            }
            self.remaining = 0;
            return Ok(());
        }
        let (page, index) = self.list.locate(address)?;
        if index + degree > self.list.page(page).len() {
            return Err(DecodeError::UnexpectedEnd {
                page,
                index: self.list.page(page).len(),
            });
        }
        self.page = page;
        self.index = index;
        self.remaining = degree;
        Ok(())
    }

    #[inline(always)]
    pub fn has_next(&self) -> bool {
        self.remaining != 0
    }

    /// Returns the raw bits of the next value.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is exhausted.
    #[inline(always)]
    pub fn next_bits(&mut self) -> u64 {
        assert!(self.remaining != 0, "The cursor is exhausted");
        let bits = self.list.page(self.page)[self.index];
        self.index += 1;
        self.remaining -= 1;
        bits
    }

    /// Returns the next value as an `f64`.
    #[inline(always)]
    pub fn next_value(&mut self) -> f64 {
        f64::from_bits(self.next_bits())
    }
}
