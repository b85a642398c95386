/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{DecodeError, Pages, PagesBuilder, encode_adjacency, read_vlong};
use std::sync::Arc;

/// A paged block of gap-compressed adjacency lists.
pub type AdjacencyList = Pages<u8>;

/// The per-node index of an [`AdjacencyList`].
///
/// For each node we store the address of its list and its degree, so that
/// degree queries never need to decode anything. Nodes without relationships
/// have address zero and degree zero.
#[derive(Debug, Clone)]
pub struct AdjacencyOffsets {
    offsets: Box<[u64]>,
    degrees: Box<[u32]>,
}

impl AdjacencyOffsets {
    /// Creates an index from its parts.
    ///
    /// # Panics
    ///
    /// Panics if the two slices have different lengths, or if a node has a
    /// nonzero degree but a zero address or vice versa.
    pub fn from_parts(offsets: Box<[u64]>, degrees: Box<[u32]>) -> Self {
        assert_eq!(offsets.len(), degrees.len());
        assert!(
            offsets
                .iter()
                .zip(degrees.iter())
                .all(|(&o, &d)| (o == 0) == (d == 0)),
            "Empty lists must have address zero"
        );
        Self { offsets, degrees }
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    #[inline(always)]
    pub fn offset(&self, node: usize) -> u64 {
        self.offsets[node]
    }

    #[inline(always)]
    pub fn degree(&self, node: usize) -> usize {
        self.degrees[node] as usize
    }

    /// Returns the exact number of bytes used by the index.
    pub fn size_in_bytes(&self) -> usize {
        self.offsets.len() * core::mem::size_of::<u64>()
            + self.degrees.len() * core::mem::size_of::<u32>()
    }
}

/// Packs encoded adjacency lists into an [`AdjacencyList`], recording
/// addresses and degrees.
///
/// Lists must be added in node order, one per node; empty lists are fine.
#[derive(Debug)]
pub struct AdjacencyListBuilder {
    pages: PagesBuilder<u8>,
    offsets: Vec<u64>,
    degrees: Vec<u32>,
    buf: Vec<u8>,
}

impl AdjacencyListBuilder {
    pub fn new(page_shift: u32, num_nodes: usize) -> Self {
        Self {
            pages: PagesBuilder::new(page_shift),
            offsets: Vec::with_capacity(num_nodes),
            degrees: Vec::with_capacity(num_nodes),
            buf: vec![],
        }
    }

    /// Adds the adjacency list of the next node, given as a sorted slice of
    /// targets.
    pub fn add(&mut self, targets: &[usize]) {
        let mut buf = core::mem::take(&mut self.buf);
        buf.clear();
        encode_adjacency(&mut buf, targets);
        self.add_encoded(&buf, targets.len());
        self.buf = buf;
    }

    /// Adds the adjacency list of the next node, already encoded by
    /// [`encode_adjacency`](super::encode_adjacency).
    ///
    /// # Panics
    ///
    /// Panics if `degree` does not fit in a `u32`.
    pub fn add_encoded(&mut self, encoded: &[u8], degree: usize) {
        let degree = u32::try_from(degree)
            .unwrap_or_else(|_| panic!("Degree {degree} does not fit in 32 bits"));
        if degree == 0 {
            self.offsets.push(0);
        } else {
            self.offsets.push(self.pages.push(encoded));
        }
        self.degrees.push(degree);
    }

    pub fn build(self) -> (AdjacencyList, AdjacencyOffsets) {
        (
            self.pages.build(),
            AdjacencyOffsets {
                offsets: self.offsets.into_boxed_slice(),
                degrees: self.degrees.into_boxed_slice(),
            },
        )
    }
}

/// A reusable cursor decoding an adjacency list.
///
/// A cursor shares the block it reads from, but its decoding state is
/// private: it is not meant to be shared between threads, and each
/// concurrent view of a graph owns its own cursors.
///
/// A cursor is positioned with [`init`](Self::init), after which
/// [`next_target`](Self::next_target) returns the targets of the list in
/// order while [`has_next`](Self::has_next) is true.
#[derive(Debug, Clone)]
pub struct DecompressingCursor {
    list: Arc<AdjacencyList>,
    page: usize,
    index: usize,
    remaining: usize,
    last: u64,
}

impl DecompressingCursor {
    /// Creates an exhausted cursor on the given block.
    pub fn new(list: Arc<AdjacencyList>) -> Self {
        Self {
            list,
            page: 0,
            index: 0,
            remaining: 0,
            last: 0,
        }
    }

    /// Positions the cursor at the start of the list with the given address
    /// and degree.
    ///
    /// An address equal to zero always yields an empty list, independently of
    /// `degree`, and never touches the block.
    pub fn init(&mut self, address: u64, degree: usize) -> Result<(), DecodeError> {
        if address == 0 {
            self.remaining = 0;
            return Ok(());
        }
        let (page, index) = self.list.locate(address)?;
        self.page = page;
        self.index = index;
        self.remaining = degree;
        self.last = 0;
        Ok(())
    }

    #[inline(always)]
    pub fn has_next(&self) -> bool {
        self.remaining != 0
    }

    /// Returns the number of targets left in the list.
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Decodes the next target.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is exhausted.
    #[inline]
    pub fn next_target(&mut self) -> Result<usize, DecodeError> {
        assert!(self.remaining != 0, "The cursor is exhausted");
        let (gap, next) = read_vlong(self.list.page(self.page), self.page, self.index)?;
        let target = self.last.checked_add(gap).ok_or(DecodeError::Overflow {
            page: self.page,
            index: self.index,
        })?;
        let node = usize::try_from(target).map_err(|_| DecodeError::Overflow {
            page: self.page,
            index: self.index,
        })?;
        self.index = next;
        self.last = target;
        self.remaining -= 1;
        Ok(node)
    }

    /// Skips targets until one larger than or equal to `target` is found,
    /// returning it, or `None` if the list has no such target.
    pub fn advance(&mut self, target: usize) -> Result<Option<usize>, DecodeError> {
        while self.has_next() {
            let next = self.next_target()?;
            if next >= target {
                return Ok(Some(next));
            }
        }
        Ok(None)
    }
}
