/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::DecodeError;

/// The default page shift: pages of 2¹⁸ elements.
pub const DEFAULT_PAGE_SHIFT: u32 = 18;
/// The largest accepted page shift.
pub const MAX_PAGE_SHIFT: u32 = 30;

/// A sequence of pages holding variable-length records.
///
/// A record never straddles two pages: records that do not fit in the space
/// left in the current page start a new one, and records larger than a page
/// get an oversize page of their own. A record is addressed by
/// `page << page_shift | index`, where `index` is its position in the page.
///
/// The first element of the first page is never used, so that a valid address
/// is never zero: zero can then be used to denote an empty record.
#[derive(Debug, Clone)]
pub struct Pages<T> {
    pages: Box<[Box<[T]>]>,
    page_shift: u32,
}

impl<T> Pages<T> {
    /// Returns the page shift.
    pub fn page_shift(&self) -> u32 {
        self.page_shift
    }

    /// Returns the number of pages.
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    /// Returns the exact number of bytes used by the pages.
    pub fn size_in_bytes(&self) -> usize {
        self.pages
            .iter()
            .map(|page| page.len() * core::mem::size_of::<T>())
            .sum()
    }

    /// Splits `address` into a page index and an in-page index, checking that
    /// the address points into the block.
    pub fn locate(&self, address: u64) -> Result<(usize, usize), DecodeError> {
        let page = (address >> self.page_shift) as usize;
        let index = (address & ((1 << self.page_shift) - 1)) as usize;
        match self.pages.get(page) {
            Some(p) if address != 0 && index < p.len() => Ok((page, index)),
            _ => Err(DecodeError::OffsetOutOfBounds { address }),
        }
    }

    /// Returns the page with the given index.
    #[inline(always)]
    pub fn page(&self, page: usize) -> &[T] {
        &self.pages[page]
    }
}

/// Accumulates records into [`Pages`].
#[derive(Debug)]
pub struct PagesBuilder<T> {
    page_shift: u32,
    pages: Vec<Box<[T]>>,
    current: Vec<T>,
}

impl<T: Copy + Default> PagesBuilder<T> {
    /// Creates a new builder.
    ///
    /// # Panics
    ///
    /// Panics if `page_shift` is zero or larger than [`MAX_PAGE_SHIFT`].
    pub fn new(page_shift: u32) -> Self {
        assert!(
            (1..=MAX_PAGE_SHIFT).contains(&page_shift),
            "The page shift must be in [1 . . {MAX_PAGE_SHIFT}], got {page_shift}"
        );
        Self {
            page_shift,
            pages: vec![],
            // The reserved element
            current: vec![T::default()],
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let page = core::mem::take(&mut self.current);
            self.pages.push(page.into_boxed_slice());
        }
    }

    /// Appends a nonempty record, returning its address.
    pub fn push(&mut self, record: &[T]) -> u64 {
        debug_assert!(!record.is_empty());
        let page_size = 1_usize << self.page_shift;
        if record.len() > page_size {
            self.flush();
            let address = (self.pages.len() as u64) << self.page_shift;
            self.pages.push(record.into());
            return address;
        }
        if self.current.len() + record.len() > page_size {
            self.flush();
        }
        let address = (self.pages.len() as u64) << self.page_shift | self.current.len() as u64;
        self.current.extend_from_slice(record);
        address
    }

    pub fn build(mut self) -> Pages<T> {
        self.flush();
        Pages {
            pages: self.pages.into_boxed_slice(),
            page_shift: self.page_shift,
        }
    }
}
