/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use vcgraph::codec::*;

fn decode_all(cursor: &mut DecompressingCursor) -> Result<Vec<usize>> {
    let mut targets = vec![];
    while cursor.has_next() {
        targets.push(cursor.next_target()?);
    }
    Ok(targets)
}

fn round_trip(lists: &[Vec<usize>], page_shift: u32) -> Result<()> {
    let mut builder = AdjacencyListBuilder::new(page_shift, lists.len());
    for list in lists {
        builder.add(list);
    }
    let (list, offsets) = builder.build();
    let list = Arc::new(list);
    let mut cursor = DecompressingCursor::new(list.clone());
    for (node, expected) in lists.iter().enumerate() {
        assert_eq!(offsets.degree(node), expected.len());
        assert_eq!(offsets.offset(node) == 0, expected.is_empty());
        cursor.init(offsets.offset(node), offsets.degree(node))?;
        assert_eq!(&decode_all(&mut cursor)?, expected, "node {node}");
    }
    Ok(())
}

#[test]
fn test_round_trip_edge_cases() -> Result<()> {
    round_trip(
        &[
            vec![],
            vec![0],
            vec![7],
            vec![0, 0, 0],
            vec![1, 2, 3, 127, 128, 16383, 16384],
            vec![usize::MAX >> 1],
            vec![],
        ],
        DEFAULT_PAGE_SHIFT,
    )
}

#[test]
fn test_round_trip_random() -> Result<()> {
    let mut rng = SmallRng::seed_from_u64(0);
    for page_shift in [4, 8, DEFAULT_PAGE_SHIFT] {
        let lists = (0..200)
            .map(|_| {
                let len = rng.random_range(0..60);
                let mut list = (0..len)
                    .map(|_| rng.random_range(0..1_000_000))
                    .collect::<Vec<usize>>();
                list.sort_unstable();
                list
            })
            .collect::<Vec<_>>();
        round_trip(&lists, page_shift)?;
    }
    Ok(())
}

#[test]
fn test_oversize_lists() -> Result<()> {
    // Pages of 16 bytes, lists of 1000 bytes
    let lists = (0..5)
        .map(|i| (0..1000).map(|j| i + j).collect::<Vec<usize>>())
        .collect::<Vec<_>>();
    round_trip(&lists, 4)
}

#[test]
fn test_empty_cursor_never_touches_block() -> Result<()> {
    let mut builder = AdjacencyListBuilder::new(DEFAULT_PAGE_SHIFT, 1);
    builder.add(&[]);
    let (list, offsets) = builder.build();
    let mut cursor = DecompressingCursor::new(Arc::new(list));
    assert_eq!(offsets.offset(0), 0);
    // A bogus degree is ignored for address zero
    cursor.init(0, 42)?;
    assert!(!cursor.has_next());
    Ok(())
}

#[test]
fn test_corrupt_offsets() -> Result<()> {
    let mut builder = AdjacencyListBuilder::new(DEFAULT_PAGE_SHIFT, 1);
    builder.add(&[1, 2, 3]);
    let (list, _) = builder.build();
    let len = list.size_in_bytes() as u64;
    let mut cursor = DecompressingCursor::new(Arc::new(list));

    assert_eq!(
        cursor.init(len, 1),
        Err(DecodeError::OffsetOutOfBounds { address: len })
    );
    assert!(cursor.init(1 << 40, 1).is_err());

    // A degree larger than the list runs past the end of the block
    cursor.init(1, 4)?;
    for _ in 0..3 {
        cursor.next_target()?;
    }
    assert!(matches!(
        cursor.next_target(),
        Err(DecodeError::UnexpectedEnd { .. })
    ));
    Ok(())
}

#[test]
fn test_properties() -> Result<()> {
    let mut builder = PropertyListBuilder::new(2, 3);
    builder.add(&[1.5_f64.to_bits(), 2.5_f64.to_bits()]);
    builder.add(&[]);
    builder.add(&(0..10).map(|i| (i as f64).to_bits()).collect::<Vec<_>>());
    let (list, offsets) = builder.build();
    assert_eq!(offsets[1], 0);
    let mut cursor = PropertyCursor::new(Arc::new(list));

    cursor.init(offsets[0], 2)?;
    assert_eq!(cursor.next_value(), 1.5);
    assert_eq!(cursor.next_value(), 2.5);
    assert!(!cursor.has_next());

    cursor.init(offsets[2], 10)?;
    let mut values = vec![];
    while cursor.has_next() {
        values.push(cursor.next_value());
    }
    assert_eq!(values, (0..10).map(|i| i as f64).collect::<Vec<_>>());

    assert!(cursor.init(offsets[0], 4).is_err());

    // Address zero holds no values
    cursor.init(offsets[1], 0)?;
    assert!(!cursor.has_next());
    assert_eq!(
        cursor.init(0, 3),
        Err(DecodeError::OffsetOutOfBounds { address: 0 })
    );
    Ok(())
}
