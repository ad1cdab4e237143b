// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn allocator_never_returns_zero() {
    let alloc = IdAllocator::new();
    for _ in 0..1000 {
        assert_ne!(alloc.next().get(), 0);
    }
}

#[test]
fn allocator_returns_unique_ids() {
    let alloc = IdAllocator::new();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..1000 {
        assert!(seen.insert(alloc.next()));
    }
}

#[test]
fn allocator_is_monotonic() {
    let alloc = IdAllocator::new();
    let mut last = alloc.next();
    for _ in 0..100 {
        let next = alloc.next();
        assert!(next.get() > last.get());
        last = next;
    }
}

#[test]
fn allocator_shared_across_clones() {
    let a = IdAllocator::new();
    let b = a.clone();
    assert_ne!(a.next(), b.next());
}

#[test]
fn parse_rejects_zero() {
    assert!("0".parse::<PipelineId>().is_err());
}

#[test]
fn parse_rejects_garbage() {
    assert!("not-a-number".parse::<PipelineId>().is_err());
}

#[test]
fn parse_roundtrips_display() {
    let id = PipelineId::from_raw(42).unwrap();
    let parsed: PipelineId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn from_raw_zero_is_none() {
    assert!(PipelineId::from_raw(0).is_none());
}
