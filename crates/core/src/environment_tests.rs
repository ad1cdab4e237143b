// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_is_empty() {
    let env = Environment::new();
    assert!(env.is_empty());
    assert_eq!(env.len(), 0);
}

#[test]
fn set_and_get() {
    let mut env = Environment::new();
    env.set("FOO", "bar");
    assert_eq!(env.get("FOO"), Some("bar"));
    assert_eq!(env.get("MISSING"), None);
}

#[test]
fn set_overwrites() {
    let mut env = Environment::new();
    env.set("FOO", "bar");
    env.set("FOO", "baz");
    assert_eq!(env.get("FOO"), Some("baz"));
    assert_eq!(env.len(), 1);
}

#[test]
fn layered_with_overrides_base() {
    let mut base = Environment::new();
    base.set("A", "1");
    base.set("B", "2");
    let mut overlay = Environment::new();
    overlay.set("B", "20");
    overlay.set("C", "3");

    let merged = base.layered_with(&overlay);
    assert_eq!(merged.get("A"), Some("1"));
    assert_eq!(merged.get("B"), Some("20"));
    assert_eq!(merged.get("C"), Some("3"));
    // base is untouched
    assert_eq!(base.get("B"), Some("2"));
}

#[test]
fn iter_yields_all_pairs() {
    let mut env = Environment::new();
    env.set("A", "1");
    env.set("B", "2");
    let pairs: Vec<_> = env.iter().collect();
    assert_eq!(pairs.len(), 2);
}
