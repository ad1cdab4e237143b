// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn id(n: u64) -> PipelineId {
    PipelineId::from_raw(n).unwrap()
}

#[test]
fn first_claim_acquires_immediately() {
    let mgr = ExclusivityManager::new();
    match mgr.claim("deploy", id(1), true) {
        Claim::Acquired => {}
        _ => panic!("expected Acquired"),
    }
    assert_eq!(mgr.holder("deploy"), Some(id(1)));
}

#[test]
fn second_claim_without_queueing_is_refused() {
    let mgr = ExclusivityManager::new();
    assert!(matches!(mgr.claim("deploy", id(1), true), Claim::Acquired));
    match mgr.claim("deploy", id(2), false) {
        Claim::Refused => {}
        _ => panic!("expected Refused"),
    }
}

#[test]
fn second_claim_with_queueing_queues() {
    let mgr = ExclusivityManager::new();
    assert!(matches!(mgr.claim("deploy", id(1), true), Claim::Acquired));
    match mgr.claim("deploy", id(2), true) {
        Claim::Queued(_) => {}
        _ => panic!("expected Queued"),
    }
    assert_eq!(mgr.queue_len("deploy"), 1);
}

#[test]
fn release_promotes_next_waiter() {
    let mgr = ExclusivityManager::new();
    assert!(matches!(mgr.claim("deploy", id(1), true), Claim::Acquired));
    let queued = match mgr.claim("deploy", id(2), true) {
        Claim::Queued(q) => q,
        _ => panic!("expected Queued"),
    };
    mgr.release("deploy", id(1));
    assert_eq!(mgr.holder("deploy"), Some(id(2)));

    tokio_test_block_on(queued.wait());
}

#[test]
fn release_with_empty_queue_frees_tag() {
    let mgr = ExclusivityManager::new();
    assert!(matches!(mgr.claim("deploy", id(1), true), Claim::Acquired));
    mgr.release("deploy", id(1));
    assert_eq!(mgr.holder("deploy"), None);
}

#[test]
fn release_by_non_holder_is_noop() {
    let mgr = ExclusivityManager::new();
    assert!(matches!(mgr.claim("deploy", id(1), true), Claim::Acquired));
    mgr.release("deploy", id(2));
    assert_eq!(mgr.holder("deploy"), Some(id(1)));
}

#[test]
fn fifo_ordering_among_waiters() {
    let mgr = ExclusivityManager::new();
    assert!(matches!(mgr.claim("deploy", id(1), true), Claim::Acquired));
    let _q2 = match mgr.claim("deploy", id(2), true) {
        Claim::Queued(q) => q,
        _ => panic!(),
    };
    let _q3 = match mgr.claim("deploy", id(3), true) {
        Claim::Queued(q) => q,
        _ => panic!(),
    };
    mgr.release("deploy", id(1));
    assert_eq!(mgr.holder("deploy"), Some(id(2)));
    mgr.release("deploy", id(2));
    assert_eq!(mgr.holder("deploy"), Some(id(3)));
}

#[test]
fn unrelated_tags_are_independent() {
    let mgr = ExclusivityManager::new();
    assert!(matches!(mgr.claim("deploy", id(1), true), Claim::Acquired));
    assert!(matches!(mgr.claim("release", id(1), true), Claim::Acquired));
}

fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("build current-thread runtime")
        .block_on(f)
}
