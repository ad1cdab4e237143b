// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::brain::MemoryBrain;
use murmur_core::environment::CALLER_ID;

fn factory() -> ContextFactory {
    ContextFactory::new(
        Arc::new(ActiveRegistry::new()),
        Arc::new(MemoryBrain::new()),
        Arc::new(RwLock::new(None)),
        Arc::new(RwLock::new(ConfigSnapshot {
            default_protocol: "terminal".to_string(),
            install_dir: "/install".to_string(),
            config_dir: "/config".to_string(),
            workspace_dir: "/workspace".to_string(),
            http_post_base_url: "http://127.0.0.1:7000".to_string(),
            ..Default::default()
        })),
    )
}

#[tokio::test]
async fn create_seeds_environment() {
    let factory = factory();
    let ctx = factory.create(None).await.unwrap();
    ctx.with_state(|s| {
        assert_eq!(s.environment.get(CALLER_ID), Some(ctx.id.to_string().as_str()));
        assert_eq!(s.environment.get("INSTALLDIR"), Some("/install"));
        assert_eq!(s.working_directory, "/workspace");
        assert!(s.stored_env.task_params.is_empty());
    });
}

#[tokio::test]
async fn create_without_key_has_empty_stored_env() {
    let factory = factory();
    let ctx = factory.create(None).await.unwrap();
    ctx.with_state(|s| assert!(s.stored_env.task_params.is_empty()));
}

#[tokio::test]
async fn create_links_parent_and_child() {
    let factory = factory();
    let parent = factory.create(None).await.unwrap();
    let child = factory.create(Some(parent.id)).await.unwrap();

    parent.with_state(|s| assert_eq!(s.child, Some(child.id)));
    child.with_state(|s| assert_eq!(s.parent, Some(parent.id)));
}

#[tokio::test]
async fn every_created_context_is_registered() {
    let factory = factory();
    let ctx = factory.create(None).await.unwrap();
    assert!(factory.registry.lookup(ctx.id).is_some());
}

#[tokio::test]
async fn clone_and_register_resets_environment_but_links_parent() {
    let factory = factory();
    let parent = factory.create(None).await.unwrap();
    parent.with_state_mut(|s| s.user = "alice".to_string());

    let child = factory.clone_and_register(&parent);
    child.with_state(|s| {
        assert!(s.environment.is_empty());
        assert_eq!(s.user, "alice");
        assert_eq!(s.parent, Some(parent.id));
    });
    parent.with_state(|s| assert_eq!(s.child, Some(child.id)));
    assert!(factory.registry.lookup(child.id).is_some());
}

#[tokio::test]
async fn ids_are_unique_across_create_and_clone() {
    let factory = factory();
    let a = factory.create(None).await.unwrap();
    let b = factory.clone_and_register(&a);
    let c = factory.create(None).await.unwrap();
    assert_ne!(a.id, b.id);
    assert_ne!(b.id, c.id);
    assert_ne!(a.id, c.id);
}
