//! 操作闸门集成测试

use gym_system::{
    error::AppError,
    models::{GranteeType, ResourceKind, Role},
    services::{authorize, Action, PermissionResolver},
};
use uuid::Uuid;

mod common;
use common::{principal, resource, MemoryStore};

#[tokio::test]
async fn test_index_always_allowed() {
    let store = MemoryStore::new();
    let mut resolver = PermissionResolver::new(&store, &store);

    for role in [Role::Super, Role::Admin, Role::Personal, Role::Client] {
        let p = principal(role, Uuid::new_v4());
        assert!(authorize(&mut resolver, Action::Index, &p, ResourceKind::Diet, None)
            .await
            .is_ok());
    }
}

#[tokio::test]
async fn test_create_is_role_only() {
    let store = MemoryStore::new();
    let mut resolver = PermissionResolver::new(&store, &store);
    let gym = Uuid::new_v4();

    for role in [Role::Super, Role::Admin, Role::Personal] {
        let p = principal(role, gym);
        assert!(authorize(&mut resolver, Action::Create, &p, ResourceKind::Training, None)
            .await
            .is_ok());
    }

    let client = principal(Role::Client, gym);
    assert!(matches!(
        authorize(&mut resolver, Action::Create, &client, ResourceKind::Training, None).await,
        Err(AppError::Forbidden)
    ));
    assert_eq!(store.grant_queries(), 0);
}

#[tokio::test]
async fn test_missing_resource_is_not_found() {
    let store = MemoryStore::new();
    let mut resolver = PermissionResolver::new(&store, &store);
    let p = principal(Role::Super, Uuid::new_v4());

    for action in [Action::Show, Action::Update, Action::Delete, Action::Clone] {
        assert!(matches!(
            authorize(&mut resolver, action, &p, ResourceKind::Diet, None).await,
            Err(AppError::NotFound)
        ));
    }
}

#[tokio::test]
async fn test_update_and_delete_follow_can_edit() {
    let store = MemoryStore::new();
    let coach = principal(Role::Personal, Uuid::new_v4());
    let foreign = Uuid::new_v4();
    let r = resource(foreign);

    let mut resolver = PermissionResolver::new(&store, &store);
    for action in [Action::Update, Action::Delete] {
        assert!(matches!(
            authorize(&mut resolver, action, &coach, ResourceKind::Diet, Some(&r)).await,
            Err(AppError::Forbidden)
        ));
    }

    store.grant_tenant(foreign, coach.id, true, false);
    let mut resolver = PermissionResolver::new(&store, &store);
    for action in [Action::Update, Action::Delete] {
        assert!(authorize(&mut resolver, action, &coach, ResourceKind::Diet, Some(&r))
            .await
            .is_ok());
    }
}

#[tokio::test]
async fn test_show_rules() {
    let store = MemoryStore::new();
    let gym = Uuid::new_v4();
    let client = principal(Role::Client, gym);
    let mut resolver = PermissionResolver::new(&store, &store);

    // 本健身房资源：可以查看（受限视图）
    let local = resource(gym);
    assert!(authorize(&mut resolver, Action::Show, &client, ResourceKind::Diet, Some(&local))
        .await
        .is_ok());

    // 其他健身房的可复用模板
    let mut template = resource(Uuid::new_v4());
    template.reusable = true;
    assert!(
        authorize(&mut resolver, Action::Show, &client, ResourceKind::Diet, Some(&template))
            .await
            .is_ok()
    );

    // 其他健身房的私有资源
    let private = resource(Uuid::new_v4());
    store.insert_resource(ResourceKind::Diet, private.clone());
    assert!(matches!(
        authorize(&mut resolver, Action::Show, &client, ResourceKind::Diet, Some(&private)).await,
        Err(AppError::Forbidden)
    ));

    // 动作库对所有人可见
    let mut exercise = resource(Uuid::new_v4());
    exercise.gym_id = None;
    assert!(authorize(
        &mut resolver,
        Action::Show,
        &client,
        ResourceKind::Exercise,
        Some(&exercise)
    )
    .await
    .is_ok());
}

#[tokio::test]
async fn test_show_cross_tenant_via_individual_grant() {
    let store = MemoryStore::new();
    let coach = principal(Role::Personal, Uuid::new_v4());
    let client = Uuid::new_v4();

    let mut r = resource(Uuid::new_v4());
    r.assignee_ids = vec![client];
    store.insert_resource(ResourceKind::Training, r.clone());
    store.grant_individual(client, GranteeType::Coach, coach.id, false, true);

    let mut resolver = PermissionResolver::new(&store, &store);
    assert!(authorize(&mut resolver, Action::Show, &coach, ResourceKind::Training, Some(&r))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_clone_requires_create_and_reusable_or_full_access() {
    let store = MemoryStore::new();
    let gym = Uuid::new_v4();
    let coach = principal(Role::Personal, gym);
    let client = principal(Role::Client, gym);
    let mut resolver = PermissionResolver::new(&store, &store);

    let mut template = resource(Uuid::new_v4());
    template.reusable = true;
    assert!(
        authorize(&mut resolver, Action::Clone, &coach, ResourceKind::Diet, Some(&template))
            .await
            .is_ok()
    );
    assert!(matches!(
        authorize(&mut resolver, Action::Clone, &client, ResourceKind::Diet, Some(&template)).await,
        Err(AppError::Forbidden)
    ));

    let foreign = resource(Uuid::new_v4());
    store.insert_resource(ResourceKind::Diet, foreign.clone());
    assert!(matches!(
        authorize(&mut resolver, Action::Clone, &coach, ResourceKind::Diet, Some(&foreign)).await,
        Err(AppError::Forbidden)
    ));

    let local = resource(gym);
    assert!(
        authorize(&mut resolver, Action::Clone, &coach, ResourceKind::Diet, Some(&local))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_admin_gate_ignores_grants() {
    let store = MemoryStore::new();
    let home = Uuid::new_v4();
    let admin = principal(Role::Admin, home);
    let foreign = Uuid::new_v4();
    store.grant_tenant(foreign, admin.id, true, true);

    let r = resource(foreign);
    let mut resolver = PermissionResolver::new(&store, &store);
    assert!(matches!(
        authorize(&mut resolver, Action::Update, &admin, ResourceKind::Diet, Some(&r)).await,
        Err(AppError::Forbidden)
    ));
    assert_eq!(store.grant_queries(), 0);
}
