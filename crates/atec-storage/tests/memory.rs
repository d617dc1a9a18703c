use atec_core::models::package::{IndicationCategories, PackageContent, Questionnaire};
use atec_core::models::user::Role;
use atec_storage::StorageError;
use atec_storage::memory::MemoryStore;
use atec_storage::repository::{
    ChildFilter, ChildRepository, NewChild, NewPackage, NewResult, NewUser, PackageFilter,
    PackagePatch, PackageRepository, ResultFilter, ResultRepository, TxFactory, UserPatch,
    UserRepository,
};
use uuid::Uuid;

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password: "hash".to_string(),
        username: "someone".to_string(),
        is_active: false,
        role: Role::User,
    }
}

fn new_package(created_by: Uuid, is_active: bool) -> NewPackage {
    NewPackage {
        created_by,
        is_active,
        content: PackageContent {
            name: "pkg".to_string(),
            questionnaire: Questionnaire::new(),
            indication_categories: IndicationCategories::default(),
            image_result_attribute_key: Default::default(),
        },
    }
}

fn new_result(package_id: Uuid, child_id: Option<Uuid>, created_by: Option<Uuid>) -> NewResult {
    NewResult {
        package_id,
        child_id,
        created_by,
        answer: Default::default(),
        result: Default::default(),
    }
}

#[tokio::test]
async fn committed_transaction_becomes_visible() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    let user = UserRepository::create(&store, new_user("a"), Some(tx.as_mut()))
        .await
        .unwrap();

    assert!(matches!(
        UserRepository::find_by_id(&store, user.id).await,
        Err(StorageError::NotFound)
    ));

    tx.commit().await.unwrap();
    let found = store.find_by_email("a").await.unwrap();
    assert_eq!(found.id, user.id);
}

#[tokio::test]
async fn rolled_back_transaction_leaves_nothing() {
    let store = MemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    UserRepository::create(&store, new_user("b"), Some(tx.as_mut()))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(matches!(
        store.find_by_email("b").await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn user_update_applies_only_given_fields() {
    let store = MemoryStore::new();
    let user = UserRepository::create(&store, new_user("c"), None).await.unwrap();
    let patch = UserPatch {
        is_active: Some(true),
        ..Default::default()
    };
    let updated = UserRepository::update(&store, user.id, patch, None).await.unwrap();
    assert!(updated.is_active);
    assert_eq!(updated.username, "someone");
}

#[tokio::test]
async fn empty_search_is_not_found() {
    let store = MemoryStore::new();
    let res = PackageRepository::search(
        &store,
        PackageFilter {
            is_active: Some(true),
            limit: 10,
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(res, Err(StorageError::NotFound)));
}

#[tokio::test]
async fn soft_deleted_packages_disappear_from_reads() {
    let store = MemoryStore::new();
    let admin = Uuid::new_v4();
    let pkg = PackageRepository::create(&store, new_package(admin, true), None)
        .await
        .unwrap();
    PackageRepository::delete(&store, pkg.id).await.unwrap();

    assert!(matches!(
        PackageRepository::find_by_id(&store, pkg.id).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        PackageRepository::delete(&store, pkg.id).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn mark_locked_is_idempotent_and_sticky() {
    let store = MemoryStore::new();
    let pkg = PackageRepository::create(&store, new_package(Uuid::new_v4(), true), None)
        .await
        .unwrap();
    store.mark_locked(pkg.id).await.unwrap();
    store.mark_locked(pkg.id).await.unwrap();

    let patch = PackagePatch {
        is_active: Some(false),
        ..Default::default()
    };
    let updated = PackageRepository::update(&store, pkg.id, patch, None).await.unwrap();
    assert!(updated.is_locked);
    assert!(matches!(
        store.mark_locked(Uuid::new_v4()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn staged_update_keeps_a_lock_taken_before_commit() {
    let store = MemoryStore::new();
    let pkg = PackageRepository::create(&store, new_package(Uuid::new_v4(), true), None)
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let patch = PackagePatch {
        is_active: Some(false),
        ..Default::default()
    };
    PackageRepository::update(&store, pkg.id, patch, Some(tx.as_mut())).await.unwrap();
    store.mark_locked(pkg.id).await.unwrap();
    tx.commit().await.unwrap();

    let stored = PackageRepository::find_by_id(&store, pkg.id).await.unwrap();
    assert!(stored.is_locked);
    assert!(!stored.is_active);
}

#[tokio::test]
async fn oldest_active_and_locked_wins() {
    let store = MemoryStore::new();
    let admin = Uuid::new_v4();
    let first = PackageRepository::create(&store, new_package(admin, true), None).await.unwrap();
    let second = PackageRepository::create(&store, new_package(admin, true), None).await.unwrap();
    assert!(store.find_oldest_active_and_locked().await.is_err());

    store.mark_locked(second.id).await.unwrap();
    store.mark_locked(first.id).await.unwrap();
    assert_eq!(store.find_oldest_active_and_locked().await.unwrap().id, first.id);
}

#[tokio::test]
async fn child_search_matches_name_case_insensitively() {
    let store = MemoryStore::new();
    let parent = Uuid::new_v4();
    for name in ["Alice", "Bob", "alicia"] {
        ChildRepository::create(
            &store,
            NewChild {
                parent_user_id: parent,
                date_of_birth: jiff::civil::date(2020, 1, 1),
                gender: false,
                name: name.to_string(),
                guardian_name: None,
            },
            None,
        )
        .await
        .unwrap();
    }
    let found = ChildRepository::search(
        &store,
        ChildFilter {
            name: Some("ALI".to_string()),
            limit: 10,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn history_includes_own_and_childrens_results() {
    let store = MemoryStore::new();
    let parent = Uuid::new_v4();
    let other = Uuid::new_v4();
    let child = ChildRepository::create(
        &store,
        NewChild {
            parent_user_id: parent,
            date_of_birth: jiff::civil::date(2018, 6, 30),
            gender: true,
            name: "Kid".to_string(),
            guardian_name: None,
        },
        None,
    )
    .await
    .unwrap();
    let pkg = Uuid::new_v4();

    ResultRepository::create(&store, new_result(pkg, None, Some(parent)), None).await.unwrap();
    ResultRepository::create(&store, new_result(pkg, Some(child.id), Some(other)), None).await.unwrap();
    ResultRepository::create(&store, new_result(pkg, None, Some(other)), None).await.unwrap();

    let history = store.find_user_history(parent, 10, 0).await.unwrap();
    assert_eq!(history.len(), 2);

    let paged = store.find_user_history(parent, 1, 1).await.unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].child_id, Some(child.id));

    let by_creator = ResultRepository::search(
        &store,
        ResultFilter {
            created_by: Some(other),
            limit: 10,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(by_creator.len(), 2);
}
