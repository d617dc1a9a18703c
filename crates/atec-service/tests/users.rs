mod common;

use atec_core::error::ServiceError;
use atec_core::models::user::Role;
use atec_core::principal::Requester;
use atec_service::users::UpdateProfileInput;
use atec_storage::repository::UserRepository;
use common::Harness;

fn profile_input(phone: &str, address: &str) -> UpdateProfileInput {
    UpdateProfileInput {
        username: "new name".to_string(),
        phone_number: phone.to_string(),
        address: address.to_string(),
    }
}

#[tokio::test]
async fn profile_round_trips_through_encryption() {
    let h = Harness::new();
    let user = h.user(Role::User).await;

    h.users
        .update_profile(&user, profile_input("+62 812 3456 7890", "  Jl. Merdeka 1  "))
        .await
        .unwrap();

    let stored = UserRepository::find_by_id(h.store.as_ref(), user.user_id().unwrap()).await.unwrap();
    assert_ne!(stored.phone_number.as_deref(), Some("+6281234567890"));

    let profile = h.users.profile(&user).await.unwrap();
    assert_eq!(profile.username, "new name");
    assert_eq!(profile.phone_number.as_deref(), Some("+6281234567890"));
    assert_eq!(profile.address.as_deref(), Some("Jl. Merdeka 1"));
    assert!(profile.email.ends_with("@example.com"));
}

#[tokio::test]
async fn profile_update_is_validated() {
    let h = Harness::new();
    let user = h.user(Role::User).await;

    for input in [
        profile_input("0812345", "home"),
        profile_input("+62abc", "home"),
        profile_input("+6281234567890", "   "),
        profile_input("+6281234567890", &"x".repeat(257)),
    ] {
        let err = h.users.update_profile(&user, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)), "{err:?}");
    }
}

#[tokio::test]
async fn therapists_are_listed_for_signed_in_users() {
    let h = Harness::new();
    let user = h.user(Role::User).await;
    h.user(Role::Therapist).await;
    h.user(Role::Therapist).await;

    assert_eq!(h.users.therapists(&user).await.unwrap().len(), 2);
    let err = h.users.therapists(&Requester::Anonymous).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}
