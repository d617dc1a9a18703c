use atec_core::models::child::Child;
use atec_core::models::result::QuestionnaireResult;
use atec_core::models::user::Role;
use atec_core::principal::{Principal, Requester};
use uuid::Uuid;

fn child_of(parent: Uuid) -> Child {
    Child {
        id: Uuid::new_v4(),
        parent_user_id: parent,
        date_of_birth: jiff::civil::date(2019, 4, 2),
        gender: true,
        name: "Ada".to_string(),
        guardian_name: None,
        created_at: jiff::Timestamp::now(),
        updated_at: jiff::Timestamp::now(),
    }
}

fn result_by(created_by: Option<Uuid>) -> QuestionnaireResult {
    QuestionnaireResult {
        id: Uuid::new_v4(),
        package_id: Uuid::new_v4(),
        child_id: None,
        created_by,
        answer: Default::default(),
        result: Default::default(),
        created_at: jiff::Timestamp::now(),
        updated_at: jiff::Timestamp::now(),
    }
}

#[test]
fn anonymous_has_no_principal() {
    let requester = Requester::default();
    assert!(requester.principal().is_none());
    assert!(!requester.is_admin());
    assert_eq!(requester.user_id(), None);
}

#[test]
fn admin_predicate_follows_role() {
    let admin = Principal { user_id: Uuid::new_v4(), role: Role::Admin };
    let parent = Principal { user_id: Uuid::new_v4(), role: Role::Parent };
    assert!(Requester::from(admin).is_admin());
    assert!(!Requester::from(parent).is_admin());
}

#[test]
fn child_ownership_is_by_parent_id() {
    let parent = Principal { user_id: Uuid::new_v4(), role: Role::User };
    let stranger = Principal { user_id: Uuid::new_v4(), role: Role::User };
    let child = child_of(parent.user_id);
    assert!(parent.owns_child(&child));
    assert!(!stranger.owns_child(&child));
}

#[test]
fn anonymous_results_are_owned_by_nobody() {
    let p = Principal { user_id: Uuid::new_v4(), role: Role::User };
    assert!(!p.owns_result(&result_by(None)));
    assert!(p.owns_result(&result_by(Some(p.user_id))));
}

#[test]
fn role_round_trips_through_its_name() {
    for role in [Role::Admin, Role::User, Role::Therapist, Role::Parent] {
        assert_eq!(role.as_str().parse::<Role>(), Ok(role));
    }
    assert!("administrator".parse::<Role>().is_err());
}
