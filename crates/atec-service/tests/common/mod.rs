#![allow(dead_code)]

use std::sync::Arc;

use atec_auth::SharedCryptor;
use atec_cache::memory::MemoryBackend;
use atec_cache::{CacheKeeper, Locker};
use atec_core::models::child::Child;
use atec_core::models::result::AnswerDetail;
use atec_core::models::user::Role;
use atec_core::principal::{Principal, Requester};
use atec_grader::template::SUBTESTS;
use atec_service::{ChildService, PackageCacheSettings, PackageService, QuestionnaireService, UserService};
use atec_storage::memory::MemoryStore;
use atec_storage::repository::{ChildRepository, NewChild, NewUser, UserRepository};
use tokio_util::task::TaskTracker;
use uuid::Uuid;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryBackend>,
    pub keeper: CacheKeeper,
    pub cryptor: Arc<SharedCryptor>,
    pub packages: PackageService,
    pub questionnaires: QuestionnaireService,
    pub children: ChildService,
    pub users: UserService,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryBackend::new());
        let keeper = CacheKeeper::new(cache.clone(), Locker::new(cache.clone()));
        let cryptor = Arc::new(SharedCryptor::new(b"service-tests", "000102030405060708090a0b0c0d0e0f", 4).unwrap());

        let packages = PackageService::new(store.clone(), keeper.clone(), PackageCacheSettings::default());
        let questionnaires =
            QuestionnaireService::new(packages.clone(), store.clone(), store.clone(), TaskTracker::new());
        let children = ChildService::new(store.clone(), store.clone(), store.clone());
        let users = UserService::new(store.clone(), cryptor.clone());

        Self {
            store,
            cache,
            keeper,
            cryptor,
            packages,
            questionnaires,
            children,
            users,
        }
    }

    pub async fn user(&self, role: Role) -> Requester {
        let email = self.cryptor.encrypt(&format!("{}@example.com", Uuid::new_v4())).unwrap();
        let user = UserRepository::create(
            self.store.as_ref(),
            NewUser {
                email,
                password: self.cryptor.hash_password("password123").unwrap(),
                username: format!("{role}-user"),
                is_active: true,
                role,
            },
            None,
        )
        .await
        .unwrap();
        Requester::Authenticated(Principal { user_id: user.id, role })
    }

    pub async fn child_of(&self, parent: &Requester) -> Child {
        ChildRepository::create(
            self.store.as_ref(),
            NewChild {
                parent_user_id: parent.user_id().unwrap(),
                date_of_birth: jiff::civil::date(2018, 5, 17),
                gender: true,
                name: "Kid".to_string(),
                guardian_name: None,
            },
            None,
        )
        .await
        .unwrap()
    }

    /// An active package built from the default content.
    pub async fn active_package(&self, admin: &Requester) -> Uuid {
        let id = self
            .packages
            .create(admin, atec_grader::default_package::default_content())
            .await
            .unwrap();
        self.packages.change_active_status(admin, id, true).await.unwrap();
        id
    }

    /// Wait for detached post-submit work.
    pub async fn settle(&self) {
        let tracker = self.questionnaires.tracker();
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }
}

/// Every question answered with `option_id`.
pub fn uniform_answers(option_id: i32) -> AnswerDetail {
    SUBTESTS
        .iter()
        .map(|s| {
            let group = (0..s.question_count as i32).map(|q| (q, option_id)).collect();
            (s.id, group)
        })
        .collect()
}
