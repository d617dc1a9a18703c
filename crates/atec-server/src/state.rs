use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use atec_auth::{AuthService, AuthSettings, BrevoMailer, LogMailer, Mailer, SharedCryptor};
use atec_cache::backend::{CacheBackend, LockBackend};
use atec_cache::memory::MemoryBackend;
use atec_cache::redis::RedisBackend;
use atec_cache::{CacheKeeper, KeeperSettings, Locker, RateLimit, RateLimiter};
use atec_service::{ChildService, PackageCacheSettings, PackageService, QuestionnaireService, UserService};
use atec_storage::memory::MemoryStore;
use atec_storage::postgres::PgStore;
use atec_storage::repository::{ChildRepository, PackageRepository, ResultRepository, TxFactory, UserRepository};
use tokio_util::task::TaskTracker;

use crate::config::AppConfig;

/// Storage, cache and mail handles the services are built from.
pub struct Backends {
    pub users: Arc<dyn UserRepository>,
    pub children: Arc<dyn ChildRepository>,
    pub packages: Arc<dyn PackageRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub txs: Arc<dyn TxFactory>,
    pub cache: Arc<dyn CacheBackend>,
    pub locks: Arc<dyn LockBackend>,
    pub mailer: Arc<dyn Mailer>,
}

impl Backends {
    /// PostgreSQL, the two Redis endpoints, and Brevo when mail is enabled.
    pub async fn connect(config: &AppConfig) -> eyre::Result<Self> {
        let store = Arc::new(PgStore::connect(&config.postgres.dsn, &config.postgres.pool_settings()).await?);
        let cache = Arc::new(RedisBackend::connect(&config.redis.cache.url).await?);
        let locks = Arc::new(RedisBackend::connect(&config.redis.lock.url).await?);

        let mailer: Arc<dyn Mailer> = if config.mail.enabled {
            Arc::new(BrevoMailer::new(
                config.mail.api_key.clone(),
                config.mail.sender_name.clone(),
                config.mail.sender_email.clone(),
            ))
        } else {
            tracing::warn!("mail delivery disabled, outgoing mail will only be logged");
            Arc::new(LogMailer)
        };

        Ok(Self {
            users: store.clone(),
            children: store.clone(),
            packages: store.clone(),
            results: store.clone(),
            txs: store,
            cache,
            locks,
            mailer,
        })
    }

    /// Everything in process memory.
    pub fn in_memory(mailer: Arc<dyn Mailer>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryBackend::new());
        Self {
            users: store.clone(),
            children: store.clone(),
            packages: store.clone(),
            results: store.clone(),
            txs: store,
            cache: cache.clone(),
            locks: cache,
            mailer,
        }
    }
}

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub packages: PackageService,
    pub questionnaires: QuestionnaireService,
    pub children: ChildService,
    pub users: UserService,
    pub limiter: RateLimiter,
    pub submit_limit: RateLimit,
    pub trusted_proxies: Arc<[IpAddr]>,
}

impl AppState {
    pub fn new(config: &AppConfig, cryptor: Arc<SharedCryptor>, backends: Backends, tracker: TaskTracker) -> Self {
        let base_url = config.server.base_url.trim_end_matches('/');
        let limiter = RateLimiter::new(backends.cache.clone());

        let auth = AuthService::new(
            cryptor.clone(),
            backends.users.clone(),
            backends.txs,
            backends.mailer,
            limiter.clone(),
            AuthSettings {
                signup_token_ttl: Duration::from_secs(config.tokens.signup_ttl_secs),
                login_token_ttl: Duration::from_secs(config.tokens.login_ttl_secs),
                change_password_token_ttl: Duration::from_secs(config.tokens.change_password_ttl_secs),
                resend_verification_window: Duration::from_secs(config.rate_limit.resend_verification_secs),
                verification_base_url: format!("{base_url}/v1/auth/verify"),
                reset_password_base_url: format!("{base_url}/v1/auth/password"),
            },
        );

        let keeper = CacheKeeper::new(backends.cache, Locker::new(backends.locks)).with_settings(KeeperSettings {
            nil_ttl: Duration::from_secs(config.cache.nil_ttl_secs),
            ..KeeperSettings::default()
        });
        let packages = PackageService::new(
            backends.packages,
            keeper,
            PackageCacheSettings {
                package_ttl: Duration::from_secs(config.cache.package_ttl_secs),
                all_active_ttl: Duration::from_secs(config.cache.all_active_packages_ttl_secs),
            },
        );
        let questionnaires =
            QuestionnaireService::new(packages.clone(), backends.results.clone(), backends.children.clone(), tracker);
        let children = ChildService::new(backends.children, backends.users.clone(), backends.results);
        let users = UserService::new(backends.users, cryptor);

        Self {
            auth,
            packages,
            questionnaires,
            children,
            users,
            limiter,
            submit_limit: RateLimit {
                max: config.rate_limit.submit_per_minute.max(1),
                window: Duration::from_secs(60),
            },
            trusted_proxies: config.rate_limit.trusted_proxies.clone().into(),
        }
    }
}
