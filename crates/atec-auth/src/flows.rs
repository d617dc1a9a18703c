use std::sync::Arc;
use std::time::Duration;

use atec_cache::{RateLimit, RateLimiter};
use atec_core::cache_keys;
use atec_core::error::ServiceError;
use atec_core::models::user::Role;
use atec_core::principal::Principal;
use atec_storage::StorageError;
use atec_storage::repository::{NewUser, Transaction, TxFactory, UserPatch, UserRepository};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::crypto::SharedCryptor;
use crate::jwt::{TokenClaims, TokenKind, TokenRejection};
use crate::mail::{Mailer, OutgoingMail};
use crate::templates;

pub const MIN_PASSWORD_LEN: usize = 8;
const MIN_RESEND_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub signup_token_ttl: Duration,
    pub login_token_ttl: Duration,
    pub change_password_token_ttl: Duration,
    /// One resend per address per window, never below one minute.
    pub resend_verification_window: Duration,
    pub verification_base_url: String,
    pub reset_password_base_url: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            signup_token_ttl: Duration::from_secs(24 * 3600),
            login_token_ttl: Duration::from_secs(24 * 3600),
            change_password_token_ttl: Duration::from_secs(3600),
            resend_verification_window: Duration::from_secs(15 * 60),
            verification_base_url: "http://localhost:8080/v1/auth/verify".to_string(),
            reset_password_base_url: "http://localhost:8080/v1/auth/password".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordInput {
    pub token: String,
    pub new_password: String,
}

#[derive(Clone)]
pub struct AuthService {
    cryptor: Arc<SharedCryptor>,
    users: Arc<dyn UserRepository>,
    txs: Arc<dyn TxFactory>,
    mailer: Arc<dyn Mailer>,
    limiter: RateLimiter,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        cryptor: Arc<SharedCryptor>,
        users: Arc<dyn UserRepository>,
        txs: Arc<dyn TxFactory>,
        mailer: Arc<dyn Mailer>,
        limiter: RateLimiter,
        settings: AuthSettings,
    ) -> Self {
        Self {
            cryptor,
            users,
            txs,
            mailer,
            limiter,
            settings,
        }
    }

    pub fn cryptor(&self) -> &SharedCryptor {
        &self.cryptor
    }

    pub async fn signup(&self, input: SignupInput) -> Result<&'static str, ServiceError> {
        validate_email(&input.email)?;
        validate_password(&input.password)?;
        if input.username.trim().is_empty() {
            return Err(ServiceError::BadRequest("username is required".to_string()));
        }

        let email = self.encrypt(&input.email)?;
        match self.users.find_by_email(&email).await {
            Ok(_) => {
                return Err(ServiceError::BadRequest(
                    "your email has been used by another account".to_string(),
                ));
            }
            Err(StorageError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password = self.hash(&input.password).await?;
        let mut tx = self.txs.begin().await?;

        let created = self
            .users
            .create(
                NewUser {
                    email,
                    password,
                    username: input.username.trim().to_string(),
                    is_active: false,
                    role: Role::User,
                },
                Some(tx.as_mut()),
            )
            .await;
        let user = match created {
            Ok(user) => user,
            Err(e) => {
                rollback(tx).await;
                return Err(e.into());
            }
        };

        let sent = self
            .send_verification(&user.username, &input.email, user.id)
            .await;
        if let Err(e) = sent {
            rollback(tx).await;
            return Err(e);
        }

        tx.commit().await?;
        info!(user_id = %user.id, "account created, verification pending");
        Ok("email confirmation sent")
    }

    pub async fn verify_account(&self, token: &str) -> Result<&'static str, ServiceError> {
        if token.is_empty() {
            return Err(ServiceError::BadRequest("validation token is required".to_string()));
        }

        let claims = self
            .cryptor
            .validate_token(token, TokenKind::SignupVerification)
            .map_err(|rejection| match rejection {
                TokenRejection::Expired => {
                    ServiceError::Unauthorized("account validation token has expired".to_string())
                }
                TokenRejection::Invalid(_) => {
                    ServiceError::Unauthorized("invalid token for account verification".to_string())
                }
            })?;

        let [audience] = claims.aud.as_slice() else {
            return Err(ServiceError::Unauthorized("invalid audience on token used".to_string()));
        };
        let user_id = Uuid::parse_str(audience).map_err(|_| {
            ServiceError::Unauthorized(
                "invalid user id received from account validation token".to_string(),
            )
        })?;

        let user = self.users.find_by_id(user_id).await?;
        if user.is_active {
            return Ok("your account has been activated");
        }

        self.users
            .update(
                user.id,
                UserPatch {
                    is_active: Some(true),
                    ..UserPatch::default()
                },
                None,
            )
            .await?;
        info!(user_id = %user.id, "account activated");
        Ok("your account has been activated")
    }

    /// Returns a signed login token.
    pub async fn login(&self, input: Credentials) -> Result<String, ServiceError> {
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        let user = self.users.find_by_email(&self.encrypt(&input.email)?).await?;
        if !user.is_active {
            return Err(ServiceError::Unauthorized("this account still not activated".to_string()));
        }
        self.check_password(&user.password, &input.password).await?;

        self.cryptor
            .issue_token(
                TokenKind::Login,
                &user.id.to_string(),
                Some(user.role),
                self.settings.login_token_ttl,
            )
            .map_err(|e| {
                error!(error = %e, "failed to sign login token");
                ServiceError::internal()
            })
    }

    pub async fn init_reset_password(&self, email: &str) -> Result<&'static str, ServiceError> {
        validate_email(email)?;

        let user = self.users.find_by_email(&self.encrypt(email)?).await?;
        if !user.is_active {
            return Err(ServiceError::Unauthorized(
                "this account active status is disabled".to_string(),
            ));
        }

        let token = self.token(
            TokenKind::ChangePassword,
            user.id,
            self.settings.change_password_token_ttl,
        )?;
        self.deliver(OutgoingMail {
            receiver_name: user.username,
            receiver_email: email.to_string(),
            subject: "Password Reset Request".to_string(),
            html: templates::reset_password(&self.settings.reset_password_base_url, &token),
        })
        .await?;
        Ok("ok")
    }

    pub async fn reset_password(&self, input: ResetPasswordInput) -> Result<&'static str, ServiceError> {
        validate_password(&input.new_password)?;

        let claims = self
            .cryptor
            .validate_token(&input.token, TokenKind::ChangePassword)
            .map_err(|rejection| match rejection {
                TokenRejection::Expired => {
                    ServiceError::Unauthorized("change password token has expired".to_string())
                }
                TokenRejection::Invalid(e) => ServiceError::Unauthorized(e.to_string()),
            })?;
        let [audience] = claims.aud.as_slice() else {
            return Err(ServiceError::Unauthorized("invalid number of audience".to_string()));
        };
        let user_id = Uuid::parse_str(audience)
            .map_err(|_| ServiceError::BadRequest("invalid value of user id".to_string()))?;

        let user = self.users.find_by_id(user_id).await?;
        let password = self.hash(&input.new_password).await?;
        self.users
            .update(
                user.id,
                UserPatch {
                    password: Some(password),
                    ..UserPatch::default()
                },
                None,
            )
            .await?;
        info!(user_id = %user.id, "password changed");
        Ok("ok")
    }

    pub async fn resend_verification(&self, email: &str) -> Result<&'static str, ServiceError> {
        validate_email(email)?;
        let ciphertext = self.encrypt(email)?;

        let window = self.settings.resend_verification_window.max(MIN_RESEND_WINDOW);
        let decision = self
            .limiter
            .allow(
                &cache_keys::resend_verification(&ciphertext),
                RateLimit { max: 1, window },
            )
            .await?;
        if !decision.allowed {
            return Err(ServiceError::TooManyRequests(format!(
                "please retry again after {}",
                decision.retry_after.as_secs()
            )));
        }

        let user = self.users.find_by_email(&ciphertext).await?;
        if user.is_active {
            return Err(ServiceError::BadRequest("this account has been activated".to_string()));
        }

        self.send_verification(&user.username, email, user.id).await?;
        Ok("email confirmation sent")
    }

    /// Soft-delete the account after confirming its credentials.
    pub async fn delete_account(&self, input: Credentials) -> Result<(), ServiceError> {
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        let user = self.users.find_by_email(&self.encrypt(&input.email)?).await?;
        self.check_password(&user.password, &input.password).await?;
        self.users.delete(user.id).await?;
        info!(user_id = %user.id, "account deleted");
        Ok(())
    }

    /// Decode a login token into the caller identity.
    pub fn authenticate(&self, token: &str) -> Result<Principal, ServiceError> {
        let claims = self
            .cryptor
            .validate_token(token, TokenKind::Login)
            .map_err(|rejection| match rejection {
                TokenRejection::Expired => ServiceError::Unauthorized("login token has expired".to_string()),
                TokenRejection::Invalid(e) => ServiceError::Unauthorized(e.to_string()),
            })?;
        let user_id = single_audience(&claims)?;
        let role = claims
            .role
            .ok_or_else(|| ServiceError::Unauthorized("undefined role on auth token".to_string()))?;
        Ok(Principal { user_id, role })
    }

    /// Create an active admin account unless the e-mail is already taken.
    pub async fn init_admin_account(&self, email: &str, password: &str, username: &str) -> Result<(), ServiceError> {
        validate_email(email)?;
        validate_password(password)?;

        let ciphertext = self.encrypt(email)?;
        match self.users.find_by_email(&ciphertext).await {
            Ok(existing) => {
                info!(user_id = %existing.id, "admin account already present");
                return Ok(());
            }
            Err(StorageError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password = self.hash(password).await?;
        let admin = self
            .users
            .create(
                NewUser {
                    email: ciphertext,
                    password,
                    username: username.to_string(),
                    is_active: true,
                    role: Role::Admin,
                },
                None,
            )
            .await?;
        info!(user_id = %admin.id, "admin account initialized");
        Ok(())
    }

    async fn send_verification(&self, username: &str, email: &str, user_id: Uuid) -> Result<(), ServiceError> {
        let token = self.token(TokenKind::SignupVerification, user_id, self.settings.signup_token_ttl)?;
        self.deliver(OutgoingMail {
            receiver_name: username.to_string(),
            receiver_email: email.to_string(),
            subject: "Account Verification".to_string(),
            html: templates::account_verification(&self.settings.verification_base_url, &token),
        })
        .await
    }

    async fn deliver(&self, mail: OutgoingMail) -> Result<(), ServiceError> {
        self.mailer.send(mail).await.map_err(|e| {
            error!(error = %e, "failed to send mail");
            ServiceError::internal()
        })
    }

    fn token(&self, kind: TokenKind, user_id: Uuid, ttl: Duration) -> Result<String, ServiceError> {
        self.cryptor
            .issue_token(kind, &user_id.to_string(), None, ttl)
            .map_err(|e| {
                error!(error = %e, subject = kind.subject(), "failed to sign token");
                ServiceError::internal()
            })
    }

    fn encrypt(&self, plain: &str) -> Result<String, ServiceError> {
        self.cryptor.encrypt(plain).map_err(|e| {
            error!(error = %e, "encryption failed");
            ServiceError::Internal("encryption process failed".to_string())
        })
    }

    /// bcrypt runs on the blocking pool.
    async fn hash(&self, plain: &str) -> Result<String, ServiceError> {
        let cryptor = Arc::clone(&self.cryptor);
        let plain = plain.to_owned();
        let hashed = tokio::task::spawn_blocking(move || cryptor.hash_password(&plain))
            .await
            .map_err(|e| {
                error!(error = %e, "password hashing task failed");
                ServiceError::internal()
            })?;
        hashed.map_err(|e| {
            error!(error = %e, "password hashing failed");
            ServiceError::internal()
        })
    }

    async fn check_password(&self, stored: &str, plain: &str) -> Result<(), ServiceError> {
        let cryptor = Arc::clone(&self.cryptor);
        let (stored, plain) = (stored.to_owned(), plain.to_owned());
        let verified = tokio::task::spawn_blocking(move || cryptor.verify_password(&stored, &plain))
            .await
            .map_err(|e| {
                error!(error = %e, "password check task failed");
                ServiceError::internal()
            })?;
        match verified {
            Ok(true) => Ok(()),
            Ok(false) => Err(ServiceError::Unauthorized("invalid password".to_string())),
            Err(e) => {
                error!(error = %e, "stored password hash is unreadable");
                Err(ServiceError::internal())
            }
        }
    }
}

fn single_audience(claims: &TokenClaims) -> Result<Uuid, ServiceError> {
    let [audience] = claims.aud.as_slice() else {
        return Err(ServiceError::Unauthorized("invalid number of audience".to_string()));
    };
    Uuid::parse_str(audience)
        .map_err(|_| ServiceError::Unauthorized("invalid value of user id".to_string()))
}

async fn rollback(tx: Box<dyn Transaction>) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "transaction rollback failed");
    }
}

pub(crate) fn validate_email(email: &str) -> Result<(), ServiceError> {
    let invalid = || ServiceError::BadRequest("invalid email address".to_string());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    if well_formed { Ok(()) } else { Err(invalid()) }
}

pub(crate) fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
