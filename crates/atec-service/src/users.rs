use std::sync::Arc;

use atec_auth::SharedCryptor;
use atec_core::error::{MSG_UNAUTHORIZED, ServiceError};
use atec_core::models::user::{Role, User};
use atec_core::principal::Requester;
use atec_storage::repository::{UserPatch, UserRepository};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::access::require_principal;

const MAX_ADDRESS_LEN: usize = 256;
const THERAPIST_LIST_LIMIT: i64 = 1000;

/// The caller's own account with contact fields decrypted.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub is_active: bool,
    pub role: Role,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct Therapist {
    pub id: Uuid,
    pub username: String,
    pub is_active: bool,
    pub role: Role,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

impl From<User> for Therapist {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            is_active: u.is_active,
            role: u.role,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileInput {
    pub username: String,
    pub phone_number: String,
    pub address: String,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    cryptor: Arc<SharedCryptor>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, cryptor: Arc<SharedCryptor>) -> Self {
        Self { users, cryptor }
    }

    pub async fn profile(&self, requester: &Requester) -> Result<Profile, ServiceError> {
        let principal = require_principal(requester, MSG_UNAUTHORIZED)?;
        let user = self.users.find_by_id(principal.user_id).await?;

        let decrypt = |field: &str, value: Option<&str>| {
            self.cryptor.decrypt_opt(value).map_err(|e| {
                error!(error = %e, user_id = %user.id, field, "failed to decrypt profile field");
                ServiceError::internal()
            })
        };
        let email = decrypt("email", Some(user.email.as_str()))?.unwrap_or_default();
        let phone_number = decrypt("phone_number", user.phone_number.as_deref())?;
        let address = decrypt("address", user.address.as_deref())?;

        Ok(Profile {
            id: user.id,
            username: user.username,
            is_active: user.is_active,
            role: user.role,
            email,
            phone_number,
            address,
            created_at: user.created_at,
            updated_at: user.updated_at,
        })
    }

    pub async fn update_profile(&self, requester: &Requester, input: UpdateProfileInput) -> Result<(), ServiceError> {
        let principal = require_principal(requester, MSG_UNAUTHORIZED)?;

        let username = input.username.trim();
        if username.is_empty() {
            return Err(ServiceError::BadRequest("username is required".to_string()));
        }
        let phone: String = input.phone_number.chars().filter(|c| *c != ' ').collect();
        if !is_e164(&phone) {
            return Err(ServiceError::BadRequest(
                "phone number must be in international format, e.g. +6281234567890".to_string(),
            ));
        }
        let address = input.address.trim();
        if address.is_empty() {
            return Err(ServiceError::BadRequest("address is required".to_string()));
        }
        if address.chars().count() > MAX_ADDRESS_LEN {
            return Err(ServiceError::BadRequest(format!(
                "address must not be longer than {MAX_ADDRESS_LEN} characters"
            )));
        }

        let encrypt = |value: &str| {
            self.cryptor.encrypt(value).map_err(|e| {
                error!(error = %e, "failed to encrypt profile field");
                ServiceError::internal()
            })
        };
        let patch = UserPatch {
            username: Some(username.to_string()),
            phone_number: Some(encrypt(&phone)?),
            address: Some(encrypt(address)?),
            ..Default::default()
        };

        self.users.update(principal.user_id, patch, None).await?;
        Ok(())
    }

    pub async fn therapists(&self, requester: &Requester) -> Result<Vec<Therapist>, ServiceError> {
        require_principal(requester, MSG_UNAUTHORIZED)?;
        let users = self.users.find_by_role(Role::Therapist, THERAPIST_LIST_LIMIT, 0).await?;
        Ok(users.into_iter().map(Therapist::from).collect())
    }
}

/// `+` followed by up to 15 digits, the first non-zero.
fn is_e164(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    (2..=15).contains(&digits.len())
        && digits.bytes().all(|b| b.is_ascii_digit())
        && !digits.starts_with('0')
}
