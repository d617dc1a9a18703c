use atec_core::error::ServiceError;
use atec_core::principal::{Principal, Requester};

/// The authenticated caller, or Unauthorized with `message`.
pub fn require_principal(requester: &Requester, message: &str) -> Result<Principal, ServiceError> {
    requester
        .principal()
        .copied()
        .ok_or_else(|| ServiceError::Unauthorized(message.to_string()))
}

/// Anonymous callers are Unauthorized, everyone but admins Forbidden.
pub fn require_admin(requester: &Requester) -> Result<Principal, ServiceError> {
    let principal = requester.principal().copied().ok_or_else(ServiceError::unauthorized)?;
    if !principal.is_admin() {
        return Err(ServiceError::forbidden());
    }
    Ok(principal)
}
