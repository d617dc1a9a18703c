//! The authenticated caller of a request.
//!
//! The HTTP layer decodes the token and hands use cases a [`Requester`] by
//! value. Use cases never look at tokens.

use uuid::Uuid;

use crate::models::child::Child;
use crate::models::result::QuestionnaireResult;
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn owns_child(&self, child: &Child) -> bool {
        self.user_id == child.parent_user_id
    }

    pub fn owns_result(&self, result: &QuestionnaireResult) -> bool {
        result.created_by == Some(self.user_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Requester {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl Requester {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Requester::Anonymous => None,
            Requester::Authenticated(p) => Some(p),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.principal().map(|p| p.user_id)
    }

    pub fn is_admin(&self) -> bool {
        self.principal().is_some_and(Principal::is_admin)
    }
}

impl From<Principal> for Requester {
    fn from(p: Principal) -> Self {
        Requester::Authenticated(p)
    }
}
