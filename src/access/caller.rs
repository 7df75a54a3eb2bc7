use serde::Serialize;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

/// The slice of a user record the guards look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub is_subscribed: bool,
}

impl From<&User> for BoundUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            role: u.role,
            is_subscribed: u.is_subscribed,
        }
    }
}

/// Who is making the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CallerIdentity {
    #[default]
    Anonymous,
    Bound(BoundUser),
}

impl CallerIdentity {
    pub fn user(&self) -> Option<&BoundUser> {
        match self {
            CallerIdentity::Anonymous => None,
            CallerIdentity::Bound(u) => Some(u),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}
