use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// The ambient `{authenticated, user}` pair every authenticated view reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl AuthState {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id),
        }
    }
}
