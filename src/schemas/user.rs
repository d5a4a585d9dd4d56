use serde::Serialize;
use time::PrimitiveDateTime;

use crate::core::time::rfc3339;
use crate::db::models::User;

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) is_active: bool,
    #[serde(serialize_with = "rfc3339::serialize")]
    pub(crate) created_at: PrimitiveDateTime,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
