use time::OffsetDateTime;
use uuid::Uuid;

use super::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UserRole {
    Admin,
    Staff,
}

text_enum!(UserRole, "user role", {
    Admin => "admin",
    Staff => "staff",
});

/// A staff account. The password hash never leaves the service.
#[derive(Debug, Clone, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing))]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: UserRole,
    pub active: bool,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: UserRole,
}
