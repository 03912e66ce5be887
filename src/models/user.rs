//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Short user representation for lists and loan details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub active_loans: Option<i64>,
    pub overdue_loans: Option<i64>,
}

/// User search query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Substring match over username, email and names
    pub query: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    /// Must match `password`; checked during registration
    pub password_confirm: String,
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
}

/// Update user request (admin or the user themselves)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(max = 64))]
    pub first_name: Option<String>,
    #[validate(length(max = 64))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 256))]
    pub address: Option<String>,
    /// New password; when set the stored hash is rotated
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: Option<String>,
    /// Only honored for admin callers
    pub is_admin: Option<bool>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrator privileges required".to_string(),
            ))
        }
    }

    /// Require the caller to be an admin or the user identified by `user_id`
    pub fn require_self_or_admin(&self, user_id: i32) -> Result<(), AppError> {
        if self.is_admin || self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You do not have permission to access this resource".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: i32, is_admin: bool) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "reader".to_string(),
            user_id,
            is_admin,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn token_round_trip() {
        let c = claims(42, true);
        let token = c.create_token("test-secret").unwrap();
        let parsed = UserClaims::from_token(&token, "test-secret").unwrap();
        assert_eq!(parsed.user_id, 42);
        assert!(parsed.is_admin);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = claims(42, false).create_token("test-secret").unwrap();
        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn self_or_admin_checks() {
        assert!(claims(1, false).require_self_or_admin(1).is_ok());
        assert!(claims(1, false).require_self_or_admin(2).is_err());
        assert!(claims(1, true).require_self_or_admin(2).is_ok());
        assert!(claims(1, false).require_admin().is_err());
        assert!(claims(1, true).require_admin().is_ok());
    }
}
