//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterUser, UpdateUser, User, UserClaims, UserQuery, UserShort},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new user. Username and email must be unique; the password
    /// is stored only as an argon2 hash. The first registered user is
    /// granted administrator rights.
    pub async fn register(&self, user: RegisterUser) -> AppResult<User> {
        if user.password != user.password_confirm {
            return Err(AppError::Validation("Passwords must match".to_string()));
        }

        if self
            .repository
            .users
            .username_exists(&user.username, None)
            .await?
        {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict(
                "This email is already in use by another account".to_string(),
            ));
        }

        let password_hash = self.hash_password(&user.password)?;

        self.repository.users.create(&user, &password_hash).await
    }

    /// Authenticate by username and password, returning a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            is_admin: user.is_admin,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        self.repository.users.search(query).await
    }

    /// Update a user's profile. Email uniqueness excludes the user's own
    /// prior value; the admin flag only changes for admin callers; a new
    /// password is rehashed.
    pub async fn update_user(
        &self,
        id: i32,
        user: UpdateUser,
        acting_is_admin: bool,
    ) -> AppResult<User> {
        self.repository.users.get_by_id(id).await?;

        if let Some(ref email) = user.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict(
                    "This email is already in use by another account".to_string(),
                ));
            }
        }

        let password_hash = match user.password {
            Some(ref password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.repository
            .users
            .update(id, &user, password_hash, acting_is_admin)
            .await
    }

    /// Delete a user (admin operation). Admins cannot delete their own
    /// account; the open-loan guard lives in the repository.
    pub async fn delete_user(&self, id: i32, acting_user_id: i32) -> AppResult<()> {
        if id == acting_user_id {
            return Err(AppError::BusinessRule(
                "You cannot delete your own account".to_string(),
            ));
        }

        self.repository.users.delete(id).await
    }
}
