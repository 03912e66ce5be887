//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{RegisterUser, UpdateUser, User, UserQuery, UserShort},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username (primary authentication method)
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Total number of registered users
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1) AND id != $2)",
            )
            .bind(username)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))")
                .bind(username)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let (where_clause, pattern) = match query.query {
            Some(ref q) if !q.is_empty() => (
                "WHERE username ILIKE $1 OR email ILIKE $1 \
                 OR first_name ILIKE $1 OR last_name ILIKE $1"
                    .to_string(),
                Some(format!("%{}%", q)),
            ),
            _ => (String::new(), None),
        };

        let count_query = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref p) = pattern {
            count_builder = count_builder.bind(p);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.is_admin,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.user_id = u.id AND NOT l.returned) as active_loans,
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.user_id = u.id AND NOT l.returned AND l.due_date < NOW()) as overdue_loans
            FROM users u
            {}
            ORDER BY u.username
            LIMIT {} OFFSET {}
            "#,
            where_clause, per_page, offset
        );

        let mut select_builder = sqlx::query_as::<_, UserShort>(&select_query);
        if let Some(ref p) = pattern {
            select_builder = select_builder.bind(p);
        }
        let users = select_builder.fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Create a new user. The very first registered user becomes the
    /// administrator; the count check and the insert share one transaction.
    pub async fn create(&self, user: &RegisterUser, password_hash: &str) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        let is_admin = existing == 0;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (username, email, password_hash, is_admin, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(password_hash)
        .bind(is_admin)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Update an existing user
    pub async fn update(
        &self,
        id: i32,
        user: &UpdateUser,
        password_hash: Option<String>,
        allow_admin_change: bool,
    ) -> AppResult<User> {
        // Build dynamic update query
        let mut sets = Vec::new();
        let mut param_idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(user.first_name, "first_name");
        add_field!(user.last_name, "last_name");
        add_field!(user.email, "email");
        add_field!(user.phone, "phone");
        add_field!(user.address, "address");
        if allow_admin_change {
            add_field!(user.is_admin, "is_admin");
        }
        if password_hash.is_some() {
            sets.push(format!("password_hash = ${}", param_idx));
        }

        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!("UPDATE users SET {} WHERE id = {}", sets.join(", "), id);

        let mut builder = sqlx::query(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(user.first_name);
        bind_field!(user.last_name);
        bind_field!(user.email);
        bind_field!(user.phone);
        bind_field!(user.address);
        if allow_admin_change {
            if let Some(is_admin) = user.is_admin {
                builder = builder.bind(is_admin);
            }
        }
        if let Some(ref hash) = password_hash {
            builder = builder.bind(hash);
        }

        builder.execute(&self.pool).await?;

        self.get_by_id(id).await
    }

    /// Delete a user, rejected while they have any open loan.
    /// Returned loans survive with the user reference nulled.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let open_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND NOT returned",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open_loans > 0 {
            return Err(AppError::BusinessRule(
                "Cannot delete user with active loans. Please return all books first".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
