use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::debug;

use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The `users.email` unique constraint rejected the insert.
    #[error("email already exists")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
}

/// Postgres-backed store. Every call checks a connection out of the pool and returns it on completion.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                debug!(email = %user.email, "insert hit users_email_key");
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(created)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_violation_detected_by_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("40001"),
        }));
        assert!(!is_unique_violation(&err));

        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn memory_store_rejects_second_insert_for_same_email() {
        let store = memory::MemoryUserStore::default();
        let new_user = |name: &str| NewUser {
            name: name.into(),
            email: "a@x.com".into(),
            password_hash: "h".into(),
        };

        store.insert(new_user("Ann")).await.expect("first insert");
        let err = store.insert(new_user("Other Ann")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn memory_store_lookup_is_case_sensitive() {
        let store = memory::MemoryUserStore::default();
        store
            .insert(NewUser {
                name: "Ann".into(),
                email: "a@x.com".into(),
                password_hash: "h".into(),
            })
            .await
            .expect("insert");

        assert!(store.find_by_email("a@x.com").await.unwrap().is_some());
        assert!(store.find_by_email("A@X.com").await.unwrap().is_none());
    }
}
