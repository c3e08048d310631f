use tracing::{info, warn};

use crate::auth::{
    error::AuthError,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::{NewUser, User},
};

/// Creates a user after checking the email is free.
///
/// The lookup is only a fast path: two concurrent registrations can both pass it, and the
/// store's unique constraint decides which insert wins. The loser also gets `DuplicateEmail`.
pub async fn register_user(
    users: &dyn UserStore,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    if name.trim().is_empty() {
        return Err(AuthError::InvalidInput("Name is required"));
    }

    if users.find_by_email(email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AuthError::DuplicateEmail);
    }

    let plain = password.to_owned();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain))
        .await?
        .map_err(AuthError::Password)?;

    let user = users
        .insert(NewUser {
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash,
        })
        .await
        .map_err(|e| {
            let err = AuthError::from(e);
            if matches!(err, AuthError::DuplicateEmail) {
                warn!(email = %email, "lost registration race on email");
            }
            err
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks the password against the stored hash and returns a signed session token.
pub async fn login_user(
    users: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<String, AuthError> {
    let Some(user) = users.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AuthError::UserNotFound);
    };

    let plain = password.to_owned();
    let stored = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &stored))
        .await?
        .map_err(AuthError::Password)?;

    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = keys.issue(user.id, &user.email)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(token)
}
