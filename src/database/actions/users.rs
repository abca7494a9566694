use std::collections::HashMap;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{SessionData, SessionSigner},
    },
    composition::validate_length,
    constants::{EMAIL_MAX_LENGTH, USER_NAME_MAX_LENGTH},
    error::{ActionError, QueryError},
    pagination::{PageContext, PageRequest},
    schema::{
        Credentials, NewUser, PasswordChange, User, UserProfile, UserProfileRow, Uuid,
    },
};

use sqlx::{Pool, Postgres};

/// Emails are unique and matched case-insensitively, so they are stored lowercased.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(user: &NewUser) -> Result<(), ActionError> {
    let email = user.email.trim();
    if email.is_empty() || email.chars().count() > EMAIL_MAX_LENGTH || !email.contains('@') {
        return Err(ActionError::Validation(String::from(
            "Email: enter a valid email address",
        )));
    }

    let username = user.username.trim();
    let valid_username = !username.is_empty()
        && username.chars().count() <= USER_NAME_MAX_LENGTH
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c));
    if !valid_username {
        return Err(ActionError::Validation(String::from(
            "Username: 1-150 letters, digits and @/./+/-/_ only",
        )));
    }

    validate_length("First name", user.first_name.trim(), USER_NAME_MAX_LENGTH)?;
    validate_length("Last name", user.last_name.trim(), USER_NAME_MAX_LENGTH)?;
    validate_password(&user.password)
}

fn validate_password(password: &str) -> Result<(), ActionError> {
    if password.chars().count() < 8 {
        return Err(ActionError::Validation(String::from(
            "Password: at least 8 characters",
        )));
    }
    Ok(())
}

fn hashing_failed(e: argon2::password_hash::Error) -> ActionError {
    log::error!("Password hashing failed: {e}");
    ActionError::Query(QueryError::new(String::from("Password hashing failed")))
}

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, ActionError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<Option<User>, ActionError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<UserProfile, ActionError> {
    validate_registration(&user)?;
    let password = hash_password(&user.password).map_err(hashing_failed)?;

    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING *;
    ",
    )
    .bind(normalize_email(&user.email))
    .bind(user.username.trim())
    .bind(user.first_name.trim())
    .bind(user.last_name.trim())
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(user) => {
            log::info!("Registered user {} ({})", user.id, user.username);
            Ok(UserProfile {
                id: user.id,
                email: user.email,
                username: user.username,
                first_name: user.first_name,
                last_name: user.last_name,
                is_subscribed: false,
            })
        }
        None => Err(ActionError::Conflict(String::from(
            "A user with that email or username already exists",
        ))),
    }
}

pub async fn login_user(
    credentials: Credentials,
    signer: &SessionSigner,
    pool: &Pool<Postgres>,
) -> Result<String, ActionError> {
    let user = match get_user(pool, &credentials.email).await? {
        Some(user) => user,
        None => return Err(ActionError::Unauthorized(String::from("Invalid credentials"))),
    };

    let authenticated = verify_password(&credentials.password, &user.password).map_err(|e| {
        log::error!("Stored password hash of user {} is unreadable: {e}", user.id);
        ActionError::Unauthorized(String::from("Invalid credentials"))
    })?;
    if !authenticated {
        return Err(ActionError::Unauthorized(String::from("Invalid credentials")));
    }

    signer.generate(&user)
}

pub async fn set_password(
    session: &SessionData,
    change: PasswordChange,
    pool: &Pool<Postgres>,
) -> Result<(), ActionError> {
    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or_else(|| ActionError::NotFound(String::from("User not found")))?;

    let authenticated =
        verify_password(&change.current_password, &user.password).map_err(hashing_failed)?;
    if !authenticated {
        return Err(ActionError::Unauthorized(String::from(
            "Current password is incorrect",
        )));
    }

    validate_password(&change.new_password)?;
    let password = hash_password(&change.new_password).map_err(hashing_failed)?;

    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("User {} changed their password", user.id);
    Ok(())
}

/// `is_subscribed` is always false for an anonymous viewer.
pub async fn get_profile(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, ActionError> {
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS (SELECT 1 FROM follows f WHERE f.user_id = $2 AND f.author_id = u.id) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(id)
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| ActionError::NotFound(String::from("User not found")))
}

pub async fn fetch_profiles(
    ids: &[Uuid],
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, UserProfile>, ActionError> {
    let rows: Vec<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS (SELECT 1 FROM follows f WHERE f.user_id = $2 AND f.author_id = u.id) AS is_subscribed
        FROM users u
        WHERE u.id = ANY($1)
    ",
    )
    .bind(ids)
    .bind(viewer)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|profile| (profile.id, profile)).collect())
}

pub async fn list_users(
    page: PageRequest,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserProfile>, ActionError> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS (SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.author_id = u.id) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok(PageContext::from_rows(rows, total_count, page).map(UserProfile::from))
}
