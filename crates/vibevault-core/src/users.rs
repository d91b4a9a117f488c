//! User resolution
//!
//! There is no password or token handling here; a user is identified by
//! email and created the first time that email signs in.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::models::User;
use crate::session::Session;
use crate::storage::rows::{millis, timestamp_at, uuid_at};

/// Find or create the user with this email and open a session for them
pub fn sign_in(conn: &Connection, email: &str) -> VaultResult<(User, Session)> {
    let email = normalize_email(email)?;

    if let Some(user) = find_by_email(conn, &email)? {
        debug!("Signed in existing user {}", user.id);
        let session = Session::for_user(user.id);
        return Ok((user, session));
    }

    let name = email.split('@').next().unwrap_or_default().to_string();
    let user = User {
        id: Uuid::new_v4(),
        email,
        name,
        created_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)",
        params![
            user.id.to_string(),
            user.email,
            user.name,
            millis(user.created_at)
        ],
    )
    .map_err(|e| VaultError::from_insert(e, || format!("User '{}' already exists", user.email)))?;

    info!("Created user {} ({})", user.email, user.id);
    let session = Session::for_user(user.id);
    Ok((user, session))
}

/// Look up a user without creating one
pub fn find_by_email(conn: &Connection, email: &str) -> VaultResult<Option<User>> {
    let email = email.trim().to_lowercase();
    let user = conn
        .query_row(
            "SELECT id, email, name, created_at FROM users WHERE email = ?",
            params![email],
            |row| {
                Ok(User {
                    id: uuid_at(row, 0)?,
                    email: row.get(1)?,
                    name: row.get(2)?,
                    created_at: timestamp_at(row, 3)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

fn normalize_email(email: &str) -> VaultResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(VaultError::Validation(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok(email)
}
