//! Login against the configured user table

use crate::core::error::PortfolioError;
use crate::core::registry::{Registry, User};
use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info};

/// Username and password as entered at login.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated user, handed to every per-user view.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub authenticated_at: DateTime<Utc>,
}

/// Checks `password` for `username`. Unknown users and wrong passwords yield the same error.
pub fn authenticate(
    registry: &Registry,
    username: &str,
    password: &str,
) -> Result<Session, PortfolioError> {
    let user = registry.find_user(username).map_err(|_| {
        debug!(%username, "Login for unknown user");
        PortfolioError::InvalidCredentials
    })?;

    if !verify_password(password, &user.password) {
        debug!(%username, "Login with wrong password");
        return Err(PortfolioError::InvalidCredentials);
    }

    info!(%username, "Login successful");
    Ok(Session {
        user: user.clone(),
        authenticated_at: Utc::now(),
    })
}

/// Verifies against an argon2 PHC string, or compares plaintext otherwise.
fn verify_password(password: &str, stored: &str) -> bool {
    if stored.starts_with("$argon2") {
        match PasswordHash::new(stored) {
            Ok(hash) => Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok(),
            Err(e) => {
                debug!("Invalid password hash format: {}", e);
                false
            }
        }
    } else {
        password == stored
    }
}

/// Hashes a password with argon2id for use in the configuration file.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}
