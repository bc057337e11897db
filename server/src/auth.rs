// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::database;
use crate::error::AppError;
use crate::state::AppState;

use anyhow::{anyhow, Context, Result};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use calendar_common::Viewer;
use sqlx::SqlitePool;
use std::fmt;
use tracing::{debug, info};

/// Username and password presented by a client.
#[derive(Clone, PartialEq, Eq)]
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

impl Credentials {
    /// Decodes an `Authorization: Basic <base64(user:password)>` header value.
    pub fn from_basic_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        if username.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Verifies credentials and resolves them to a principal.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` when the credentials are wrong or the user is unknown.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<Viewer>>;
}

/// Checks credentials against the `users` table.
#[derive(Clone)]
pub struct SqliteAuthProvider {
    pool: SqlitePool,
}

impl SqliteAuthProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthProvider for SqliteAuthProvider {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<Viewer>> {
        let Some(user) = database::find_user(&self.pool, &credentials.username).await? else {
            debug!("Unknown user {}", credentials.username);
            return Ok(None);
        };

        let password = credentials.password.clone();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .context("Password verification task failed")??;

        if matches {
            Ok(Some(Viewer::from(&user)))
        } else {
            info!("Rejected password for user {}", credentials.username);
            Ok(None)
        }
    }
}

/// Hashes a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, phc_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(phc_hash).map_err(|e| anyhow!("Stored password hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Extractor for the authenticated viewer of a request.
///
/// Handlers that take it reject requests without valid Basic credentials
/// with `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Viewer);

impl<S> FromRequestParts<S> for Authenticated
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let credentials = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(Credentials::from_basic_header)
            .ok_or(AppError::Unauthenticated)?;

        match state.auth.authenticate(&credentials).await? {
            Some(viewer) => Ok(Authenticated(viewer)),
            None => Err(AppError::Unauthenticated),
        }
    }
}
