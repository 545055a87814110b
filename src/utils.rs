use crate::{
    config::Config,
    errors::{AppError, AppResult},
    models::Claims,
};
use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, RateLimiter};
use std::{num::NonZeroU32, sync::Arc};
use uuid::Uuid;

pub type KeyedRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// One-way credential hashing, injected into the user directory so the
/// primitive can be swapped without touching registration or login logic.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password.
    ///
    /// # Errors
    /// Returns an error if the underlying primitive fails.
    fn hash(&self, password: &str) -> AppResult<String>;

    /// Verify a plaintext password against a stored hash.
    ///
    /// # Errors
    /// Returns an error if the stored hash cannot be parsed.
    fn verify(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Salted Argon2 implementation of [`CredentialHasher`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow!(e.to_string())))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| AppError::Internal(anyhow!(e.to_string())))?;
        let argon2 = Argon2::default();
        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Time source capability. The workflow stamps loan and due dates through
/// this seam; tests pin it to a fixed instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation of [`Clock`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Create access and refresh JWT tokens for a user.
///
/// # Errors
/// Returns an error if token encoding fails or time conversion fails.
pub fn create_jwt_tokens(user_id: Uuid, config: &Config) -> AppResult<(String, String)> {
    let access_ts = (Utc::now() + Duration::minutes(15)).timestamp();
    let refresh_ts = (Utc::now() + Duration::days(7)).timestamp();
    let access_exp =
        usize::try_from(access_ts).map_err(|e| AppError::Internal(anyhow!(e.to_string())))?;
    let refresh_exp =
        usize::try_from(refresh_ts).map_err(|e| AppError::Internal(anyhow!(e.to_string())))?;

    let access_claims = Claims {
        sub: user_id,
        exp: access_exp,
        refresh: false,
    };
    let refresh_claims = Claims {
        sub: user_id,
        exp: refresh_exp,
        refresh: true,
    };

    let key = jsonwebtoken::EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let header = jsonwebtoken::Header::default();
    let access = jsonwebtoken::encode(&header, &access_claims, &key)
        .map_err(|e| AppError::Internal(e.into()))?;
    let refresh = jsonwebtoken::encode(&header, &refresh_claims, &key)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((access, refresh))
}

/// Decode and validate a JWT token.
///
/// # Errors
/// Returns Unauthorized if decoding fails.
pub fn decode_jwt(token: &str, config: &Config) -> AppResult<Claims> {
    let key = jsonwebtoken::DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let data = jsonwebtoken::decode::<Claims>(token, &key, &jsonwebtoken::Validation::default())
        .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))?;
    Ok(data.claims)
}

/// Build a keyed rate limiter (60 requests per minute per key).
///
/// # Panics
/// Panics if the `NonZeroU32` constructor fails (impossible for 60).
#[must_use]
pub fn build_rate_limiter() -> Arc<KeyedRateLimiter> {
    let quota = governor::Quota::per_minute(NonZeroU32::new(60).unwrap());
    Arc::new(RateLimiter::keyed(quota))
}
