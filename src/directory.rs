use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::User,
    store::UserStore,
    utils::{Clock, CredentialHasher},
};

const MIN_PASSWORD_CHARS: usize = 8;

/// Owns member identity, credentials and session state. Passwords exist in
/// this module only long enough to be hashed or verified and are never
/// logged or stored in plaintext.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
    clock: Arc<dyn Clock>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserDirectory {
    pub fn new(
        store: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            hasher,
            clock,
        }
    }

    /// Register a new member.
    ///
    /// The checks run in a fixed order and the first failure wins: non-blank
    /// fields, then email shape, then full-name shape, then password length,
    /// then uniqueness. Callers rely on that order to know which message a
    /// multiply-invalid input produces.
    ///
    /// # Errors
    /// `Validation` for malformed input, `Duplicate` when the normalized
    /// email is taken.
    pub async fn register(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> AppResult<User> {
        let email = normalize_email(email);
        info!(%email, full_name, "attempting to register user");

        if email.is_empty() || full_name.trim().is_empty() || password.trim().is_empty() {
            warn!(%email, "registration failed, one or more required fields are empty");
            return Err(AppError::Validation(
                "user email, full name and password cannot be empty".into(),
            ));
        }

        if !email.contains('@') {
            warn!(%email, "registration failed, invalid email format");
            return Err(AppError::Validation(
                "invalid email format: email address must contain '@'".into(),
            ));
        }

        if !full_name.trim().contains(char::is_whitespace) {
            warn!(%email, full_name, "registration failed, invalid full name");
            return Err(AppError::Validation(
                "full name must contain whitespace between name and surname".into(),
            ));
        }

        if password.chars().count() < MIN_PASSWORD_CHARS {
            warn!(%email, "registration failed, password too short");
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            warn!(%email, "user already exists");
            return Err(AppError::Duplicate(format!(
                "user with email address {email} already exists"
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            full_name: full_name.trim().to_string(),
            password_hash: self.hasher.hash(password)?,
            logged_in: false,
            created_at: self.clock.now(),
        };
        let saved = self.store.save(user).await?;

        info!(%email, "user successfully registered");
        Ok(saved)
    }

    /// Open a session. Not idempotent: logging in an already-open session is
    /// a `Conflict`, not a no-op.
    ///
    /// # Errors
    /// `NotFound` for an unknown email, `InvalidCredentials` on a failed
    /// password check, `Conflict` when already logged in.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);
        info!(%email, "attempting to login user");

        let Some(mut user) = self.store.find_by_email(&email).await? else {
            warn!(%email, "account does not exist");
            return Err(AppError::NotFound("user"));
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(%email, "invalid password");
            return Err(AppError::InvalidCredentials);
        }

        if user.logged_in {
            warn!(%email, "user is already logged in");
            return Err(AppError::Conflict(format!("{email} is already logged in")));
        }

        self.store.set_logged_in(user.id, true).await?;
        user.logged_in = true;

        info!(%email, "user successfully logged in");
        Ok(user)
    }

    /// Close a session.
    ///
    /// # Errors
    /// `NotFound` for an unknown email, `Conflict` when no session is open.
    pub async fn logout(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        info!(%email, "attempting to logout user");

        let Some(user) = self.store.find_by_email(&email).await? else {
            warn!(%email, "account does not exist");
            return Err(AppError::NotFound("user"));
        };

        if !user.logged_in {
            warn!(%email, "user is not logged in");
            return Err(AppError::Conflict(
                "cannot log out, user is not logged in".into(),
            ));
        }

        self.store.set_logged_in(user.id, false).await?;
        info!(%email, "user successfully logged out");
        Ok(())
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.store.find_by_email(&normalize_email(email)).await
    }

    /// # Errors
    /// Propagates store failures.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        self.store.find_by_id(id).await
    }

    /// Delete an account. Requires an open session; the zero-active-loans
    /// precondition is checked by `LendingWorkflow::deregister` before it
    /// delegates here.
    ///
    /// # Errors
    /// `NotFound` for an unknown email, `Unauthorized` without a session.
    pub async fn delete(&self, email: &str) -> AppResult<User> {
        let email = normalize_email(email);
        info!(%email, "attempting to delete user");

        let Some(user) = self.store.find_by_email(&email).await? else {
            warn!(%email, "account does not exist");
            return Err(AppError::NotFound("user"));
        };

        if !user.logged_in {
            warn!(%email, "cannot delete account without an open session");
            return Err(AppError::Unauthorized(format!(
                "{email} must be logged in to delete the account"
            )));
        }

        self.store.set_logged_in(user.id, false).await?;
        self.store.delete(user.id).await?;

        debug!(%email, user_id = %user.id, "user deleted");
        Ok(user)
    }
}
