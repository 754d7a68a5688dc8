use std::sync::{Arc, Mutex, MutexGuard};

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use tracing::{info, warn};

use studyhall_db::KeyValueStore;
use studyhall_types::models::{Account, Profile};

use crate::error::AccountError;
use crate::validate::{MIN_PASSWORD_LEN, is_valid_email, same_identity};

/// Storage key holding the serialized account list.
pub const STORAGE_KEY: &str = "accounts";

/// The full list of local accounts, stored as one document.
///
/// Clones share one write lock, held from load to save, so concurrent
/// signups and profile updates cannot overwrite each other. Books built
/// separately over the same storage do not share it.
#[derive(Clone)]
pub struct AccountBook {
    storage: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl AccountBook {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn signup(
        &self,
        email: &str,
        username: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Profile, AccountError> {
        let email = email.trim();
        let username = username.trim();

        if !is_valid_email(email) {
            return Err(AccountError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort);
        }
        if password != confirm_password {
            return Err(AccountError::PasswordMismatch);
        }
        if username.is_empty() {
            return Err(AccountError::UsernameRequired);
        }

        // Hash password with Argon2id before taking the lock, it is the slow part
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AccountError::Hash(e.to_string()))?
            .to_string();

        let _guard = self.lock_writes()?;
        let mut accounts = self.load()?;
        let taken = accounts
            .iter()
            .any(|a| same_identity(&a.email, email) || same_identity(&a.username, username));
        if taken {
            return Err(AccountError::AlreadyExists);
        }

        let account = Account {
            email: email.to_string(),
            username: username.to_string(),
            password: password_hash,
            bio: None,
        };
        let profile = account.profile();
        accounts.push(account);
        self.save(&accounts)?;

        info!("Account created for {}", profile.username);
        Ok(profile)
    }

    /// `login` is either the email or the username, compared case-insensitively.
    pub fn login(&self, login: &str, password: &str) -> Result<Profile, AccountError> {
        let login = login.trim();
        if login.is_empty() {
            return Err(AccountError::EmptyLogin);
        }
        if password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }

        let accounts = self.load()?;
        let account = accounts
            .iter()
            .find(|a| same_identity(&a.email, login) || same_identity(&a.username, login))
            .ok_or(AccountError::InvalidCredentials)?;

        let parsed_hash =
            PasswordHash::new(&account.password).map_err(|e| AccountError::Hash(e.to_string()))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AccountError::InvalidCredentials)?;

        info!("{} logged in", account.username);
        Ok(account.profile())
    }

    pub fn profile(&self, email: &str) -> Result<Option<Profile>, AccountError> {
        Ok(self
            .load()?
            .iter()
            .find(|a| a.email == email)
            .map(Account::profile))
    }

    /// Change the username and bio of the account identified by `email`.
    pub fn update_profile(
        &self,
        email: &str,
        username: &str,
        bio: Option<&str>,
    ) -> Result<Profile, AccountError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AccountError::EmptyUsername);
        }

        let _guard = self.lock_writes()?;
        let mut accounts = self.load()?;
        if accounts
            .iter()
            .any(|a| a.email != email && same_identity(&a.username, username))
        {
            return Err(AccountError::AlreadyExists);
        }

        let account = accounts
            .iter_mut()
            .find(|a| a.email == email)
            .ok_or(AccountError::NotFound)?;
        account.username = username.to_string();
        account.bio = bio.map(str::trim).filter(|b| !b.is_empty()).map(str::to_string);
        let profile = account.profile();

        self.save(&accounts)?;
        info!("Profile updated for {}", email);
        Ok(profile)
    }

    fn lock_writes(&self) -> Result<MutexGuard<'_, ()>, AccountError> {
        self.write_lock
            .lock()
            .map_err(|e| AccountError::Storage(anyhow::anyhow!("account lock poisoned: {}", e)))
    }

    fn load(&self) -> Result<Vec<Account>, AccountError> {
        let Some(raw) = self.storage.get(STORAGE_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(accounts) => Ok(accounts),
            Err(e) => {
                warn!("Ignoring malformed account list: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, accounts: &[Account]) -> Result<(), AccountError> {
        let json = serde_json::to_string(accounts)?;
        self.storage.set(STORAGE_KEY, &json)?;
        Ok(())
    }
}
