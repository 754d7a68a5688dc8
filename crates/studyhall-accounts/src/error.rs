use thiserror::Error;

/// Display texts are shown to the person filling in the form.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid email format.")]
    InvalidEmail,

    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Username is required.")]
    UsernameRequired,

    #[error("User with this email or username already exists.")]
    AlreadyExists,

    #[error("Email or username cannot be empty.")]
    EmptyLogin,

    #[error("Password cannot be empty.")]
    EmptyPassword,

    #[error("Invalid email/username or password.")]
    InvalidCredentials,

    #[error("Username cannot be empty.")]
    EmptyUsername,

    #[error("Account not found.")]
    NotFound,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),

    #[error("failed to serialize accounts: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AccountError {
    /// Whether the error comes from what the user typed rather than from the system.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Hash(_) | Self::Storage(_) | Self::Serialize(_))
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}
