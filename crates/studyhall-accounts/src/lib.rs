//! Local account list and the persisted login session.

pub mod accounts;
pub mod error;
pub mod session;
mod validate;

pub use accounts::AccountBook;
pub use error::AccountError;
pub use session::SessionSlot;
