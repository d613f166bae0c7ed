//! Users, passwords, and sessions.
//!
//! Registration hashes the password before taking the store's write lock, and
//! login verifies it after releasing the read lock, so the Argon2 work never
//! serializes other requests.

pub mod password;
pub mod session;
mod state;
pub mod store;

pub use password::{Argon2Params, PasswordHasher};
pub use session::{CookieStore, Session, SessionConfig, SessionError};
pub use state::{AccessPolicy, AuthState, DEFAULT_ADMIN_USERNAME};
pub use store::{MemoryStore, Role, StoreError, User, UserStore};
