//! In-memory user store.
//!
//! The store is reached through the [`UserStore`] trait so handlers never touch
//! a global. [`MemoryStore`] keeps every record in one map behind a single
//! reader/writer lock: registration takes the write side, lookups the read side.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Account role, assigned once at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored user record. Only the password hash is kept.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    username: String,
    password_hash: String,
    role: Role,
}

impl User {
    #[must_use]
    pub fn new(username: String, password_hash: String, role: Role) -> Self {
        Self {
            username,
            password_hash,
            role,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password_hash", &"***")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("user already exists: {0}")]
    AlreadyExists(String),
    #[error("user not found: {0}")]
    NotFound(String),
}

/// Storage backend for user records.
pub trait UserStore: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyExists`] if the username is taken.
    fn register(&self, user: User) -> Result<(), StoreError>;

    /// Fetch a copy of the stored record.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no such user exists.
    fn lookup(&self, username: &str) -> Result<User, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn register(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        if users.contains_key(user.username()) {
            return Err(StoreError::AlreadyExists(user.username));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    fn lookup(&self, username: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(username.to_string()))
    }

    fn len(&self) -> usize {
        self.users.read().len()
    }
}
