//! Shared auth state handed to every handler.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::error;

use super::{
    password::PasswordHasher,
    session::CookieStore,
    store::{Role, UserStore},
};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

// verified against when the username is unknown
const UNKNOWN_USER_PASSWORD: &str = "sesame-unknown-user";

/// Decides which role a username receives at registration.
#[derive(Clone, Debug)]
pub struct AccessPolicy {
    admins: HashSet<String>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new([DEFAULT_ADMIN_USERNAME.to_string()])
    }
}

impl AccessPolicy {
    #[must_use]
    pub fn new(admins: impl IntoIterator<Item = String>) -> Self {
        Self {
            admins: admins
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn role_for(&self, username: &str) -> Role {
        if self.admins.contains(username) {
            Role::Admin
        } else {
            Role::Member
        }
    }
}

pub struct AuthState {
    store: Arc<dyn UserStore>,
    cookies: CookieStore,
    policy: AccessPolicy,
    hasher: PasswordHasher,
    dummy_hash: OnceLock<String>,
}

impl AuthState {
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, cookies: CookieStore, policy: AccessPolicy) -> Self {
        Self {
            store,
            cookies,
            policy,
            hasher: PasswordHasher::default(),
            dummy_hash: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self.dummy_hash = OnceLock::new();
        self
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    #[must_use]
    pub fn hasher(&self) -> PasswordHasher {
        self.hasher
    }

    /// Hash with the configured parameters that no real account owns.
    ///
    /// Logins for unknown usernames verify against it so they cost the same
    /// Argon2 work as a wrong password. Computed on first use; call it from a
    /// blocking context.
    pub fn dummy_hash(&self) -> &str {
        self.dummy_hash.get_or_init(|| {
            self.hasher
                .hash(UNKNOWN_USER_PASSWORD)
                .unwrap_or_else(|e| {
                    error!("Failed to compute the unknown-user hash: {e:#}");
                    String::new()
                })
        })
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("users", &self.store.len())
            .field("cookies", &self.cookies)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sesame::auth::{Argon2Params, MemoryStore, SessionConfig};
    use secrecy::SecretString;

    fn state() -> AuthState {
        let cookies = CookieStore::new(
            SecretString::from("0123456789abcdef0123456789abcdef"),
            SessionConfig::new(),
        )
        .unwrap();

        AuthState::new(
            Arc::new(MemoryStore::new()),
            cookies,
            AccessPolicy::default(),
        )
        .with_hasher(PasswordHasher::with_params(Argon2Params {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }))
    }

    #[test]
    fn dummy_hash_uses_configured_params_and_is_stable() {
        let state = state();
        let first = state.dummy_hash().to_string();

        assert!(first.starts_with("$argon2id$"));
        assert!(first.contains("m=64,t=1,p=1"));
        assert_eq!(state.dummy_hash(), first);
        assert!(!state.hasher().verify("hunter2", &first).unwrap());
    }

    #[test]
    fn dummy_hash_follows_hasher_changes() {
        let state = state();
        let cheap = state.dummy_hash().to_string();

        let state = state.with_hasher(PasswordHasher::with_params(Argon2Params {
            memory_kib: 128,
            iterations: 1,
            parallelism: 1,
        }));

        assert_ne!(state.dummy_hash(), cheap);
        assert!(state.dummy_hash().contains("m=128,t=1,p=1"));
    }

    #[test]
    fn default_policy_only_promotes_admin() {
        let policy = AccessPolicy::default();
        assert_eq!(policy.role_for("admin"), Role::Admin);
        assert_eq!(policy.role_for("Admin"), Role::Member);
        assert_eq!(policy.role_for("alice"), Role::Member);
    }

    #[test]
    fn custom_policy_trims_and_skips_blanks() {
        let policy = AccessPolicy::new([" root ".to_string(), String::new(), "ops".to_string()]);
        assert_eq!(policy.role_for("root"), Role::Admin);
        assert_eq!(policy.role_for("ops"), Role::Admin);
        assert_eq!(policy.role_for("admin"), Role::Member);
        assert_eq!(policy.role_for(""), Role::Member);
    }
}
