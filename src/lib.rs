//! # Sesame
//!
//! `sesame` is a small username/password authentication service. Users register
//! with a JSON body, are kept in an in-memory store for the lifetime of the
//! process, and log in against that store.
//!
//! ## Sessions
//!
//! A successful login by an account holding the `admin` role receives a signed
//! session cookie carrying `"authenticated": true`. Every other successful login
//! receives no session at all. Which usernames hold the `admin` role is decided
//! by configuration (`--admin-users`, default `admin`).
//!
//! ## Passwords
//!
//! Passwords are stored as salted Argon2id hashes and never appear in responses
//! or logs.

pub mod cli;
pub mod sesame;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
