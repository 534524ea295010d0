//! # Enroll (user registration service)
//!
//! `enroll` serves a small server-rendered site: a home page, a login page and a
//! signup form. Submitting the form runs a single pipeline:
//!
//! 1. **Sanitize:** the submitted body is projected down to `email` and `password`;
//!    any non-string value becomes an empty string.
//! 2. **Validate:** email syntax and password length (3..=50 characters) are checked,
//!    and every failing check is reported.
//! 3. **Uniqueness:** the credential store is asked for an existing user with the
//!    same email.
//! 4. **Hash & persist:** the password is hashed with Argon2id and a random salt, then
//!    the user record is inserted.
//!
//! Outcomes reach the browser as flash messages followed by a redirect to the
//! referring page.
//!
//! ## Uniqueness
//!
//! The lookup and the insert are two separate store calls and the `users` table has
//! no unique index, so two concurrent signups for the same address can both succeed.
//! Enabling `--serialize-signups` holds an in-process lock per normalized email
//! around the whole sequence.

pub mod api;
pub mod cli;
pub mod registration;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
