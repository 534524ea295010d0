//! Signup pipeline: payload validation, uniqueness check, hashing and storage.

pub mod guard;
pub mod password;
pub mod payload;
pub mod store;
pub mod workflow;

pub use self::payload::{
    check, sanitize, validate_fields, FieldCheck, RawPayload, RegistrationPayload,
    ValidationError,
};
pub use self::store::{MemoryUserStore, PgUserStore, StoreError, UserRecord, UserStore};
pub use self::workflow::{RegisterError, Registrar, Registration};
