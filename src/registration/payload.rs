//! Sanitizing and field-level validation of signup submissions.
//!
//! Both steps are pure: the raw body is never mutated, the sanitized payload is
//! returned by value and every failing check is reported in order.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

/// A submitted body as decoded from the request (form or JSON object).
pub type RawPayload = Map<String, Value>;

pub const EMAIL_FIELD: &str = "email";
pub const PASSWORD_FIELD: &str = "password";

pub const PASSWORD_MIN_CHARS: usize = 3;
pub const PASSWORD_MAX_CHARS: usize = 50;

const EMAIL_MAX_LEN: usize = 254;
const EMAIL_LOCAL_MAX_LEN: usize = 64;

/// User-facing validation failures, displayed verbatim as flash messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("E-mail inválido.")]
    InvalidEmail,
    #[error("A senha precisa ter entre 3 e 50 caracteres.")]
    PasswordLength,
    #[error("O usuário já existe.")]
    AlreadyExists,
}

/// Render errors as the strings stored in the `erros` flash key.
#[must_use]
pub fn messages(errors: &[ValidationError]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}

/// The only two fields a signup keeps after sanitizing.
#[derive(Debug)]
pub struct RegistrationPayload {
    email: String,
    password: SecretString,
}

impl RegistrationPayload {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Split into the email and the password secret.
    #[must_use]
    pub fn into_parts(self) -> (String, SecretString) {
        (self.email, self.password)
    }

    /// Back to the raw shape, so a sanitized payload can be sanitized again.
    #[must_use]
    pub fn to_raw(&self) -> RawPayload {
        let mut raw = Map::new();
        raw.insert(EMAIL_FIELD.to_string(), Value::from(self.email.as_str()));
        raw.insert(
            PASSWORD_FIELD.to_string(),
            Value::from(self.password.expose_secret()),
        );
        raw
    }
}

/// Sanitized payload together with the field errors found in it.
#[derive(Debug)]
pub struct FieldCheck {
    pub payload: RegistrationPayload,
    pub errors: Vec<ValidationError>,
}

impl FieldCheck {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Project `raw` down to `email` and `password`.
///
/// Non-string values (numbers, arrays, objects, null) and missing keys become
/// empty strings; every other key is dropped.
#[must_use]
pub fn sanitize(raw: &RawPayload) -> RegistrationPayload {
    let field = |key: &str| match raw.get(key) {
        Some(Value::String(value)) => value.clone(),
        _ => String::new(),
    };

    RegistrationPayload::new(field(EMAIL_FIELD), field(PASSWORD_FIELD))
}

/// Run every field check; checks do not short-circuit each other.
#[must_use]
pub fn validate_fields(payload: &RegistrationPayload) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !valid_email(payload.email()) {
        errors.push(ValidationError::InvalidEmail);
    }

    if !valid_password_length(payload.password().expose_secret()) {
        errors.push(ValidationError::PasswordLength);
    }

    errors
}

/// Sanitize then validate.
#[must_use]
pub fn check(raw: &RawPayload) -> FieldCheck {
    let payload = sanitize(raw);
    let errors = validate_fields(&payload);
    FieldCheck { payload, errors }
}

/// Non-ASCII ranges accepted in local parts, hostname labels and TLDs.
const INTL: &str = r"\x{00A1}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFEF}";

/// Email syntax check: dot-atom local part, dotted hostname and an alphabetic
/// (or punycode) TLD. Internationalized local parts and labels are accepted.
pub fn valid_email(email: &str) -> bool {
    if email.len() > EMAIL_MAX_LEN {
        return false;
    }

    let Some((local, _)) = email.rsplit_once('@') else {
        return false;
    };

    if local.len() > EMAIL_LOCAL_MAX_LEN
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
    {
        return false;
    }

    let pattern = format!(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{{|}}~{INTL}-]+@(?:[A-Za-z0-9{INTL}](?:[A-Za-z0-9{INTL}-]{{0,61}}[A-Za-z0-9{INTL}])?\.)+(?:[A-Za-z{INTL}]{{2,63}}|xn--[A-Za-z0-9-]{{2,59}})$"
    );
    Regex::new(&pattern).is_ok_and(|re| re.is_match(email))
}

/// Length is counted in characters, inclusive on both ends.
pub fn valid_password_length(password: &str) -> bool {
    (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&password.chars().count())
}
