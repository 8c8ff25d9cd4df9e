use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    form::form_model::FieldMap,
    session::store::SessionStore,
    validate::validator::{Rule, RuleSet, Validator},
};

/// Field names shared by validators, remote actions and the CLI.
pub mod field {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const CONFIRM_PASSWORD: &str = "confirm_password";
    pub const URL: &str = "url";
    pub const EXPIRATION: &str = "expiration";
}

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 63;
pub const NAME_MAX_LEN: usize = 299;

/// Lifetimes, in days, a logged-in user may pick for a short link.
pub const EXPIRATION_CHOICES: &[&str] = &["30", "90", "365"];

pub static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

pub static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)https?://[^\s/$.?#][^\s]*$").expect("url pattern compiles")
});

fn email_rules() -> RuleSet {
    RuleSet::new()
        .rule(Rule::required(field::EMAIL, "Email is required"))
        .rule(Rule::pattern(
            field::EMAIL,
            &EMAIL_PATTERN,
            "Enter a valid email address",
        ))
}

fn password_rules() -> RuleSet {
    RuleSet::new()
        .rule(Rule::required(field::PASSWORD, "Password is required"))
        .rule(Rule::min_length(
            field::PASSWORD,
            PASSWORD_MIN_LEN,
            "Password must be at least 8 characters long",
        ))
        .rule(Rule::max_length(
            field::PASSWORD,
            PASSWORD_MAX_LEN,
            "Password must be shorter than 64 characters",
        ))
}

pub fn register_rules() -> RuleSet {
    RuleSet::new()
        .rule(Rule::required(field::NAME, "Name is required"))
        .rule(Rule::max_length(
            field::NAME,
            NAME_MAX_LEN,
            "Name must be shorter than 300 characters",
        ))
        .extend(email_rules())
        .extend(password_rules())
        .rule(Rule::equals(
            field::CONFIRM_PASSWORD,
            field::PASSWORD,
            "Passwords do not match",
        ))
}

pub fn login_rules() -> RuleSet {
    email_rules().extend(password_rules())
}

// ============================================================================
// Session-aware validators
// ============================================================================

/// Shorten form. The expiration selector only exists for logged-in users,
/// so its rule is applied only while the session is authenticated.
pub struct ShortenValidator {
    session: Arc<dyn SessionStore>,
    base: RuleSet,
    authenticated: RuleSet,
}

impl ShortenValidator {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self {
            session,
            base: RuleSet::new()
                .rule(Rule::required(field::URL, "URL is required"))
                .rule(Rule::pattern(
                    field::URL,
                    &URL_PATTERN,
                    "Enter a valid http(s) URL",
                )),
            authenticated: RuleSet::new().rule(Rule::one_of(
                field::EXPIRATION,
                EXPIRATION_CHOICES,
                "Expiration must be 30, 90 or 365 days",
            )),
        }
    }
}

impl Validator for ShortenValidator {
    fn validate(&self, fields: &FieldMap) -> Vec<String> {
        let mut violations = self.base.validate(fields);
        if self.session.is_authenticated() {
            violations.extend(self.authenticated.validate(fields));
        }
        violations
    }
}

/// Profile history view: nothing to fill in, but it needs a session.
pub struct HistoryValidator {
    session: Arc<dyn SessionStore>,
}

impl HistoryValidator {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self { session }
    }
}

impl Validator for HistoryValidator {
    fn validate(&self, _fields: &FieldMap) -> Vec<String> {
        if self.session.is_authenticated() {
            Vec::new()
        } else {
            vec!["Log in to view your history".to_string()]
        }
    }
}
