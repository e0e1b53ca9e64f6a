//! Token issuing, password hashing and the request extractors that gate the API.

pub mod claims;
pub mod extractors;
pub mod jwt;
pub mod password;

use lazy_static::lazy_static;
use regex::Regex;

pub use claims::{Claims, TokenKind};
pub use extractors::{AdminUser, AuthUser, DoctorUser};
pub use jwt::JwtKeys;
pub use password::{hash_password, verify_password};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::is_valid_email;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("patient@demo.com"));
        assert!(!is_valid_email("patient@demo"));
        assert!(!is_valid_email("pa tient@demo.com"));
        assert!(!is_valid_email("@demo.com"));
    }
}
