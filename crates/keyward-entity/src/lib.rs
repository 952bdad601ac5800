//! # keyward-entity
//!
//! Domain entity models for Keyward. Every struct in this crate represents
//! a database table row or a domain value object. Database entities derive
//! `sqlx::FromRow` and the enums map onto PostgreSQL enum types.

/// Gives a fieldless enum its stored label: `as_str`, `Display`, and a
/// case-insensitive `FromStr` that rejects unknown labels as bad requests.
macro_rules! labelled {
    ($ty:ident, $noun:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $ty {
            type Err = keyward_core::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(keyward_core::AppError::bad_request(format!(
                        concat!("Invalid ", $noun, ": '{}'"),
                        s
                    ))),
                }
            }
        }
    };
}

pub mod sanction;
pub mod session;
pub mod two_factor;
pub mod user;
