//! Emailed one-time codes: issuance, verification and resend.

pub mod code;
pub mod service;

pub use service::{IssuedCode, TwoFactorService};
