//! Two-factor security records.

pub mod model;

pub use model::TwoFactorSecurity;
