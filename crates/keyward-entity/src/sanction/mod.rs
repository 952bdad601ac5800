//! Account sanctions (blocks).

pub mod model;

pub use model::{NewSanction, Sanction};
