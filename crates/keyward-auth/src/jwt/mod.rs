//! Access/refresh token encoding, decoding, and issuance.

pub mod claims;
pub mod decoder;
pub mod encoder;
pub mod issuer;

pub use claims::{Claims, TokenType};
pub use decoder::{JwtDecoder, TokenStatus};
pub use encoder::{JwtEncoder, TokenPair};
pub use issuer::TokenIssuer;
