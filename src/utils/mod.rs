// utils/mod.rs
pub mod config;
pub mod security;

// Ré-exports pour faciliter l'import
pub use config::{Config, StoreBackend};
pub use security::{hash_password, verify_password, AccessTokenClaims, TokenIssuer};
