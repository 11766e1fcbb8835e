//! # Domain Models Module
//!
//! Entités métier partagées par l'API, le pipeline d'intake et le stockage.
//!
//! ## Structure
//! - `user.rs`: comptes utilisateurs et identités authentifiées
//! - `image.rs`: enregistrements croquis / rendu et types de modèles
//! - `validation.rs`: verdicts des étapes de validation
//!
//! ## Conventions
//! - Les champs sensibles sont exclus de la sérialisation JSON
//! - Les identifiants utilisent `uuid::Uuid`
//! - Les timestamps utilisent `chrono::DateTime<chrono::Utc>`

pub mod image;
pub mod user;
pub mod validation;

pub use image::{ImageMeta, ImageRecord, ModelKind};
pub use user::{normalize_email, Identity, NewUser, UserAccount, UserLogin};
pub use validation::{CaptionVerdict, SketchVerdict, ValidationOutcome};
