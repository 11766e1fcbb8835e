// core/mod.rs
pub mod auth_service;
pub mod caption;
pub mod imaging;
pub mod intake;
pub mod persistence;
pub mod sketch_gate;

// Ré-exports pour faciliter l'import
pub use auth_service::{
    AuthService, AuthSession, GoogleTokenVerifier, JwtVerifier, TokenVerifier, VerifierChain,
};
pub use caption::{CaptionValidator, RetryPolicy};
pub use intake::{IntakeOutcome, IntakePipeline, IntakeSettings, IntakeStage, Submission};
pub use persistence::ImageArchive;
pub use sketch_gate::SketchGate;
