pub mod database;
pub mod error;
pub mod external;
pub mod models;

pub use database::{connect_store, Database, MemoryUserStore, PgUserStore, UserStore};
pub use error::{AppError, AppResult};
pub use external::{Captioner, GoogleIdentityClient, HttpCaptioner};
pub use models::{ImageModel, ModelError, ModelRegistry};
