//! # Stockage des comptes
//!
//! Le stockage est vu comme un magasin de documents indexé par email:
//! lecture d'un compte, inscription, ajout atomique d'un enregistrement
//! (création du compte si absent) et lecture des enregistrements.

pub mod memory;
pub mod users;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{ImageRecord, UserAccount},
    infrastructure::error::AppResult,
    utils::{Config, StoreBackend},
};

pub use memory::MemoryUserStore;
pub use users::PgUserStore;

/// Résultat d'une inscription
#[derive(Debug, Clone)]
pub enum Registration {
    /// Compte créé, ou compte implicite réclamé avec un mot de passe
    Created(UserAccount),
    /// Un compte avec mot de passe existe déjà pour cet email
    AlreadyRegistered,
}

/// Opérations de stockage requises par le backend
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Récupère un compte par email normalisé
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;

    /// Inscrit un compte. Un compte créé implicitement par un upload (sans
    /// mot de passe) est réclamé: le mot de passe et le nom y sont posés.
    async fn register(&self, email: &str, password_hash: &str, name: &str) -> AppResult<Registration>;

    /// Ajoute un enregistrement au compte `record.user_email`, en créant le
    /// compte s'il n'existe pas. L'opération est atomique.
    async fn append_image(&self, record: &ImageRecord) -> AppResult<()>;

    /// Enregistrements du compte, du plus récent au plus ancien.
    /// `None` si le compte n'existe pas.
    async fn list_images(&self, email: &str) -> AppResult<Option<Vec<ImageRecord>>>;

    /// Vrai si l'enregistrement est présent sur le compte
    async fn has_image(&self, email: &str, record_id: Uuid) -> AppResult<bool>;
}

/// Gestion de la connexion à la base de données
#[derive(Clone)]
pub struct Database {
    pub pool: Arc<Pool<Postgres>>,
}

impl Database {
    /// Crée une nouvelle connexion à la base de données
    pub async fn new(database_url: &str, max_connections: u32) -> AppResult<Self> {
        info!("🔌 Connexion à la base de données PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        info!("✅ Connexion établie avec succès");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Exécuter les migrations
    pub async fn run_migrations(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }
}

/// Construit le backend de stockage choisi par la configuration
pub async fn connect_store(config: &Config) -> AppResult<Arc<dyn UserStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("🗃️ Stockage en mémoire (données perdues à l'arrêt)");
            Ok(Arc::new(MemoryUserStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                crate::infrastructure::error::AppError::Configuration(
                    "DATABASE_URL is not set".to_string(),
                )
            })?;
            let db = Database::new(url, config.database_max_connections).await?;
            db.run_migrations().await?;
            Ok(Arc::new(PgUserStore::new(db)))
        }
    }
}
