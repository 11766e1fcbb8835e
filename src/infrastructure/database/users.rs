use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Database, Registration, UserStore};
use crate::{
    domain::{ImageRecord, ModelKind, UserAccount},
    infrastructure::error::{AppError, AppResult},
};

/// Repository PostgreSQL pour les comptes et leurs enregistrements
#[derive(Clone)]
pub struct PgUserStore {
    db: Database,
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for UserAccount {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ImageRow {
    id: Uuid,
    user_email: String,
    sketch_image: Vec<u8>,
    generated_image: Vec<u8>,
    model_type: String,
    category: String,
    title: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ImageRow> for ImageRecord {
    type Error = AppError;

    fn try_from(row: ImageRow) -> AppResult<Self> {
        let model_type = ModelKind::from_tag(&row.model_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown model type in storage: {}", row.model_type))
        })?;

        Ok(Self {
            id: row.id,
            user_email: row.user_email,
            sketch: row.sketch_image,
            generated: row.generated_image,
            model_type,
            category: row.category,
            title: row.title,
            description: row.description,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

impl PgUserStore {
    /// Crée une nouvelle instance du repository
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, email, password_hash, name, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.pool.as_ref())
        .await?;

        Ok(row.map(UserAccount::from))
    }

    async fn register(&self, email: &str, password_hash: &str, name: &str) -> AppResult<Registration> {
        // Le WHERE du DO UPDATE ne laisse réclamer que les comptes sans mot de passe
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO users (id, email, password_hash, name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
                SET password_hash = EXCLUDED.password_hash, name = EXCLUDED.name
                WHERE users.password_hash IS NULL
            RETURNING id, email, password_hash, name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(Utc::now())
        .fetch_optional(self.db.pool.as_ref())
        .await?;

        Ok(match row {
            Some(row) => Registration::Created(row.into()),
            None => Registration::AlreadyRegistered,
        })
    }

    async fn append_image(&self, record: &ImageRecord) -> AppResult<()> {
        // Création du compte et ajout en une seule instruction
        let result = sqlx::query(
            r#"
            WITH owner AS (
                INSERT INTO users (id, email, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
                RETURNING id
            )
            INSERT INTO image_records (
                id, user_id, sketch_image, generated_image, model_type,
                category, title, description, status, created_at
            )
            SELECT $4, owner.id, $5, $6, $7, $8, $9, $10, $11, $12
            FROM owner
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_email)
        .bind(record.created_at)
        .bind(record.id)
        .bind(&record.sketch)
        .bind(&record.generated)
        .bind(record.model_type.tag())
        .bind(&record.category)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.status)
        .bind(record.created_at)
        .execute(self.db.pool.as_ref())
        .await?;

        if result.rows_affected() != 1 {
            return Err(AppError::Internal(format!(
                "Expected one image row inserted, got {}",
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn list_images(&self, email: &str) -> AppResult<Option<Vec<ImageRecord>>> {
        let owner: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.db.pool.as_ref())
            .await?;

        let Some((user_id,)) = owner else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT r.id, u.email AS user_email, r.sketch_image, r.generated_image,
                   r.model_type, r.category, r.title, r.description, r.status, r.created_at
            FROM image_records r
            JOIN users u ON u.id = r.user_id
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC, r.seq DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.db.pool.as_ref())
        .await?;

        rows.into_iter()
            .map(ImageRecord::try_from)
            .collect::<AppResult<Vec<_>>>()
            .map(Some)
    }

    async fn has_image(&self, email: &str, record_id: Uuid) -> AppResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM image_records r
                JOIN users u ON u.id = r.user_id
                WHERE r.id = $1 AND u.email = $2
            )
            "#,
        )
        .bind(record_id)
        .bind(email)
        .fetch_one(self.db.pool.as_ref())
        .await?;

        Ok(exists)
    }
}
