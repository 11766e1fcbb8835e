//! # Erreurs de l'application
//!
//! Taxonomie unique des erreurs remontées par les routes. Chaque variante
//! porte son code HTTP; les erreurs 5xx sont journalisées côté serveur et
//! renvoyées au client avec un message générique.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::{json, Map, Value};
use sqlx::Error as SqlxError;
use tracing::error;
use validator::ValidationErrors;

/// Type de résultat standard pour l'application
pub type AppResult<T> = Result<T, AppError>;

/// Erreurs principales de l'application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Requête incomplète ou invalide (400)
    #[error("{0}")]
    InvalidInput(String),

    /// L'image n'a pas été reconnue comme un croquis (400)
    #[error("Image does not appear to be a sketch")]
    NotSketch { confidence: f32 },

    /// La légende de l'image ne décrit pas un bijou (400)
    #[error("Image does not appear to be jewelry-related")]
    NotJewelry { caption: String },

    /// Email déjà enregistré avec un mot de passe (400)
    #[error("{0}")]
    Conflict(String),

    /// Identifiants absents ou invalides (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Ressource inconnue (404)
    #[error("{0} not found")]
    NotFound(String),

    /// Ressources de calcul épuisées, le client peut réessayer (503)
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Échec définitif du modèle pour cette requête (500)
    #[error("Model error: {0}")]
    Model(String),

    /// Erreur de base de données (500)
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    /// Erreur de configuration (500)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Erreur interne du serveur (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message destiné au client (jamais de détail interne pour les 5xx)
    pub fn client_message(&self) -> String {
        match self {
            AppError::ResourceExhausted(_) => {
                "Model resources are exhausted, please retry later".to_string()
            }
            AppError::Model(_) => "Image generation failed".to_string(),
            AppError::Database(_) | AppError::Configuration(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Champs supplémentaires ajoutés au corps JSON de l'erreur
    fn extra_fields(&self) -> Map<String, Value> {
        let mut extra = Map::new();
        match self {
            AppError::NotSketch { confidence } => {
                extra.insert("confidence".into(), json!(shortest_decimal(*confidence)));
            }
            AppError::NotJewelry { caption } => {
                extra.insert("caption".into(), json!(caption));
            }
            AppError::ResourceExhausted(_) => {
                extra.insert("retry_suggested".into(), json!(true));
            }
            _ => {}
        }
        extra
    }
}

/// Élargit un score `f32` en `f64` sans le bruit binaire (0.2 reste 0.2)
fn shortest_decimal(value: f32) -> f64 {
    value.to_string().parse().unwrap_or(f64::from(value))
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::NotSketch { .. }
            | AppError::NotJewelry { .. }
            | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ResourceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Model(_)
            | AppError::Database(_)
            | AppError::Configuration(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), "❌ {}", self);
        }

        let mut body = Map::new();
        body.insert("error".into(), json!(self.client_message()));
        body.insert("code".into(), json!(status.as_u16()));
        body.extend(self.extra_fields());

        HttpResponse::build(status).json(Value::Object(body))
    }
}

// Implémentations From pour les conversions automatiques

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match err.message.as_ref() {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        AppError::InvalidInput(messages.join("; "))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", error))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(error: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Task join error: {}", error))
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> Self {
        AppError::InvalidInput(format!("Malformed multipart body: {}", error))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Configuration(format!("Migration failed: {}", error))
    }
}

// Helper functions pour créer des erreurs courantes
pub fn invalid_input<T: Into<String>>(message: T) -> AppError {
    AppError::InvalidInput(message.into())
}

pub fn unauthorized<T: Into<String>>(message: T) -> AppError {
    AppError::Unauthorized(message.into())
}

pub fn not_found<T: Into<String>>(resource: T) -> AppError {
    AppError::NotFound(resource.into())
}
