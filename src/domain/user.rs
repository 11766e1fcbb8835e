use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Compte utilisateur, identifié de façon unique par son email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    /// Identifiant unique de l'utilisateur (UUID)
    pub id: Uuid,
    /// Email normalisé (clé unique)
    pub email: String,
    /// Hash Argon2 du mot de passe; absent pour les comptes créés par un upload
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Nom affiché
    pub name: String,
    /// Date de création du compte
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Compte créé implicitement lors d'un premier upload
    pub fn implicit(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: None,
            name: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Données requises pour l'inscription
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

/// Données pour la connexion d'un utilisateur
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserLogin {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Identité issue de la vérification d'un token, quel que soit le fournisseur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub provider: &'static str,
}

/// Normalise un email (les comptes sont indexés en minuscules, sans espaces)
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
