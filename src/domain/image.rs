use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Titre attribué aux designs envoyés sans titre
pub const DEFAULT_TITLE: &str = "Untitled Design";

/// Statut initial de tout enregistrement
pub const DEFAULT_STATUS: &str = "pending";

/// Modèles connus du registre, un par variante de rendu plus le classifieur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "primary-metal-a")]
    Gold,
    #[serde(rename = "primary-metal-b")]
    Silver,
    #[serde(rename = "metal-with-gemstone")]
    GoldGemstone,
    #[serde(rename = "sketch-classifier")]
    SketchClassifier,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Gold,
        ModelKind::Silver,
        ModelKind::GoldGemstone,
        ModelKind::SketchClassifier,
    ];

    /// Tag stable utilisé dans les logs et en base
    pub fn tag(&self) -> &'static str {
        match self {
            ModelKind::Gold => "primary-metal-a",
            ModelKind::Silver => "primary-metal-b",
            ModelKind::GoldGemstone => "metal-with-gemstone",
            ModelKind::SketchClassifier => "sketch-classifier",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Catégorie affichée à l'utilisateur pour un rendu
    pub fn category(&self) -> &'static str {
        match self {
            ModelKind::Gold => "gold",
            ModelKind::Silver => "silver",
            ModelKind::GoldGemstone => "gold-gemstone",
            ModelKind::SketchClassifier => "classifier",
        }
    }

    /// Nom du fichier ONNX attendu dans le répertoire des modèles
    pub fn file_name(&self) -> &'static str {
        match self {
            ModelKind::Gold => "gold.onnx",
            ModelKind::Silver => "silver.onnx",
            ModelKind::GoldGemstone => "gold_gemstone.onnx",
            ModelKind::SketchClassifier => "sketch_classifier.onnx",
        }
    }

    pub fn is_generator(&self) -> bool {
        !matches!(self, ModelKind::SketchClassifier)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Paire croquis / rendu rattachée à un compte. Jamais modifiée après création.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: Uuid,
    pub user_email: String,
    #[serde(rename = "sketch_image", with = "base64_bytes")]
    pub sketch: Vec<u8>,
    #[serde(rename = "generated_image", with = "base64_bytes")]
    pub generated: Vec<u8>,
    pub model_type: ModelKind,
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Métadonnées facultatives fournies avec l'upload
#[derive(Debug, Clone, Default)]
pub struct ImageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl ImageRecord {
    pub fn new(
        user_email: &str,
        sketch: Vec<u8>,
        generated: Vec<u8>,
        model_type: ModelKind,
        meta: ImageMeta,
    ) -> Self {
        let title = meta
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Self {
            id: Uuid::new_v4(),
            user_email: user_email.to_string(),
            sketch,
            generated,
            model_type,
            category: model_type.category().to_string(),
            title,
            description: meta.description.filter(|d| !d.trim().is_empty()),
            status: DEFAULT_STATUS.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Trie du plus récent au plus ancien (ordre des chemins de lecture)
pub fn sort_most_recent_first(records: &mut [ImageRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
