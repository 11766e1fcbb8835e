//! # Pipeline d'intake
//!
//! Parcours d'une soumission de croquis:
//!
//! ```text
//! Received → ClassifierChecked → CaptionChecked → Generated → Persisted → Responded
//! ```
//!
//! Le premier rejet ferme interrompt le pipeline: une entrée invalide est
//! refusée avant tout appel de modèle, un croquis rejeté n'est jamais envoyé
//! au service de légende ni au générateur. Les validateurs facultatifs qui ne
//! peuvent pas se prononcer laissent passer la requête. Un échec d'archivage
//! après génération est journalisé mais n'empêche pas la réponse.

use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{caption::CaptionValidator, imaging, persistence::ImageArchive, sketch_gate::SketchGate};
use crate::{
    domain::{normalize_email, CaptionVerdict, ImageMeta, ModelKind, SketchVerdict, ValidationOutcome},
    infrastructure::{
        database::UserStore,
        error::{invalid_input, AppError, AppResult},
        models::ModelRegistry,
    },
    utils::Config,
};

/// Étapes du pipeline, utilisées comme champ `stage` des logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    ClassifierChecked,
    CaptionChecked,
    Generated,
    Persisted,
    Responded,
}

impl IntakeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeStage::Received => "received",
            IntakeStage::ClassifierChecked => "classifier_checked",
            IntakeStage::CaptionChecked => "caption_checked",
            IntakeStage::Generated => "generated",
            IntakeStage::Persisted => "persisted",
            IntakeStage::Responded => "responded",
        }
    }
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Soumission reçue de la couche HTTP
#[derive(Debug, Clone)]
pub struct Submission {
    pub email: String,
    pub image: Vec<u8>,
    pub kind: ModelKind,
    pub meta: ImageMeta,
}

/// Résultat d'une soumission acceptée
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    /// Rendu généré, encodé en PNG
    pub png: Vec<u8>,
    /// Présent quand l'archivage a été écrit et relu
    pub record_id: Option<Uuid>,
    pub validation: ValidationOutcome,
}

#[derive(Debug, Clone, Copy)]
pub struct IntakeSettings {
    pub sketch_threshold: f32,
    pub max_upload_bytes: usize,
}

impl IntakeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sketch_threshold: config.sketch_threshold,
            max_upload_bytes: config.max_upload_bytes(),
        }
    }
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            sketch_threshold: 0.5,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

pub struct IntakePipeline {
    registry: Arc<ModelRegistry>,
    gate: SketchGate,
    captions: CaptionValidator,
    archive: ImageArchive,
    settings: IntakeSettings,
}

impl IntakePipeline {
    pub fn new(
        registry: Arc<ModelRegistry>,
        captions: CaptionValidator,
        store: Arc<dyn UserStore>,
        settings: IntakeSettings,
    ) -> Self {
        Self {
            gate: SketchGate::new(registry.clone(), settings.sketch_threshold),
            registry,
            captions,
            archive: ImageArchive::new(store),
            settings,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.settings.max_upload_bytes
    }

    #[instrument(skip(self, submission), fields(email = %submission.email, model = %submission.kind))]
    pub async fn submit(&self, submission: Submission) -> AppResult<IntakeOutcome> {
        let Submission {
            email,
            image,
            kind,
            meta,
        } = submission;

        // Received
        let email = normalize_email(&email);
        if email.is_empty() {
            return Err(invalid_input("Email is required"));
        }
        if image.is_empty() {
            return Err(invalid_input("No image file provided"));
        }
        if image.len() > self.settings.max_upload_bytes {
            return Err(invalid_input(format!(
                "Image exceeds the maximum upload size of {} bytes",
                self.settings.max_upload_bytes
            )));
        }
        if !kind.is_generator() {
            return Err(invalid_input(format!("{} cannot render images", kind)));
        }
        let inputs = imaging::prepare_blocking(image.clone()).await?;
        info!(stage = %IntakeStage::Received, bytes = image.len(), "📥 Croquis reçu");

        // ClassifierChecked
        let sketch = self.gate.classify(inputs.classifier).await;
        if let SketchVerdict::NotSketch(confidence) = sketch {
            info!(stage = %IntakeStage::ClassifierChecked, confidence, "🚫 Rejeté: pas un croquis");
            return Err(AppError::NotSketch { confidence });
        }
        info!(stage = %IntakeStage::ClassifierChecked, verdict = ?sketch, "🔍 Classification terminée");

        // CaptionChecked
        let caption = self.captions.validate(&image).await;
        if let CaptionVerdict::NotJewelry(caption) = caption {
            info!(stage = %IntakeStage::CaptionChecked, caption = %caption, "🚫 Rejeté: pas un bijou");
            return Err(AppError::NotJewelry { caption });
        }
        info!(stage = %IntakeStage::CaptionChecked, verdict = ?caption, "🔍 Légende vérifiée");

        let validation = ValidationOutcome::combine(sketch, Some(&caption));

        // Generated
        let output = self
            .registry
            .invoke(kind, inputs.generator)
            .await
            .map_err(|e| {
                warn!(stage = %IntakeStage::Generated, error = %e, "❌ Échec de la génération");
                AppError::from(e)
            })?;
        let png = imaging::encode_png_blocking(output).await?;
        info!(stage = %IntakeStage::Generated, bytes = png.len(), "🎨 Rendu généré");

        // Persisted
        let record_id = match self
            .archive
            .append_image(&email, image, png.clone(), kind, meta)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(stage = %IntakeStage::Persisted, error = %e, "⚠️ Archivage impossible, rendu renvoyé quand même");
                None
            }
        };

        info!(
            stage = %IntakeStage::Responded,
            outcome = validation.as_header(),
            persisted = record_id.is_some(),
            "✅ Soumission traitée"
        );
        Ok(IntakeOutcome {
            png,
            record_id,
            validation,
        })
    }
}
