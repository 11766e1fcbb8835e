use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    domain::{ModelKind, SketchVerdict},
    infrastructure::models::{ImageTensor, ModelRegistry},
};

/// Porte du classifieur de croquis. Ne bloque jamais une requête par
/// elle-même: sans classifieur ou en cas d'échec, le verdict est `Inconclusive`.
#[derive(Clone)]
pub struct SketchGate {
    registry: Arc<ModelRegistry>,
    threshold: f32,
}

impl SketchGate {
    pub fn new(registry: Arc<ModelRegistry>, threshold: f32) -> Self {
        Self { registry, threshold }
    }

    /// `input`: tenseur `1×150×150×3` produit par `imaging::classifier_input`
    pub async fn classify(&self, input: ImageTensor) -> SketchVerdict {
        if !self.registry.has(ModelKind::SketchClassifier) {
            debug!("Classifieur de croquis non chargé, étape ignorée");
            return SketchVerdict::Inconclusive;
        }

        match self.registry.invoke(ModelKind::SketchClassifier, input).await {
            Ok(output) => match output.iter().next() {
                Some(score) => SketchVerdict::from_score(*score, self.threshold),
                None => {
                    warn!("⚠️ Le classifieur a renvoyé une sortie vide");
                    SketchVerdict::Inconclusive
                }
            },
            Err(e) => {
                warn!("⚠️ Échec du classifieur de croquis: {}", e);
                SketchVerdict::Inconclusive
            }
        }
    }
}
