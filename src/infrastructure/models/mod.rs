//! # Passerelle des modèles
//!
//! Registre immuable des modèles chargés au démarrage. Chaque modèle prend un
//! tenseur NHWC `f32` et renvoie un tenseur NHWC. L'inférence tourne sur le
//! pool bloquant de tokio.
//!
//! Un modèle absent du registre est une erreur permanente `NotLoaded`: le
//! registre n'est jamais rechargé à chaud.

#[cfg(feature = "onnx")]
pub mod onnx;

use ndarray::Array4;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::task;
use tracing::warn;

use crate::{domain::ModelKind, infrastructure::error::AppError};

/// Tenseur image au format NHWC
pub type ImageTensor = Array4<f32>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model {0} is not loaded")]
    NotLoaded(ModelKind),

    #[error("Model resources exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Model runtime error: {0}")]
    Runtime(String),
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::ResourceExhausted(msg) => AppError::ResourceExhausted(msg),
            other => AppError::Model(other.to_string()),
        }
    }
}

/// Un modèle chargé, appelé de façon synchrone
pub trait ImageModel: Send + Sync {
    fn infer(&self, input: &ImageTensor) -> Result<ImageTensor, ModelError>;
}

/// Registre des modèles disponibles
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<ModelKind, Arc<dyn ImageModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un modèle pendant la construction du registre
    pub fn with(mut self, kind: ModelKind, model: Arc<dyn ImageModel>) -> Self {
        self.models.insert(kind, model);
        self
    }

    /// Charge tous les fichiers ONNX présents dans `model_dir`.
    /// Un fichier manquant ou invalide est journalisé puis ignoré.
    #[cfg(feature = "onnx")]
    pub fn load(model_dir: &Path) -> Self {
        let mut registry = Self::new();
        for kind in ModelKind::ALL {
            let path = model_dir.join(kind.file_name());
            if !path.exists() {
                warn!("⚠️ Modèle {} absent: {}", kind, path.display());
                continue;
            }
            match onnx::OnnxModel::load(&path) {
                Ok(model) => {
                    tracing::info!("✅ Modèle {} chargé depuis {}", kind, path.display());
                    registry = registry.with(kind, Arc::new(model));
                }
                Err(e) => warn!("⚠️ Échec du chargement du modèle {}: {}", kind, e),
            }
        }
        registry
    }

    /// Sans runtime ONNX compilé, aucun modèle ne peut être chargé
    #[cfg(not(feature = "onnx"))]
    pub fn load(model_dir: &Path) -> Self {
        warn!(
            "⚠️ Compilé sans la feature `onnx`: aucun modèle chargé depuis {}",
            model_dir.display()
        );
        Self::new()
    }

    pub fn has(&self, kind: ModelKind) -> bool {
        self.models.contains_key(&kind)
    }

    /// Modèles chargés, dans l'ordre canonique
    pub fn loaded_kinds(&self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    /// Exécute un modèle sur le pool bloquant
    pub async fn invoke(&self, kind: ModelKind, input: ImageTensor) -> Result<ImageTensor, ModelError> {
        let model = self
            .models
            .get(&kind)
            .cloned()
            .ok_or(ModelError::NotLoaded(kind))?;

        task::spawn_blocking(move || model.infer(&input))
            .await
            .map_err(|e| ModelError::Runtime(format!("inference task failed: {}", e)))?
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Modèles factices pour les tests du pipeline

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renvoie toujours le même score de classification
    pub struct FixedScore {
        pub score: f32,
        pub calls: AtomicUsize,
    }

    impl FixedScore {
        pub fn new(score: f32) -> Arc<Self> {
            Arc::new(Self {
                score,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ImageModel for FixedScore {
        fn infer(&self, _input: &ImageTensor) -> Result<ImageTensor, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Array4::from_elem((1, 1, 1, 1), self.score))
        }
    }

    /// Générateur qui recopie l'entrée
    #[derive(Default)]
    pub struct Echo {
        pub calls: AtomicUsize,
    }

    impl ImageModel for Echo {
        fn infer(&self, input: &ImageTensor) -> Result<ImageTensor, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(input.clone())
        }
    }

    /// Modèle qui échoue toujours avec l'erreur donnée
    pub struct Failing(pub ModelError);

    impl ImageModel for Failing {
        fn infer(&self, _input: &ImageTensor) -> Result<ImageTensor, ModelError> {
            Err(self.0.clone())
        }
    }

    /// Modèle qui panique, pour simuler une tâche d'inférence perdue
    pub struct Panicking;

    impl ImageModel for Panicking {
        fn infer(&self, _input: &ImageTensor) -> Result<ImageTensor, ModelError> {
            panic!("inference crashed")
        }
    }
}
