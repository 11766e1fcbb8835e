use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{ImageMeta, ImageRecord, ModelKind},
    infrastructure::{database::UserStore, error::AppResult},
};

/// Archivage des paires croquis / rendu sur le compte de l'utilisateur
#[derive(Clone)]
pub struct ImageArchive {
    store: Arc<dyn UserStore>,
}

impl ImageArchive {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Ajoute l'enregistrement (création du compte si besoin) puis relit le
    /// compte pour confirmer l'écriture. Renvoie l'id seulement si la
    /// relecture le retrouve.
    pub async fn append_image(
        &self,
        email: &str,
        sketch: Vec<u8>,
        generated: Vec<u8>,
        kind: ModelKind,
        meta: ImageMeta,
    ) -> AppResult<Option<Uuid>> {
        let record = ImageRecord::new(email, sketch, generated, kind, meta);
        self.store.append_image(&record).await?;

        match self.store.has_image(email, record.id).await {
            Ok(true) => {
                info!(email, record_id = %record.id, model = %kind, "💾 Image enregistrée");
                Ok(Some(record.id))
            }
            Ok(false) => {
                warn!(email, record_id = %record.id, "⚠️ Enregistrement introuvable après écriture");
                Ok(None)
            }
            Err(e) => {
                warn!(email, record_id = %record.id, error = %e, "⚠️ Relecture impossible après écriture");
                Ok(None)
            }
        }
    }
}
