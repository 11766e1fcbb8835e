use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Registration, UserStore};
use crate::{
    domain::{image::sort_most_recent_first, ImageRecord, UserAccount},
    infrastructure::error::AppResult,
};

#[derive(Debug, Clone)]
struct UserDocument {
    account: UserAccount,
    images: Vec<ImageRecord>,
}

/// Stockage en mémoire, utilisé en développement et dans les tests.
/// Chaque écriture prend le verrou une seule fois, ce qui rend
/// l'ajout avec création du compte atomique.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    documents: RwLock<HashMap<String, UserDocument>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let documents = self.documents.read().await;
        Ok(documents.get(email).map(|doc| doc.account.clone()))
    }

    async fn register(&self, email: &str, password_hash: &str, name: &str) -> AppResult<Registration> {
        let mut documents = self.documents.write().await;
        let document = documents
            .entry(email.to_string())
            .or_insert_with(|| UserDocument {
                account: UserAccount::implicit(email),
                images: Vec::new(),
            });

        if document.account.has_password() {
            return Ok(Registration::AlreadyRegistered);
        }

        document.account.password_hash = Some(password_hash.to_string());
        document.account.name = name.to_string();
        Ok(Registration::Created(document.account.clone()))
    }

    async fn append_image(&self, record: &ImageRecord) -> AppResult<()> {
        let mut documents = self.documents.write().await;
        documents
            .entry(record.user_email.clone())
            .or_insert_with(|| UserDocument {
                account: UserAccount::implicit(&record.user_email),
                images: Vec::new(),
            })
            .images
            .push(record.clone());
        Ok(())
    }

    async fn list_images(&self, email: &str) -> AppResult<Option<Vec<ImageRecord>>> {
        let documents = self.documents.read().await;
        Ok(documents.get(email).map(|doc| {
            let mut images = doc.images.clone();
            sort_most_recent_first(&mut images);
            images
        }))
    }

    async fn has_image(&self, email: &str, record_id: Uuid) -> AppResult<bool> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(email)
            .map(|doc| doc.images.iter().any(|image| image.id == record_id))
            .unwrap_or(false))
    }
}
