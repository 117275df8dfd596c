//! Identity resolution: create on first save, update afterwards.

use std::sync::Arc;
use tracing::debug;

use crate::error::SaveError;
use crate::note::Note;
use crate::session::SaveRequest;
use crate::store::NoteStore;

/// Dispatches a save request to `create` or `update` on the store.
///
/// The resolver is stateless; the identity it dispatches on travels in the
/// request and is adopted by the session once the result is known.
pub struct IdentityResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for IdentityResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: NoteStore + ?Sized> IdentityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Persist a request.
    ///
    /// A `NotFound` from `update` is returned as is. Falling back to `create`
    /// would mint a second identity for the same document.
    pub async fn persist(&self, request: &SaveRequest) -> Result<Note, SaveError> {
        match request.identity {
            None => {
                debug!("Creating note '{}'", request.title);
                let note = self.store.create(&request.title, &request.content).await?;
                debug!("Created note {} ('{}')", note.id, note.title);
                Ok(note)
            }
            Some(id) => {
                debug!("Updating note {} ('{}')", id, request.title);
                Ok(self
                    .store
                    .update(id, &request.title, &request.content)
                    .await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::NoteId;
    use crate::store::InMemoryStore;

    fn request(identity: Option<NoteId>, content: &str) -> SaveRequest {
        SaveRequest {
            generation: 0,
            identity,
            title: "notes".into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn test_no_identity_creates() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = IdentityResolver::new(Arc::clone(&store));

        let note = resolver.persist(&request(None, "hello")).await.unwrap();

        assert_eq!(note.content, "hello");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_known_identity_updates() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = IdentityResolver::new(Arc::clone(&store));
        let created = resolver.persist(&request(None, "v1")).await.unwrap();

        let updated = resolver
            .persist(&request(Some(created.id), "v2"))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.content, "v2");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_does_not_create() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = IdentityResolver::new(Arc::clone(&store));
        let created = resolver.persist(&request(None, "v1")).await.unwrap();
        store.delete(created.id).await.unwrap();

        let err = resolver
            .persist(&request(Some(created.id), "v2"))
            .await
            .unwrap_err();

        assert_eq!(err, SaveError::NotFound(created.id));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_works_with_trait_objects() {
        let store: Arc<dyn NoteStore> = Arc::new(InMemoryStore::new());
        let resolver = IdentityResolver::new(store);

        let note = resolver.persist(&request(None, "dyn")).await.unwrap();

        assert_eq!(note.id, NoteId(1));
    }
}
