use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ServiceError;
use crate::storage::json_doc_store::JsonDocStore;

/// A stored user: a unique positive integer id plus whatever fields the
/// caller supplied at create/update time. The extra fields are untyped.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// The entire persisted state: `{ "usuarios": [ ... ] }`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub usuarios: Vec<User>,
}

/// Smallest positive integer not currently used as an id.
///
/// Ids freed by deletion are reused before the range is extended: with ids
/// {1,2,4} the next id is 3, with {1,2,3} it is 4, with no users it is 1.
pub fn allocate_id(usuarios: &[User]) -> i64 {
    let mut ids: Vec<i64> = usuarios.iter().map(|u| u.id).collect();
    ids.sort_unstable();

    let mut available = 1;
    for id in ids {
        if id != available {
            break;
        }
        available += 1;
    }
    available
}

/// File store: persists the usuarios document as JSON.
#[derive(Clone)]
pub struct UserStore {
    store: Arc<JsonDocStore<Document>>,
}

impl UserStore {
    /// Initialize the store, creating an empty document file if missing.
    pub async fn new<P: Into<std::path::PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonDocStore::<Document>::new(path).await?;
        Ok(Arc::new(Self { store }))
    }

    /// Every mutation rewrites the whole document; the user sequence is
    /// normalized to ascending id order before it hits the disk.
    async fn mutate<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Document) -> Result<T, ServiceError>,
    {
        self.store
            .update(|doc| {
                let out = f(doc)?;
                doc.usuarios.sort_by_key(|u| u.id);
                Ok(out)
            })
            .await
    }

    /// List all users, freshly loaded from disk.
    pub async fn list(&self) -> Result<Vec<User>, ServiceError> {
        Ok(self.store.load().await?.usuarios)
    }

    /// Find a user by id.
    pub async fn get(&self, id: i64) -> Result<Option<User>, ServiceError> {
        let doc = self.store.load().await?;
        Ok(doc.usuarios.into_iter().find(|u| u.id == id))
    }

    /// Create a user from the supplied fields under the next available id.
    pub async fn create(&self, mut fields: Map<String, Value>) -> Result<User, ServiceError> {
        if fields.is_empty() {
            return Err(ServiceError::Validation(
                "at least one field is required to create a user".into(),
            ));
        }
        // The id is owned by the allocator; a caller-supplied one would
        // break id uniqueness.
        fields.remove("id");

        self.mutate(|doc| {
            let user = User {
                id: allocate_id(&doc.usuarios),
                fields,
            };
            doc.usuarios.push(user.clone());
            Ok(user)
        })
        .await
    }

    /// Shallow-merge the supplied fields into an existing user: present
    /// fields overwrite, absent fields are preserved, none are removed.
    pub async fn update(&self, id: i64, mut fields: Map<String, Value>) -> Result<User, ServiceError> {
        fields.remove("id");

        self.mutate(|doc| {
            let user = doc
                .usuarios
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| ServiceError::not_found("usuario"))?;
            for (k, v) in fields {
                user.fields.insert(k, v);
            }
            Ok(user.clone())
        })
        .await
    }

    /// Remove a user from the sequence, freeing its id for reuse.
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        self.mutate(|doc| {
            let pos = doc
                .usuarios
                .iter()
                .position(|u| u.id == id)
                .ok_or_else(|| ServiceError::not_found("usuario"))?;
            doc.usuarios.remove(pos);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("json object")
    }

    fn user(id: i64, fields: Value) -> User {
        User { id, fields: obj(fields) }
    }

    async fn setup_store() -> (Arc<UserStore>, std::path::PathBuf) {
        let tmp = std::env::temp_dir().join(format!("usuarios_{}.json", uuid::Uuid::new_v4()));
        let store = UserStore::new(&tmp).await.expect("store init");
        (store, tmp)
    }

    #[test]
    fn allocate_id_fills_gaps_first() {
        let users = vec![
            user(1, json!({})),
            user(2, json!({})),
            user(4, json!({})),
        ];
        assert_eq!(allocate_id(&users), 3);
    }

    #[test]
    fn allocate_id_extends_when_dense() {
        let users = vec![
            user(1, json!({})),
            user(2, json!({})),
            user(3, json!({})),
        ];
        assert_eq!(allocate_id(&users), 4);
    }

    #[test]
    fn allocate_id_starts_at_one() {
        assert_eq!(allocate_id(&[]), 1);
        // gap below the smallest id counts too
        let users = vec![user(2, json!({})), user(3, json!({}))];
        assert_eq!(allocate_id(&users), 1);
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids_and_persists() -> Result<(), anyhow::Error> {
        let (store, tmp) = setup_store().await;

        let ana = store.create(obj(json!({"name": "Ana"}))).await?;
        let leo = store.create(obj(json!({"name": "Leo"}))).await?;
        assert_eq!(ana.id, 1);
        assert_eq!(leo.id, 2);

        // reload from disk through a fresh handle
        let reopened = UserStore::new(&tmp).await?;
        let all = reopened.list().await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].fields["name"], json!("Ana"));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn deleted_id_is_reused() -> Result<(), anyhow::Error> {
        let (store, tmp) = setup_store().await;

        let ana = store.create(obj(json!({"name": "Ana"}))).await?;
        store.create(obj(json!({"name": "Leo"}))).await?;
        store.delete(ana.id).await?;

        let max = store.create(obj(json!({"name": "Max"}))).await?;
        assert_eq!(max.id, ana.id, "freed id must be reused, not extended");

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_is_a_shallow_merge() -> Result<(), anyhow::Error> {
        let (store, tmp) = setup_store().await;

        let ana = store
            .create(obj(json!({"name": "Ana", "city": "Lima"})))
            .await?;

        // subset body: user unchanged
        let same = store.update(ana.id, obj(json!({"name": "Ana"}))).await?;
        assert_eq!(same, store.get(ana.id).await?.expect("exists"));
        assert_eq!(same.fields["city"], json!("Lima"));

        // overwrite one field, preserve the rest
        let moved = store.update(ana.id, obj(json!({"city": "Cusco"}))).await?;
        assert_eq!(moved.fields["name"], json!("Ana"));
        assert_eq!(moved.fields["city"], json!("Cusco"));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn body_supplied_id_is_ignored() -> Result<(), anyhow::Error> {
        let (store, tmp) = setup_store().await;

        let created = store.create(obj(json!({"id": 99, "name": "Ana"}))).await?;
        assert_eq!(created.id, 1);
        assert!(!created.fields.contains_key("id"));

        let updated = store
            .update(created.id, obj(json!({"id": 42, "name": "Ana María"})))
            .await?;
        assert_eq!(updated.id, 1);
        assert_eq!(updated.fields["name"], json!("Ana María"));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn empty_create_body_rejected() -> Result<(), anyhow::Error> {
        let (store, tmp) = setup_store().await;
        assert!(matches!(
            store.create(Map::new()).await,
            Err(ServiceError::Validation(_))
        ));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_user_is_not_found() -> Result<(), anyhow::Error> {
        let (store, tmp) = setup_store().await;
        assert!(store.get(9999).await?.is_none());
        assert!(matches!(
            store.update(9999, obj(json!({"name": "x"}))).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(9999).await,
            Err(ServiceError::NotFound(_))
        ));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn writes_normalize_order_by_id() -> Result<(), anyhow::Error> {
        let (store, tmp) = setup_store().await;

        for name in ["a", "b", "c"] {
            store.create(obj(json!({"name": name}))).await?;
        }
        store.delete(1).await?;
        store.create(obj(json!({"name": "d"}))).await?; // reuses id 1

        let raw = tokio::fs::read(&tmp).await?;
        let doc: Document = serde_json::from_slice(&raw)?;
        let ids: Vec<i64> = doc.usuarios.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2, 3], "file order must be ascending by id");

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
