use std::{io, marker::PhantomData, path::PathBuf, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::debug;

use crate::errors::ServiceError;

/// Generic JSON file-backed document store.
///
/// Persists a single serde document to a JSON file. Every read loads the
/// file fresh from disk and every write rewrites it wholesale, so the file
/// is the only source of truth between requests. Writes go through a
/// temp-file-then-rename cycle; a crash mid-write cannot truncate the store.
///
/// Mutations are serialized by a per-store lock held across the whole
/// load-mutate-save cycle. Two processes sharing one file are still
/// uncoordinated and the second writer wins.
pub struct JsonDocStore<D> {
    file_path: PathBuf,
    write_lock: Mutex<()>,
    _doc: PhantomData<D>,
}

impl<D> JsonDocStore<D>
where
    D: Serialize + DeserializeOwned + Default,
{
    /// Initialize the store from a path. Creates the file with an empty
    /// (default) document if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        let store = Self {
            file_path,
            write_lock: Mutex::new(()),
            _doc: PhantomData,
        };
        if fs::metadata(&store.file_path).await.is_err() {
            store.save(&D::default()).await?;
        }

        Ok(Arc::new(store))
    }

    /// Read and parse the backing file. A missing file is a valid empty
    /// store; any other read or parse failure surfaces as
    /// `StoreUnavailable` rather than an empty document.
    pub async fn load(&self) -> Result<D, ServiceError> {
        let bytes = match fs::read(&self.file_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(D::default()),
            Err(e) => {
                return Err(ServiceError::StoreUnavailable(format!(
                    "read {}: {e}",
                    self.file_path.display()
                )))
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            ServiceError::StoreUnavailable(format!("parse {}: {e}", self.file_path.display()))
        })
    }

    /// Serialize the document and replace the backing file via rename.
    pub async fn save(&self, doc: &D) -> Result<(), ServiceError> {
        let data = serde_json::to_vec(doc).map_err(|e| {
            ServiceError::StoreUnavailable(format!("serialize {}: {e}", self.file_path.display()))
        })?;

        let mut tmp = self.file_path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, data).await.map_err(|e| {
            ServiceError::StoreUnavailable(format!("write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.file_path).await.map_err(|e| {
            ServiceError::StoreUnavailable(format!("rename into {}: {e}", self.file_path.display()))
        })?;
        debug!(path = %self.file_path.display(), "document saved");
        Ok(())
    }

    /// The read-modify-write cycle: load fresh, apply the mutation, save.
    /// Held under the write lock so concurrent in-process mutations cannot
    /// lose updates. A failed mutation leaves the file untouched.
    pub async fn update<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut D) -> Result<T, ServiceError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        let out = f(&mut doc)?;
        self.save(&doc).await?;
        Ok(out)
    }
}
