use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const URL_SCHEME: &str = "blob:trackmap/";

#[derive(Debug)]
struct StagedBlob {
    media_type: &'static str,
    bytes: Arc<[u8]>,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    blobs: HashMap<u64, StagedBlob>,
}

/// In-memory blob store handing out temporary addressable URLs.
///
/// A blob lives exactly as long as its [`ObjectUrl`]; dropping the URL
/// revokes it.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Vec<u8>, media_type: &'static str) -> ObjectUrl {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.blobs.insert(
            id,
            StagedBlob {
                media_type,
                bytes: bytes.into(),
            },
        );
        debug!("staged {} blob {}", media_type, id);
        ObjectUrl {
            id,
            url: format!("{URL_SCHEME}{id}"),
            registry: self.clone(),
        }
    }

    /// Looks up a live URL, returning its media type and contents.
    pub fn resolve(&self, url: &str) -> Option<(&'static str, Arc<[u8]>)> {
        let id = url.strip_prefix(URL_SCHEME)?.parse::<u64>().ok()?;
        self.lock()
            .blobs
            .get(&id)
            .map(|blob| (blob.media_type, Arc::clone(&blob.bytes)))
    }

    /// Number of URLs that have not been revoked yet.
    pub fn live(&self) -> usize {
        self.lock().blobs.len()
    }

    fn revoke(&self, id: u64) {
        if self.lock().blobs.remove(&id).is_some() {
            debug!("revoked blob {}", id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Temporary URL for a staged blob. Revoked on drop.
#[derive(Debug)]
pub struct ObjectUrl {
    id: u64,
    url: String,
    registry: BlobRegistry,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_resolves_until_dropped() {
        let registry = BlobRegistry::new();
        let url = registry.create(vec![1, 2, 3], "image/png");
        let (media_type, bytes) = registry.resolve(url.as_str()).unwrap();
        assert_eq!(media_type, "image/png");
        assert_eq!(&bytes[..], &[1, 2, 3]);
        assert_eq!(registry.live(), 1);

        let address = url.as_str().to_string();
        drop(url);
        assert_eq!(registry.live(), 0);
        assert!(registry.resolve(&address).is_none());
    }

    #[test]
    fn resolved_bytes_outlive_revocation() {
        let registry = BlobRegistry::new();
        let url = registry.create(vec![9; 4], "image/bmp");
        let (_, bytes) = registry.resolve(url.as_str()).unwrap();
        drop(url);
        assert_eq!(bytes.len(), 4);
    }

    #[test]
    fn foreign_urls_do_not_resolve() {
        let registry = BlobRegistry::new();
        assert!(registry.resolve("https://example.com/plan.png").is_none());
        assert!(registry.resolve("blob:trackmap/abc").is_none());
    }
}
