use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// In-memory object storage standing in for a hosted bucket service.
/// Objects are addressed as `bucket/path`; `public_url` is derivable without
/// an upload having happened, matching the hosted contract.
#[derive(Default)]
pub(super) struct ObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl ObjectStore {
    pub fn put(&self, bucket: &str, path: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(format!("{bucket}/{path}"), bytes.to_vec());
    }

    pub fn url(&self, bucket: &str, path: &str) -> String {
        format!("mem://{bucket}/{path}")
    }

    #[cfg(test)]
    pub fn get(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&format!("{bucket}/{path}"))
            .cloned()
    }
}
