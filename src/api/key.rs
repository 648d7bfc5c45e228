use std::sync::Arc;

use crate::subsystems::{KeyInfo, KeyStore};

/// Read access to named keys.
pub struct KeyApi {
    key_store: Arc<dyn KeyStore>,
}

impl KeyApi {
    pub(crate) fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self { key_store }
    }

    pub fn list(&self) -> Vec<KeyInfo> {
        self.key_store.list()
    }
}
