//! Access to the repository's config document by dotted key.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{NodeError, NodeResult};
use crate::subsystems::Repository;

pub struct ConfigApi {
    repo: Arc<dyn Repository>,
}

impl ConfigApi {
    pub(crate) fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Value at a dotted key such as `Addresses.Swarm`.
    pub fn get(&self, key: &str) -> NodeResult<Value> {
        let config = self.repo.config()?;
        let mut current = &config;
        for segment in key.split('.') {
            current = current
                .get(segment)
                .ok_or_else(|| NodeError::ConfigKeyNotFound(key.to_string()))?;
        }
        Ok(current.clone())
    }

    /// Set a dotted key, creating intermediate objects as needed.
    pub fn set(&self, key: &str, value: Value) -> NodeResult<()> {
        let mut config = self.repo.config()?;
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(last) = segments.pop().filter(|s| !s.is_empty()) else {
            return Err(NodeError::ConfigKeyNotFound(key.to_string()));
        };

        let mut current = &mut config;
        for segment in segments {
            let map = object_mut(current, key)?;
            current = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        object_mut(current, key)?.insert(last.to_string(), value);

        self.repo.replace_config(config)?;
        tracing::debug!(key = %key, "Config updated");
        Ok(())
    }

    pub fn get_all(&self) -> NodeResult<Value> {
        self.repo.config()
    }
}

fn object_mut<'a>(value: &'a mut Value, key: &str) -> NodeResult<&'a mut Map<String, Value>> {
    value
        .as_object_mut()
        .ok_or_else(|| NodeError::ConfigKeyNotFound(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::MemoryRepo;
    use serde_json::json;

    #[test]
    fn test_get_and_set_nested() {
        let api = ConfigApi::new(Arc::new(MemoryRepo::new()));
        assert_eq!(api.get("Datastore.StorageMax").unwrap(), json!("10GB"));

        api.set("Gateway.Writable", json!(true)).unwrap();
        assert_eq!(api.get("Gateway.Writable").unwrap(), json!(true));
        assert_eq!(api.get_all().unwrap()["Gateway"], json!({ "Writable": true }));
    }

    #[test]
    fn test_missing_and_scalar_parents() {
        let api = ConfigApi::new(Arc::new(MemoryRepo::new()));
        assert_eq!(api.get("Nope.Key"), Err(NodeError::ConfigKeyNotFound("Nope.Key".into())));
        assert_eq!(
            api.set("Datastore.StorageMax.Inner", json!(1)),
            Err(NodeError::ConfigKeyNotFound("Datastore.StorageMax.Inner".into()))
        );
    }
}
