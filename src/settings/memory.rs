use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;

use super::OptionStore;

/// Options kept in process memory. Used by tests, and by deployments that
/// configure everything through `POST /admin/settings` after each start.
#[derive(Default)]
pub struct InMemoryOptionStore {
    options: RwLock<HashMap<String, String>>,
}

impl InMemoryOptionStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_options<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            options: RwLock::new(
                options
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

fn poisoned<T>(_: T) -> anyhow::Error { anyhow!("Option store lock was poisoned") }

#[async_trait]
impl OptionStore for InMemoryOptionStore {
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>, anyhow::Error> {
        Ok(self.options.read().map_err(poisoned)?.get(key).cloned())
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), anyhow::Error> {
        self.options
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(
        &self,
        key: &str,
    ) -> Result<(), anyhow::Error> {
        self.options.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}
