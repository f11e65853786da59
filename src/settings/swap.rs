use std::sync::Arc;

use secrecy::ExposeSecret;
use secrecy::Secret;
use tokio::sync::OwnedMutexGuard;

use super::OptionKey;
use super::OptionStore;

/// Temporarily replaces a stored credential. The previous value is put back
/// by `restore`, or, if the guard is dropped without it (early return,
/// panic, cancelled request), by a task spawned from `Drop`.
///
/// The refresh lock is held until the previous value is back, including
/// by the task spawned from `Drop`.
pub(super) struct CredentialSwap {
    options: Arc<dyn OptionStore>,
    key: OptionKey,
    original: Option<String>,
    pending: bool,
    lock: Option<OwnedMutexGuard<()>>,
}

impl CredentialSwap {
    /// Store `probe` under `key`. Nothing is written if it is already the
    /// stored value.
    pub(super) async fn begin(
        lock: OwnedMutexGuard<()>,
        options: Arc<dyn OptionStore>,
        key: OptionKey,
        probe: &Secret<String>,
    ) -> Result<Self, anyhow::Error> {
        let original = options.get(key.as_str()).await?;
        let pending = original.as_deref() != Some(probe.expose_secret().as_str());
        if pending {
            options.set(key.as_str(), probe.expose_secret()).await?;
        }
        Ok(Self {
            options,
            key,
            original,
            pending,
            lock: Some(lock),
        })
    }

    pub(super) async fn restore(mut self) -> Result<(), anyhow::Error> {
        if self.pending {
            put_back(self.options.as_ref(), self.key, self.original.as_deref()).await?;
            self.pending = false;
        }
        Ok(())
    }
}

async fn put_back(
    options: &dyn OptionStore,
    key: OptionKey,
    original: Option<&str>,
) -> Result<(), anyhow::Error> {
    match original {
        Some(value) => options.set(key.as_str(), value).await,
        None => options.delete(key.as_str()).await,
    }
}

impl Drop for CredentialSwap {
    fn drop(&mut self) {
        if !self.pending {
            return;
        }
        let options = self.options.clone();
        let key = self.key;
        let original = self.original.take();
        let lock = self.lock.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = put_back(options.as_ref(), key, original.as_deref()).await {
                        tracing::error!(
                            error.cause_chain = ?e,
                            option = key.as_str(),
                            "Failed to restore credential"
                        );
                    }
                    drop(lock);
                });
            }
            Err(_) => tracing::error!(
                option = key.as_str(),
                "No runtime left to restore credential"
            ),
        }
    }
}
