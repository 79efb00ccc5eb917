//! Application state shared across request handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::keystore::KeyStore;
use crate::recorder::EventRecorder;
use crate::signer::Signer;
use crate::store::Store;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    signer: Signer,
    recorder: EventRecorder,
}

impl AppState {
    /// Build the tracker components over one store handle.
    pub fn new(store: Arc<dyn Store>, store_timeout: Duration) -> Self {
        let signer = Signer::new(KeyStore::new(store.clone(), store_timeout));
        let recorder = EventRecorder::new(store.clone(), store_timeout);
        Self {
            inner: Arc::new(AppStateInner {
                store,
                signer,
                recorder,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub fn signer(&self) -> &Signer {
        &self.inner.signer
    }

    pub fn recorder(&self) -> &EventRecorder {
        &self.inner.recorder
    }
}
