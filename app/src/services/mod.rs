use domain::core::CoinTracker;
use std::sync::Arc;

use crate::api::auth::JwtKeys;

/// Cheaply cloneable handle shared by every request handler
#[derive(Clone)]
pub struct TrackerHandle {
    inner: Arc<CoinTracker>,
    keys: Arc<JwtKeys>,
}

impl TrackerHandle {
    pub fn new(tracker: CoinTracker, keys: JwtKeys) -> Self {
        Self {
            inner: Arc::new(tracker),
            keys: Arc::new(keys),
        }
    }

    pub fn tracker(&self) -> &CoinTracker {
        &self.inner
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }
}
