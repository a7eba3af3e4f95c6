use std::sync::Arc;

use crate::auth::SignatureVerifier;
use crate::registry::TraderRegistry;

/// Shared per-process state. Both members are read-only after startup, so
/// concurrent requests share them without further synchronization.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TraderRegistry>,
    pub verifier: Arc<SignatureVerifier>,
}
