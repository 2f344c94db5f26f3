//! Application state.

use std::sync::Arc;

use crm_core::{AccessGate, PlanCatalog};
use crm_store::Store;

use crate::auth::TokenService;
use crate::config::ServiceConfig;
use crate::lifecycle::BillingLifecycleJob;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Plan catalog, fixed for the lifetime of the process.
    pub catalog: Arc<PlanCatalog>,

    /// Plan, feature, limit and status checks over `catalog`.
    pub gate: AccessGate,

    /// Access token signer.
    pub tokens: TokenService,

    /// The billing lifecycle job, shared by the scheduler and the manual trigger.
    pub lifecycle: Arc<BillingLifecycleJob>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig, catalog: PlanCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let tokens = TokenService::new(
            &config.jwt_secret,
            config.jwt_issuer.clone(),
            config.token_ttl_seconds,
        );
        let lifecycle = Arc::new(BillingLifecycleJob::new(Arc::clone(&store)));

        Self {
            gate: AccessGate::new(Arc::clone(&catalog)),
            store,
            config,
            catalog,
            tokens,
            lifecycle,
        }
    }
}
