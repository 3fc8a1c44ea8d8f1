use std::sync::Arc;

use crate::store::{BattleStore, IdentityProvider};

/// Shared per-process handles. Everything request-scoped lives in the store
/// or identity provider; handlers hold no mutable state between requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BattleStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn BattleStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }
}
