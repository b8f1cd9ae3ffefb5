//! Application State Management
//!
//! [`AppState`] is the central state container handed to the axum router.
//! The `FromRef` implementations let handlers extract just the piece they
//! need (`Arc<ChatHub>`, `Arc<dyn ChatStore>`, `GroupService`) instead of
//! the whole state.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::groups::GroupService;
use crate::backend::hub::ChatHub;
use crate::backend::store::ChatStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The connection hub
    pub hub: Arc<ChatHub>,
    /// Persistence collaborator
    pub store: Arc<dyn ChatStore>,
    /// Group administration service
    pub groups: GroupService,
}

impl AppState {
    pub fn new(hub: Arc<ChatHub>, store: Arc<dyn ChatStore>) -> Self {
        let groups = GroupService::new(store.clone(), hub.clone());
        Self { hub, store, groups }
    }
}

impl FromRef<AppState> for Arc<ChatHub> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.hub.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ChatStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for GroupService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.groups.clone()
    }
}
