use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AccountToken, OrganizationId, UserId};
use super::service::EmployeeSyncService;

/// Body of a sync trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    pub account_token: AccountToken,
    pub actor_user_id: UserId,
}

/// Tracks organizations with a sync in flight so runs never overlap per tenant.
#[derive(Debug, Clone, Default)]
pub struct SyncRunGuard {
    active: Arc<Mutex<HashSet<OrganizationId>>>,
}

impl SyncRunGuard {
    /// `None` when the organization already has a run in progress.
    pub fn try_acquire(&self, organization_id: &OrganizationId) -> Option<RunPermit> {
        let mut active = self.active.lock().expect("run guard mutex poisoned");
        if !active.insert(organization_id.clone()) {
            return None;
        }
        Some(RunPermit {
            active: self.active.clone(),
            organization_id: organization_id.clone(),
        })
    }

    pub fn is_running(&self, organization_id: &OrganizationId) -> bool {
        self.active
            .lock()
            .expect("run guard mutex poisoned")
            .contains(organization_id)
    }
}

/// Releases the organization when dropped.
#[derive(Debug)]
pub struct RunPermit {
    active: Arc<Mutex<HashSet<OrganizationId>>>,
    organization_id: OrganizationId,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.organization_id);
        }
    }
}

#[derive(Clone)]
pub struct SyncRouterState {
    pub service: Arc<EmployeeSyncService>,
    pub runs: SyncRunGuard,
}

/// Router builder exposing the sync trigger.
pub fn sync_router(service: Arc<EmployeeSyncService>) -> Router {
    Router::new()
        .route(
            "/api/v1/organizations/:organization_id/employee-sync",
            post(sync_handler),
        )
        .with_state(SyncRouterState {
            service,
            runs: SyncRunGuard::default(),
        })
}

pub(crate) async fn sync_handler(
    State(state): State<SyncRouterState>,
    Path(organization_id): Path<String>,
    axum::Json(request): axum::Json<SyncRequest>,
) -> Response {
    let organization_id = OrganizationId(organization_id);
    let Some(permit) = state.runs.try_acquire(&organization_id) else {
        let payload = json!({
            "error": "employee sync already running for organization",
            "organization_id": organization_id,
        });
        return (StatusCode::CONFLICT, axum::Json(payload)).into_response();
    };

    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        service.sync_employees(
            &request.account_token,
            &organization_id,
            &request.actor_user_id,
        )
    })
    .await;

    match outcome {
        Ok(Ok(result)) => (StatusCode::OK, axum::Json(result)).into_response(),
        Ok(Err(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        Err(join_error) => {
            tracing::error!(error = %join_error, "employee sync task aborted");
            let payload = json!({
                "error": "employee sync aborted",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
