use axum::{extract::State, response::IntoResponse, Json};

use crate::{blockchain::models::ExecutionMode, AppState};

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mode = match state.context.mode {
        ExecutionMode::Autonomous => "autonomous",
        ExecutionMode::ReturnBytes => "return_bytes",
    };
    Json(serde_json::json!({
        "status": "ok",
        "network": state.client.network().as_str(),
        "executionMode": mode,
        "operatorConfigured": state.client.operator().is_some(),
    }))
}
