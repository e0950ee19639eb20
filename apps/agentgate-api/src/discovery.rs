use crate::error::{ApiJson, ApiResult};
use crate::AppState;
use agentgate_discovery::{NetworkInfo, ScanRequest, ScanResult};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NetworkQuery {
    subnet_cidr: Option<String>,
}

pub(crate) async fn network(
    State(state): State<AppState>,
    Query(query): Query<NetworkQuery>,
) -> ApiResult<Json<NetworkInfo>> {
    let subnet = query.subnet_cidr.as_deref().filter(|raw| !raw.trim().is_empty());
    Ok(Json(state.gateway.network_info(subnet)?))
}

pub(crate) async fn scan(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ScanRequest>,
) -> ApiResult<Json<ScanResult>> {
    Ok(Json(state.gateway.scan(request).await?))
}
