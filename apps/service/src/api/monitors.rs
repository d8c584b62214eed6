use actix_web::{HttpResponse, delete, get, post, web};
use alivemon::{EndpointType, MonitorError, MonitoringMode};
use serde::Deserialize;
use serde_json::json;

use super::{AppState, ApiError, registered_response};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(start_monitor)
        .service(get_monitor)
        .service(stop_monitor)
        .service(pause_monitor)
        .service(unpause_monitor);
}

#[derive(Debug, Deserialize)]
pub struct StartMonitor {
    pub profile_id: u32,
    pub source: EndpointType,
    pub destination: Option<EndpointType>,
    #[serde(default)]
    pub mode: MonitoringMode,
}

#[post("/monitors")]
pub async fn start_monitor(
    state: web::Data<AppState>,
    body: web::Json<StartMonitor>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let registered = state
        .engine
        .start_monitor(body.profile_id, body.source, body.destination, body.mode)
        .await?;
    Ok(registered_response(registered))
}

#[get("/monitors/{id}")]
pub async fn get_monitor(state: web::Data<AppState>, path: web::Path<u32>) -> Result<HttpResponse, ApiError> {
    let monitor_id = path.into_inner();
    let info = state.engine.monitoring_info(monitor_id).await?.ok_or(MonitorError::MonitorNotFound(monitor_id))?;
    let monitoring_state = state.engine.monitoring_state(monitor_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "info": info,
        "state": monitoring_state,
        "scheduled": state.engine.is_scheduled(monitor_id),
    })))
}

#[delete("/monitors/{id}")]
pub async fn stop_monitor(state: web::Data<AppState>, path: web::Path<u32>) -> Result<HttpResponse, ApiError> {
    state.engine.stop_monitor(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/monitors/{id}/pause")]
pub async fn pause_monitor(state: web::Data<AppState>, path: web::Path<u32>) -> Result<HttpResponse, ApiError> {
    state.engine.pause_monitor(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/monitors/{id}/unpause")]
pub async fn unpause_monitor(state: web::Data<AppState>, path: web::Path<u32>) -> Result<HttpResponse, ApiError> {
    state.engine.unpause_monitor(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
