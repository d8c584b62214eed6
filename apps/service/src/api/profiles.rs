use actix_web::{HttpResponse, delete, get, post, web};
use alivemon::{EtherTypes, MonitorError, MonitorProfile};
use serde::Deserialize;

use super::{AppState, ApiError, registered_response};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_profile).service(get_profile).service(delete_profile);
}

#[derive(Debug, Deserialize)]
pub struct CreateProfile {
    pub failure_threshold: u32,
    pub probe_interval_ms: u64,
    pub monitor_window: u32,
    pub protocol: EtherTypes,
}

#[post("/profiles")]
pub async fn create_profile(
    state: web::Data<AppState>,
    body: web::Json<CreateProfile>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let profile =
        MonitorProfile::new(body.failure_threshold, body.probe_interval_ms, body.monitor_window, body.protocol);
    let registered = state.engine.create_profile(profile).await?;
    Ok(registered_response(registered))
}

#[get("/profiles/{id}")]
pub async fn get_profile(state: web::Data<AppState>, path: web::Path<u32>) -> Result<HttpResponse, ApiError> {
    let profile_id = path.into_inner();
    let profile = state.engine.profile(profile_id).await?.ok_or(MonitorError::ProfileNotFound(profile_id))?;
    Ok(HttpResponse::Ok().json(profile))
}

#[delete("/profiles/{id}")]
pub async fn delete_profile(state: web::Data<AppState>, path: web::Path<u32>) -> Result<HttpResponse, ApiError> {
    state.engine.delete_profile(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
