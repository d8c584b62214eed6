use actix_web::{HttpResponse, post, web};

use super::{AppState, ApiError};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(interface_up).service(interface_down);
}

#[post("/interfaces/{name}/up")]
pub async fn interface_up(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    state.engine.interface_up(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/interfaces/{name}/down")]
pub async fn interface_down(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    state.engine.interface_down(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
