use actix_web::{HttpResponse, Responder, get, web};
use serde_json::json;

use super::AppState;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_route);
}

/// Health check route
#[get("/health")]
pub async fn health_route(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "protocols": state.engine.protocols().protocols().map(|p| p.to_string()).collect::<Vec<_>>(),
        "packets_sent": state.sink.sent(),
    }))
}
