//! HTTP control API over the monitoring engine

mod error;
mod health;
mod interfaces;
mod monitors;
mod packets;
mod profiles;

pub use error::ApiError;

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use alivemon::{AlivenessMonitor, Registered};
use serde_json::json;

use crate::sink::LoggingSink;

/// Shared handler state
pub struct AppState {
    pub engine: Arc<AlivenessMonitor>,
    pub sink: Arc<LoggingSink>,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::routes)
        .configure(profiles::routes)
        .configure(monitors::routes)
        .configure(interfaces::routes)
        .configure(packets::routes);
}

/// 201 for a new record, 200 when an identical one already existed
fn registered_response(registered: Registered) -> HttpResponse {
    let body = json!({ "id": registered.id(), "existing": registered.is_existing() });
    if registered.is_existing() {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::Created().json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};
    use alivemon::{EngineConfig, ProtocolRegistry, StaticInventory};
    use serde_json::Value;

    fn state() -> web::Data<AppState> {
        let sink = Arc::new(LoggingSink::default());
        let config = EngineConfig::default();
        let protocols = ProtocolRegistry::standard(&config, Arc::new(StaticInventory::new()), sink.clone());
        let engine = AlivenessMonitor::builder().config(config).protocols(protocols).build().unwrap();
        web::Data::new(AppState { engine, sink })
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;
        let response = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_monitor_lifecycle() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let profile = json!({ "failure_threshold": 3, "probe_interval_ms": 1000, "monitor_window": 5, "protocol": "lldp" });
        let request = test::TestRequest::post().uri("/profiles").set_json(&profile).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(response).await;
        let profile_id = body["id"].as_u64().unwrap();

        let request = test::TestRequest::post().uri("/profiles").set_json(&profile).to_request();
        let body: Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["existing"], true);

        let monitor = json!({ "profile_id": profile_id, "source": { "type": "interface", "name": "tap0", "ip": null } });
        let request = test::TestRequest::post().uri("/monitors").set_json(&monitor).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(response).await;
        let monitor_id = body["id"].as_u64().unwrap();

        let request = test::TestRequest::get().uri(&format!("/monitors/{monitor_id}")).to_request();
        let body: Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(body["state"]["status"], "started");
        assert_eq!(body["state"]["monitor_key"], "tap0.LLDP");

        let pause = format!("/monitors/{monitor_id}/pause");
        let response = test::call_service(&app, test::TestRequest::post().uri(&pause).to_request()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = test::call_service(&app, test::TestRequest::post().uri(&pause).to_request()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let stop = format!("/monitors/{monitor_id}");
        let response = test::call_service(&app, test::TestRequest::delete().uri(&stop).to_request()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = test::call_service(&app, test::TestRequest::delete().uri(&stop).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_unknown_profile_and_invalid_profile() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let monitor = json!({ "profile_id": 1, "source": { "type": "ip_address", "ip": "10.0.0.1" } });
        let request = test::TestRequest::post().uri("/monitors").set_json(&monitor).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let profile = json!({ "failure_threshold": 9, "probe_interval_ms": 1000, "monitor_window": 5, "protocol": "arp" });
        let request = test::TestRequest::post().uri("/profiles").set_json(&profile).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_packet_payload_must_be_hex() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let request = test::TestRequest::post()
            .uri("/packets")
            .set_json(json!({ "payload": "not hex", "table_id": 81 }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = test::TestRequest::post()
            .uri("/packets")
            .set_json(json!({ "payload": "ffffffffffff" }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
