use actix_web::{HttpResponse, post, web};
use alivemon::PortContext;
use serde::Deserialize;

use super::{AppState, ApiError};

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(receive_packet);
}

/// A punted frame, as hex, with the port it entered on
#[derive(Debug, Deserialize)]
pub struct ReceivedPacket {
    pub payload: String,
    #[serde(default)]
    pub table_id: u8,
    #[serde(default)]
    pub lport_tag: u32,
}

#[post("/packets")]
pub async fn receive_packet(
    state: web::Data<AppState>,
    body: web::Json<ReceivedPacket>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let frame = hex::decode(body.payload.trim()).map_err(|e| ApiError::BadRequest(format!("payload: {e}")))?;
    let context = PortContext { table_id: body.table_id, lport_tag: body.lport_tag };

    state.engine.dispatch_packet(frame, context);
    Ok(HttpResponse::Accepted().finish())
}
