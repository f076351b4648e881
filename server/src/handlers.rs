use actix_web::{error, web, HttpResponse, Responder};
use serde_json::json;
use tokio::sync::oneshot;

use crate::connection::{ws_index, RelayCommand};
use crate::relay::RelayTx;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(ws_index)));
    cfg.service(web::resource("/health").route(web::get().to(health)));
}

/// Diagnostic only; not part of the sync protocol.
async fn health(relay_tx: web::Data<RelayTx>) -> Result<impl Responder, actix_web::Error> {
    let (reply_tx, reply_rx) = oneshot::channel();
    relay_tx
        .send(RelayCommand::Stats { reply: reply_tx })
        .map_err(error::ErrorInternalServerError)?;
    let stats = reply_rx.await.map_err(error::ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "roomCount": stats.room_count,
        "connectionCount": stats.connection_count,
    })))
}
