use std::net::SocketAddr;

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use log::{error, info};

use crate::errors::IngestError;
use crate::models::location_report::LocationReport;
use crate::notify::{ALERT_SUBJECT, EmailMessage};
use crate::state::app_state::AppState;
use crate::structs::send_request::{MessageResponse, SendParams};

pub const SUCCESS_MESSAGE: &str = "Datos recibidos, log actualizado y correo enviado.";

/// Record a location report and email it to the configured recipients
pub async fn send_location(
    app_state: web::Data<AppState>,
    req: HttpRequest,
) -> HttpResponse {
    let source_ip = client_ip(&req, app_state.trust_proxy_headers);

    match ingest(&app_state, req.query_string(), source_ip).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            error!("Location report failed: {}", e);
            e.to_response(app_state.expose_error_details)
        }
    }
}

/// Persist first, then notify. A persistence failure stops the request
/// before any email is attempted.
async fn ingest(
    state: &AppState,
    query_string: &str,
    source_ip: Option<String>,
) -> Result<MessageResponse, IngestError> {
    let params = SendParams::from_query(query_string)?;
    let report = LocationReport::capture(params, source_ip, Utc::now())?;
    let block = report.render_html();

    let record_id = state.store.append(&report).await?;
    info!("Report recorded at {}", record_id);

    let message = EmailMessage::compose(&state.email, ALERT_SUBJECT, block)?;
    let message_id = state.notifier.send(&message).await?;
    info!("Alert email delivered with id {}", message_id);

    Ok(MessageResponse {
        message: SUCCESS_MESSAGE.to_string(),
    })
}

fn client_ip(req: &HttpRequest, trust_proxy_headers: bool) -> Option<String> {
    if !trust_proxy_headers {
        return req.peer_addr().map(|addr| addr.ip().to_string());
    }

    // Falls back to the peer address, which carries a port
    req.connection_info().realip_remote_addr().map(|addr| {
        addr.parse::<SocketAddr>()
            .map(|socket| socket.ip().to_string())
            .unwrap_or_else(|_| addr.to_string())
    })
}
