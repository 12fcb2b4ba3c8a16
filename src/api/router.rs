use axum::{
    body::Body,
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, template, slot, booking, pipeline};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Workshop templates
        .route("/api/v1/templates", post(template::create_template).get(template::list_templates))
        .route("/api/v1/templates/{id}", get(template::get_template).put(template::update_template).delete(template::delete_template))
        .route("/api/v1/templates/{id}/slots", get(template::list_template_slots).put(template::override_slot))

        // Schedule
        .route("/api/v1/slots", get(slot::list_slots))
        .route("/api/v1/slots/{id}/bookings", get(slot::list_slot_bookings))
        .route("/api/v1/slots/{id}/occupancy", get(slot::slot_occupancy))

        // Public booking
        .route("/api/v1/workshops/{slug}/book", post(booking::book_workshop))

        // Staff booking management
        .route("/api/v1/bookings", post(booking::create_booking).get(booking::list_bookings))
        .route("/api/v1/bookings/{id}", get(booking::get_booking))
        .route("/api/v1/bookings/{id}/transitions", post(booking::transition_booking))

        // CRM
        .route("/api/v1/pipeline/sync", post(pipeline::sync_pipeline))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
