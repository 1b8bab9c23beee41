// ============================================================================
// HTTP API - actix-web transport for the ticketing domain
// ============================================================================
//
// Success bodies are wrapped as {"data": ...}, failures as {"error": "..."}.
// Domain error kinds map to status codes in `errors.rs`.
//
// ============================================================================

mod dto;
mod errors;
mod handlers;

use actix_web::{error::InternalError, web, HttpResponse};

use crate::domain::ticketing::{
    CheckinCoordinator, ReservationCoordinator, TicketQueries, TicketTypeService, TicketingContext,
};

pub use dto::ErrorBody;

/// Everything the handlers need, shared across workers.
pub struct AppState {
    pub ticket_types: TicketTypeService,
    pub reservations: ReservationCoordinator,
    pub checkins: CheckinCoordinator,
    pub queries: TicketQueries,
}

impl AppState {
    pub fn new(ctx: TicketingContext, max_code_attempts: u32) -> Self {
        Self {
            queries: TicketQueries::new(ctx.database.clone()),
            ticket_types: TicketTypeService::new(ctx.clone()),
            reservations: ReservationCoordinator::new(ctx.clone(), max_code_attempts),
            checkins: CheckinCoordinator::new(ctx),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _req| bad_request(err.to_string(), err)),
    )
    .app_data(
        web::QueryConfig::default().error_handler(|err, _req| bad_request(err.to_string(), err)),
    )
    .app_data(
        web::PathConfig::default().error_handler(|err, _req| bad_request(err.to_string(), err)),
    )
    .route("/ping", web::get().to(handlers::ping))
    .route(
        "/events/{event_id}/ticket-types",
        web::post().to(handlers::create_ticket_type),
    )
    .route("/ticket-types/{id}", web::get().to(handlers::get_ticket_type))
    .route("/events/{event_id}/tickets", web::post().to(handlers::reserve_ticket))
    .route("/tickets/checkin", web::post().to(handlers::checkin))
    .route("/tickets/validate", web::post().to(handlers::validate))
    .route("/tickets", web::get().to(handlers::list_tickets));
}

fn bad_request<E>(message: String, cause: E) -> actix_web::Error
where
    E: std::fmt::Debug + std::fmt::Display + 'static,
{
    InternalError::from_response(cause, HttpResponse::BadRequest().json(ErrorBody { error: message }))
        .into()
}
