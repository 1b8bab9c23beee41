use actix_web::{web, HttpResponse};

use super::dto::{CodeRequest, DataBody, ExistsBody, ReserveTicketRequest};
use super::AppState;
use crate::domain::ticketing::{CreateTicketType, ReserveTicket, TicketError, TicketListFilter};

pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "success" }))
}

pub async fn create_ticket_type(
    state: web::Data<AppState>,
    event_id: web::Path<i64>,
    body: web::Json<CreateTicketType>,
) -> Result<HttpResponse, TicketError> {
    let ticket_type = state
        .ticket_types
        .create(event_id.into_inner(), body.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(DataBody { data: ticket_type }))
}

pub async fn get_ticket_type(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, TicketError> {
    let ticket_type = state.ticket_types.get(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataBody { data: ticket_type }))
}

pub async fn reserve_ticket(
    state: web::Data<AppState>,
    event_id: web::Path<i64>,
    body: web::Json<ReserveTicketRequest>,
) -> Result<HttpResponse, TicketError> {
    let body = body.into_inner();
    let ticket = state
        .reservations
        .reserve(ReserveTicket {
            event_id: event_id.into_inner(),
            ticket_type_id: body.ticket_type_id,
            user_id: body.user_id,
        })
        .await?;

    Ok(HttpResponse::Created().json(DataBody { data: ticket }))
}

pub async fn checkin(
    state: web::Data<AppState>,
    body: web::Json<CodeRequest>,
) -> Result<HttpResponse, TicketError> {
    let ticket = state.checkins.checkin(&body.code).await?;
    Ok(HttpResponse::Ok().json(DataBody { data: ticket }))
}

pub async fn validate(
    state: web::Data<AppState>,
    body: web::Json<CodeRequest>,
) -> Result<HttpResponse, TicketError> {
    let exists = state.checkins.is_exist(&body.code).await?;
    Ok(HttpResponse::Ok().json(DataBody {
        data: ExistsBody { exists },
    }))
}

pub async fn list_tickets(
    state: web::Data<AppState>,
    filter: web::Query<TicketListFilter>,
) -> Result<HttpResponse, TicketError> {
    let tickets = state.queries.list(&filter).await?;
    Ok(HttpResponse::Ok().json(DataBody { data: tickets }))
}
