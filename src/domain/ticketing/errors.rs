use super::value_objects::TicketStatus;
use crate::gateway::GatewayError;
use crate::store::StoreError;

// ============================================================================
// Ticketing Errors
// ============================================================================

/// Caller-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced event, ticket type or ticket does not exist
    NotFound,
    /// Business rule rejected the request; retrying will not help
    Conflict,
    /// Malformed request
    Validation,
    /// Infrastructure failure; nothing was changed
    Transient,
}

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("event {0} not found")]
    EventNotFound(i64),

    #[error("ticket type {0} not found")]
    TicketTypeNotFound(i64),

    #[error("ticket not found or not active")]
    TicketNotFoundOrNotActive,

    #[error("event {0} is not published")]
    EventNotPublished(i64),

    #[error("ticket sales have not started")]
    EventNotStarted,

    #[error("ticket sales have ended")]
    EventEnded,

    #[error("tickets are sold out")]
    TicketSoldOut,

    #[error("ticket cannot move from {from} to {to}")]
    InvalidStatusTransition { from: TicketStatus, to: TicketStatus },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("could not allocate a unique ticket code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(GatewayError),
}

impl TicketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TicketError::EventNotFound(_)
            | TicketError::TicketTypeNotFound(_)
            | TicketError::TicketNotFoundOrNotActive => ErrorKind::NotFound,

            TicketError::EventNotPublished(_)
            | TicketError::EventNotStarted
            | TicketError::EventEnded
            | TicketError::TicketSoldOut
            | TicketError::InvalidStatusTransition { .. } => ErrorKind::Conflict,

            TicketError::InvalidRequest(_) => ErrorKind::Validation,

            TicketError::CodeGenerationExhausted { .. }
            | TicketError::Store(_)
            | TicketError::Gateway(_) => ErrorKind::Transient,
        }
    }

    /// Label used for the `reservation_rejections_total{reason}` metric.
    pub fn reason(&self) -> &'static str {
        match self {
            TicketError::EventNotFound(_) => "event_not_found",
            TicketError::TicketTypeNotFound(_) => "ticket_type_not_found",
            TicketError::TicketNotFoundOrNotActive => "ticket_not_found_or_not_active",
            TicketError::EventNotPublished(_) => "event_not_published",
            TicketError::EventNotStarted => "event_not_started",
            TicketError::EventEnded => "event_ended",
            TicketError::TicketSoldOut => "sold_out",
            TicketError::InvalidStatusTransition { .. } => "invalid_transition",
            TicketError::InvalidRequest(_) => "invalid_request",
            TicketError::CodeGenerationExhausted { .. } => "code_exhausted",
            TicketError::Store(StoreError::LockTimeout) => "lock_timeout",
            TicketError::Store(_) => "store_error",
            TicketError::Gateway(_) => "gateway_error",
        }
    }
}

impl From<GatewayError> for TicketError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound { event_id, .. } => TicketError::EventNotFound(event_id),
            other => TicketError::Gateway(other),
        }
    }
}
