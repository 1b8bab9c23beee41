use uuid::Uuid;

use super::value_objects::TicketCode;

/// Produces fresh redemption codes.
///
/// Uniqueness is finally enforced by the store; a generator only has to make
/// collisions unlikely.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> TicketCode;
}

/// Random (v4) UUIDs in their hyphenated form.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodeGenerator;

impl CodeGenerator for UuidCodeGenerator {
    fn generate(&self) -> TicketCode {
        TicketCode::new(Uuid::new_v4().to_string())
    }
}
