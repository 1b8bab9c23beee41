// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each bounded context has its own subdirectory with value objects, entities,
// commands, events, errors and the coordinators that run its use cases.
//
// ============================================================================

pub mod ticketing;
