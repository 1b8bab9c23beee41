use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Ticketing Value Objects
// ============================================================================

/// Admission category of a ticket type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Standard,
    Vip,
    EarlyBird,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Standard => "standard",
            TicketKind::Vip => "vip",
            TicketKind::EarlyBird => "early_bird",
        }
    }
}

impl FromStr for TicketKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(TicketKind::Standard),
            "vip" => Ok(TicketKind::Vip),
            "early_bird" => Ok(TicketKind::EarlyBird),
            other => Err(format!("unknown ticket kind: {other}")),
        }
    }
}

/// Lifecycle state of an issued ticket.
///
/// `Active` is the only initial state. `Used`, `Cancelled` and `Expired` are
/// terminal: nothing leaves them and nothing returns to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Used,
    Cancelled,
    Expired,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Used => "used",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TicketStatus::Active)
    }

    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        !self.is_terminal() && next.is_terminal()
    }

    /// Validated transition, returning the new state.
    pub fn transition_to(self, next: TicketStatus) -> Result<TicketStatus, (TicketStatus, TicketStatus)> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err((self, next))
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TicketStatus::Active),
            "used" => Ok(TicketStatus::Used),
            "cancelled" => Ok(TicketStatus::Cancelled),
            "expired" => Ok(TicketStatus::Expired),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

/// Opaque redemption token printed on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketCode(String);

impl TicketCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
