use serde::{Deserialize, Serialize};

/// Lifecycle of a single checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_intent_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[derive(Default)]
pub enum PaymentIntentStatus {
    #[default]
    RequiresPayment,
    Succeeded,
    Failed,
}

impl PaymentIntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentIntentStatus::RequiresPayment => "REQUIRES_PAYMENT",
            PaymentIntentStatus::Succeeded => "SUCCEEDED",
            PaymentIntentStatus::Failed => "FAILED",
        }
    }

    /// Terminal states are never overwritten by later callbacks.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentIntentStatus::Succeeded | PaymentIntentStatus::Failed
        )
    }

    /// Transitions are monotone: only REQUIRES_PAYMENT may move, and only
    /// into a terminal state.
    pub fn can_transition_to(&self, next: PaymentIntentStatus) -> bool {
        matches!(self, PaymentIntentStatus::RequiresPayment) && next.is_terminal()
    }
}

impl std::fmt::Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a paid intent ended up holding a seat.
///
/// `OverCapacity` marks a confirmed payment that arrived after the event
/// filled up; it waits for an administrator to seat the buyer manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "seat_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum SeatStatus {
    #[default]
    Unassigned,
    Seated,
    OverCapacity,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Unassigned => "unassigned",
            SeatStatus::Seated => "seated",
            SeatStatus::OverCapacity => "over_capacity",
        }
    }

    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, SeatStatus::OverCapacity)
    }
}

impl std::fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome reported by the gateway in its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOutcome {
    Success,
    Failure,
}

impl GatewayOutcome {
    /// The gateway reports exactly `"success"` for a captured payment; every
    /// other value is a failure.
    pub fn from_callback_status(status: &str) -> Self {
        if status == "success" {
            GatewayOutcome::Success
        } else {
            GatewayOutcome::Failure
        }
    }

    pub fn target_status(&self) -> PaymentIntentStatus {
        match self {
            GatewayOutcome::Success => PaymentIntentStatus::Succeeded,
            GatewayOutcome::Failure => PaymentIntentStatus::Failed,
        }
    }
}
