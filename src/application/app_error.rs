use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Too many requests. Please slow down.")]
    RateLimited,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Declared amount {declared} does not match the price {expected}")]
    PriceMismatch { declared: i64, expected: i64 },

    #[error("Event is at capacity ({capacity} seats)")]
    CapacityFull { capacity: i32 },

    #[error("Event has no price configured and cannot be purchased")]
    NotPurchasable,

    #[error("Moderators and owners cannot be removed from their event")]
    ProtectedMember,

    #[error("User already holds a seat for this event")]
    AlreadyAdmitted,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether an upstream caller retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Internal(_) | AppError::Gateway(_)
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    RateLimited,
    InvalidCredentials,
    Forbidden,
    InvalidInput,
    NotFound,
    Conflict,
    PriceMismatch,
    CapacityFull,
    NotPurchasable,
    ProtectedMember,
    AlreadyAdmitted,
    GatewayError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::PriceMismatch => "PRICE_MISMATCH",
            ErrorCode::CapacityFull => "CAPACITY_FULL",
            ErrorCode::NotPurchasable => "NOT_PURCHASABLE",
            ErrorCode::ProtectedMember => "PROTECTED_MEMBER",
            ErrorCode::AlreadyAdmitted => "ALREADY_ADMITTED",
            ErrorCode::GatewayError => "GATEWAY_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
