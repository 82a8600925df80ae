//! Unified error codes
//!
//! Error codes are organized by category:
//! - 4xxx: Order errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been delivered, cancelled or voided
    OrderAlreadyFinalized = 4003,
    /// Requested status is not reachable from the current one
    InvalidTransition = 4008,
    /// Order write rejected or failed in the backing store
    OrderWriteFailed = 4010,

    // ==================== 7xxx: Table ====================
    /// Table release failed
    TableReleaseFailed = 7005,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Change feed out of sync, full refetch performed
    SubscriptionGap = 9302,
    /// Board engine has been shut down
    BoardClosed = 9303,
}

impl ErrorCode {
    /// Every defined code, in numeric order
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::OrderNotFound,
        ErrorCode::OrderAlreadyFinalized,
        ErrorCode::InvalidTransition,
        ErrorCode::OrderWriteFailed,
        ErrorCode::TableReleaseFailed,
        ErrorCode::DatabaseError,
        ErrorCode::NetworkError,
        ErrorCode::SubscriptionGap,
        ErrorCode::BoardClosed,
    ];

    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyFinalized => "Order has already been finalized",
            ErrorCode::InvalidTransition => "Status transition not allowed",
            ErrorCode::OrderWriteFailed => "Order could not be saved",

            // Table
            ErrorCode::TableReleaseFailed => "Table could not be released",

            // System
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::SubscriptionGap => "Live updates were out of sync",
            ErrorCode::BoardClosed => "Order board is closed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}
