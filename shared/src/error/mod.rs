//! Unified error codes for the order board
//!
//! - [`ErrorCode`]: numeric codes carried by notices and errors
//! - [`ErrorCategory`]: classification derived from the code range
//!
//! # Error Code Ranges
//!
//! - 4xxx: Order errors
//! - 7xxx: Table errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{ErrorCategory, ErrorCode};
//!
//! let code = ErrorCode::InvalidTransition;
//! assert_eq!(code.code(), 4008);
//! assert_eq!(code.category(), ErrorCategory::Order);
//! ```

mod category;
mod codes;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
