//! Unified error types for the storefront.
//!
//! [`Error`] covers every fallible operation in the crate. Checkout has its own
//! taxonomy in [`CheckoutError`] because callers react to each outcome differently:
//! business aborts are shown verbatim, conflicts may be retried, and a partial
//! success must be reconciled by an operator.

use sea_orm::DbErr;
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The document store rejected or failed an operation.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Configuration could not be read or holds an invalid value.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// Malformed user input, rejected before reaching the store.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong
        message: String,
    },

    /// No plan exists with the given id.
    #[error("Plan not found: {id}")]
    PlanNotFound {
        /// The missing plan id
        id: i64,
    },

    /// No order exists with the given id.
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// The missing order id
        id: String,
    },

    /// No user profile exists with the given id.
    #[error("User not found: {id}")]
    UserNotFound {
        /// The missing user id
        id: String,
    },

    /// The requested order status change is not allowed.
    #[error("Order {id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        /// Order id
        id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// A stored record failed to decode into its typed form.
    #[error("Malformed {collection} record {id}: {reason}")]
    MalformedRecord {
        /// Collection the record belongs to
        collection: &'static str,
        /// Record id
        id: String,
        /// Which field was wrong
        reason: String,
    },

    /// The user account is deactivated.
    #[error("Account disabled: {user_id}")]
    AccountDisabled {
        /// Affected user
        user_id: String,
    },

    /// The user lacks the admin role.
    #[error("User {user_id} is not an admin")]
    NotAdmin {
        /// Affected user
        user_id: String,
    },

    /// Object storage failure.
    #[error("Blob storage error: {message}")]
    Blob {
        /// What went wrong
        message: String,
    },

    /// I/O failure outside the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background checkout task was cancelled before it reported back.
    #[error("Checkout task did not finish: {message}")]
    CheckoutTask {
        /// Why the task stopped
        message: String,
    },

    /// Checkout failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

/// Outcome of a failed checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request itself was unusable (blank user id, empty or duplicate items).
    #[error("Invalid checkout request: {message}")]
    Validation {
        /// What was wrong
        message: String,
    },

    /// A plan in the cart is no longer on sale.
    #[error("Plan {plan_id} is not on sale")]
    NotOnSale {
        /// Offending plan
        plan_id: i64,
    },

    /// A plan in the cart has no stock left.
    #[error("Plan {plan_id} is out of stock")]
    OutOfStock {
        /// Offending plan
        plan_id: i64,
    },

    /// Concurrent writers kept winning; the bounded retry ran out.
    #[error("Checkout conflicted with concurrent updates after {attempts} attempts")]
    TransactionConflict {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// The store failed for a reason other than contention.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] DbErr),

    /// The order was committed but the cart could not be cleared afterwards.
    #[error("Order {order_id} was placed but the cart could not be cleared: {reason}")]
    PartialSuccessCartNotCleared {
        /// The committed order
        order_id: String,
        /// Why the cart clear failed
        reason: String,
    },
}

impl CheckoutError {
    /// Whether the same request may be re-submitted without user involvement.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict { .. } | Self::StoreUnavailable(_))
    }

    /// The order id, when an order was committed despite the error.
    #[must_use]
    pub fn committed_order_id(&self) -> Option<&str> {
        match self {
            Self::PartialSuccessCartNotCleared { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_checkout_errors_are_retryable() {
        assert!(CheckoutError::TransactionConflict { attempts: 3 }.is_retryable());
        assert!(CheckoutError::StoreUnavailable(DbErr::Custom("down".to_string())).is_retryable());
        assert!(!CheckoutError::OutOfStock { plan_id: 1 }.is_retryable());
        assert!(!CheckoutError::NotOnSale { plan_id: 1 }.is_retryable());
        assert!(
            !CheckoutError::PartialSuccessCartNotCleared {
                order_id: "o".to_string(),
                reason: "r".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_partial_success_exposes_order_id() {
        let err = CheckoutError::PartialSuccessCartNotCleared {
            order_id: "order-1".to_string(),
            reason: "store down".to_string(),
        };
        assert_eq!(err.committed_order_id(), Some("order-1"));
        assert_eq!(CheckoutError::OutOfStock { plan_id: 2 }.committed_order_id(), None);
    }
}
