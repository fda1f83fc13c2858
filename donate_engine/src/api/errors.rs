use thiserror::Error;

use crate::traits::StorefrontDbError;

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{0}")]
    DatabaseError(#[from] StorefrontDbError),
    #[error("Product {0} is not available for purchase")]
    ProductNotAvailable(i64),
    #[error("{0}")]
    CouponRejected(#[from] CouponRejection),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
}

/// Why a promo code was refused at checkout. The messages are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Promo code not found")]
    UnknownCode,
    #[error("Promo code has already been used")]
    AlreadyUsed,
    #[error("Promo code has expired")]
    Expired,
    #[error("Promo code is issued to a different e-mail address")]
    NotIssuedToYou,
}
