use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use donate_engine::{traits::StorefrontDbError, CouponRejection, OrderFlowError};
use easydonate_tools::EasyDonateApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("This product is not available for purchase")]
    ProductUnavailable(i64),
    #[error("{0}")]
    TierViolation(String),
    #[error("{0}")]
    CouponError(#[from] CouponRejection),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The payment provider could not be reached. Please try again later.")]
    GatewayError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::TierViolation(_) => StatusCode::BAD_REQUEST,
            Self::CouponError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ProductUnavailable(_) => StatusCode::NOT_FOUND,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::AuthenticationError(e) => match e {
                AuthError::InvalidWebhookSignature => StatusCode::BAD_REQUEST,
                AuthError::InvalidApiKey => StatusCode::FORBIDDEN,
                AuthError::ApiKeyNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::GatewayError(detail) = self {
            // The detailed provider error goes to the log; the client gets the generic message.
            log::error!("💳️ Payment provider failure: {detail}");
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Webhook signature is missing or invalid.")]
    InvalidWebhookSignature,
    #[error("Invalid or missing admin API key.")]
    InvalidApiKey,
    #[error("The admin API is not configured on this server.")]
    ApiKeyNotConfigured,
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::ProductNotAvailable(id) => Self::ProductUnavailable(id),
            OrderFlowError::CouponRejected(r) => Self::CouponError(r),
            OrderFlowError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            OrderFlowError::DatabaseError(e) => e.into(),
        }
    }
}

impl From<StorefrontDbError> for ServerError {
    fn from(e: StorefrontDbError) -> Self {
        match e {
            StorefrontDbError::ProductNotFound(id) => Self::NoRecordFound(format!("Product {id}")),
            StorefrontDbError::OrderNotFound(id) => Self::NoRecordFound(format!("Order {id}")),
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<EasyDonateApiError> for ServerError {
    fn from(e: EasyDonateApiError) -> Self {
        Self::GatewayError(e.to_string())
    }
}
