use thiserror::Error;

#[derive(Debug, Error)]
pub enum EasyDonateApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request to EasyDonate failed: {0}")]
    RequestError(String),
    #[error("EasyDonate returned status {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not deserialize EasyDonate response: {0}")]
    JsonError(String),
    #[error("EasyDonate rejected the call: {0}")]
    ApiFailure(String),
    #[error("EasyDonate response is missing required fields: {0}")]
    MalformedResponse(String),
    #[error("Invalid EasyDonate server id: {0}")]
    InvalidServerId(i64),
}
