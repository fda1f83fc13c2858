mod api;
mod cache;
mod config;
mod error;

mod data_objects;

pub use api::{EasyDonateApi, PaymentGateway};
pub use cache::{CatalogCache, Clock, SystemClock};
pub use config::EasyDonateConfig;
pub use data_objects::{CreatePaymentRequest, PaymentSession, RemoteProduct, SurchargeQuote};
pub use error::EasyDonateApiError;
