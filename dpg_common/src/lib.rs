mod rubles;
mod secret;

pub use rubles::{Rubles, RublesConversionError, RUB_CURRENCY_CODE};
pub use secret::Secret;
