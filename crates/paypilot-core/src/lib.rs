pub mod config;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod traits;
pub mod types;

pub use config::PayPilotConfig;
pub use error::{PayPilotError, Result};
pub use lifecycle::validate_transition;
pub use money::{format_amount, normalize_amount, to_minor_units, MAX_AMOUNT};
pub use traits::{IntentClassifier, InvoiceStore, Renderer, Transcriber, Transport};
pub use types::*;
