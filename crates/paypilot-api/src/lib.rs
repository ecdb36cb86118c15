//! PayPilot API crate - webhook server and HTTP gateway transport.
//!
//! Inbound messages arrive on `POST /inbound` from the messaging gateway and
//! run through the conversation engine. Outbound messages leave through
//! [`HttpGateway`], which posts them back to the gateway.

pub mod auth;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use gateway::HttpGateway;
pub use routes::{create_router, start_server};
pub use state::AppState;
