//! HTTP API layer.
//!
//! Two endpoints: a read-only status endpoint and the relay endpoint that
//! hands JSON messages to the broker.

mod handlers;
mod router;
mod types;

pub use handlers::{relay, status, AppState};
pub use router::{create_router, serve, ServerConfig};
pub use types::{ErrorResponse, StatusResponse};
