//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID set / propagated)
//!     → auth::middleware (signed routes only)
//!     → handler → PipelineController
//!     → response.rs (Fetched / PipelineError → status + JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use server::{shutdown_on_ctrl_c, AppState, PipelineServer};
