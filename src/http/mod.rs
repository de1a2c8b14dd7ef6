//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → lookup.rs / lists.rs / status.rs / health.rs / assets.rs
//!     → protocol (negotiate + encode)
//!     → error.rs (any failure → plain-text status)
//! ```

pub mod assets;
pub mod error;
pub mod health;
pub mod lists;
pub mod lookup;
pub mod server;
pub mod status;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};
