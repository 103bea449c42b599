//! Server Setup
//!
//! This module contains application state and server initialization.
//!
//! - **`state`** - the `AppState` container shared by all handlers
//! - **`init`** - wiring: registry, signer, services, sweeper, router

/// Server initialization
pub mod init;

/// Application state
pub mod state;

pub use init::create_app;
pub use state::AppState;
