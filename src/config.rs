/**
 * Gateway Configuration
 *
 * This module loads and validates gateway configuration from
 * environment variables.
 *
 * # Configuration Sources
 *
 * Configuration is loaded from environment variables, with sensible
 * defaults for local development where a default is safe.
 *
 * # Error Handling
 *
 * A missing or short `REALTIME_BROADCAST_SECRET` is a fatal startup
 * error: the gateway must never sign broadcasts with an empty or weak
 * key. Everything else falls back to a development default with a
 * logged warning.
 */

use std::time::Duration;

use crate::error::RealtimeError;

/// Minimum accepted length for the broadcast signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Default interval between sweeper passes
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 30;

/// Default throttle window for session revalidation
const DEFAULT_REVALIDATION_WINDOW_SECS: u64 = 300;

/// Gateway configuration loaded at startup
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Shared secret for broadcast signing (min 32 chars, required)
    pub broadcast_secret: String,
    /// Secret for session token validation
    pub jwt_secret: String,
    /// Base URL of the permission service
    pub permission_service_url: String,
    /// Interval between sweeper passes
    pub cleanup_interval: Duration,
    /// Throttle window between session revalidations per connection
    pub revalidation_window: Duration,
    /// Port the gateway listens on
    pub port: u16,
}

impl RealtimeConfig {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `REALTIME_BROADCAST_SECRET` is
    /// absent or shorter than [`MIN_SECRET_LEN`] characters.
    pub fn from_env() -> Result<Self, RealtimeError> {
        let broadcast_secret = std::env::var("REALTIME_BROADCAST_SECRET").map_err(|_| {
            RealtimeError::config("REALTIME_BROADCAST_SECRET is not set; refusing to start")
        })?;
        if broadcast_secret.len() < MIN_SECRET_LEN {
            return Err(RealtimeError::config(format!(
                "REALTIME_BROADCAST_SECRET must be at least {MIN_SECRET_LEN} characters"
            )));
        }

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("[Config] JWT_SECRET not set, using development default");
            "pagespace-dev-secret-change-in-production".to_string()
        });

        let permission_service_url = std::env::var("PERMISSION_SERVICE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

        let cleanup_interval = Duration::from_secs(env_u64(
            "CLEANUP_INTERVAL_SECS",
            DEFAULT_CLEANUP_INTERVAL_SECS,
        ));
        let revalidation_window = Duration::from_secs(env_u64(
            "REVALIDATION_WINDOW_SECS",
            DEFAULT_REVALIDATION_WINDOW_SECS,
        ));

        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);

        tracing::info!(
            "[Config] Loaded: permission service at {}, sweep every {:?}, revalidation window {:?}",
            permission_service_url,
            cleanup_interval,
            revalidation_window
        );

        Ok(Self {
            broadcast_secret,
            jwt_secret,
            permission_service_url,
            cleanup_interval,
            revalidation_window,
            port,
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("[Config] {} is not a number, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}
