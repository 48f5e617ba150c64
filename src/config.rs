//! Configuration for the search bridge.
//!
//! # Example
//!
//! ```
//! use search_bridge::BridgeConfig;
//!
//! // Minimal config (uses defaults)
//! let config = BridgeConfig::default();
//! assert_eq!(config.retry_max_attempts, 10);
//! assert_eq!(config.retry_max_wait_ms, 4_000);
//!
//! // Tuned config
//! let config = BridgeConfig {
//!     retry_max_attempts: 3,
//!     cloudsearch_max_payload_bytes: 1024 * 1024,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for indexing and search execution.
///
/// Credentials and endpoints belong to the client the caller supplies;
/// only behaviour of the bridge itself is configured here.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Total attempts for a throttled network call (default: 10)
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: usize,

    /// Base backoff delay, doubled per attempt
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Ceiling for a single backoff delay (default: 4s)
    #[serde(default = "default_retry_max_wait_ms")]
    pub retry_max_wait_ms: u64,

    /// Largest document batch CloudSearch accepts in one upload (default: 5 MB)
    #[serde(default = "default_cloudsearch_max_payload_bytes")]
    pub cloudsearch_max_payload_bytes: usize,

    /// Largest bulk body sent to Elasticsearch in one request (default: 10 MB)
    #[serde(default = "default_elasticsearch_max_payload_bytes")]
    pub elasticsearch_max_payload_bytes: usize,

    /// Scroll context lifetime requested with every scroll cursor
    #[serde(default = "default_scroll_keep_alive")]
    pub scroll_keep_alive: String,

    /// Joins multi-valued fields when decoding hits
    #[serde(default = "default_multi_value_separator")]
    pub multi_value_separator: String,
}

fn default_retry_max_attempts() -> usize { 10 }
fn default_retry_base_delay_ms() -> u64 { 50 }
fn default_retry_max_wait_ms() -> u64 { 4_000 }
fn default_cloudsearch_max_payload_bytes() -> usize { 5 * 1024 * 1024 } // 5 MB
fn default_elasticsearch_max_payload_bytes() -> usize { 10 * 1024 * 1024 } // 10 MB
fn default_scroll_keep_alive() -> String { "1m".to_string() }
fn default_multi_value_separator() -> String { "|".to_string() }

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_wait_ms: default_retry_max_wait_ms(),
            cloudsearch_max_payload_bytes: default_cloudsearch_max_payload_bytes(),
            elasticsearch_max_payload_bytes: default_elasticsearch_max_payload_bytes(),
            scroll_keep_alive: default_scroll_keep_alive(),
            multi_value_separator: default_multi_value_separator(),
        }
    }
}
