//! Configuration for the explorer engine
//!
//! One top-level struct composed of per-subsystem sections, each with
//! sensible defaults and a testing preset that removes all deferrals.

use std::time::Duration;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerConfig {
    pub api: ApiConfig,
    pub markers: MarkerConfig,
    pub geolocation: GeolocationConfig,
}

impl ExplorerConfig {
    /// Settings suited to tests: immediate marker rebuilds, no response
    /// cache, no geolocation wait.
    pub fn for_testing() -> Self {
        Self {
            api: ApiConfig {
                cache_capacity: 0,
                ..ApiConfig::default()
            },
            markers: MarkerConfig {
                rebuild_delay: Duration::ZERO,
                ..MarkerConfig::default()
            },
            geolocation: GeolocationConfig {
                timeout: Duration::from_millis(50),
                ..GeolocationConfig::default()
            },
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            markers: MarkerConfig::default(),
            geolocation: GeolocationConfig::default(),
        }
    }
}

/// HTTP API settings
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the places backend
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Response cache capacity; 0 disables caching
    pub cache_capacity: usize,
    /// How long a cached response stays fresh
    pub cache_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            request_timeout: Duration::from_secs(30),
            cache_capacity: 64,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Marker synchronization settings
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerConfig {
    /// Minimum marker count before clustering kicks in
    pub cluster_threshold: usize,
    /// Fit the viewport to the created markers after a rebuild
    pub fit_bounds: bool,
    /// Zoom cap applied when fitting bounds around a single marker
    pub single_marker_max_zoom: f64,
    /// Zoom used when focusing a clicked marker
    pub focus_zoom: f64,
    /// Center the map on a marker when it is clicked
    pub click_to_focus: bool,
    /// How long a scheduled rebuild waits before applying
    pub rebuild_delay: Duration,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 5,
            fit_bounds: true,
            single_marker_max_zoom: 15.0,
            focus_zoom: 15.0,
            click_to_focus: true,
            rebuild_delay: Duration::from_millis(150),
        }
    }
}

/// Single-shot geolocation settings
#[derive(Debug, Clone, PartialEq)]
pub struct GeolocationConfig {
    /// How long to wait for a position before giving up
    pub timeout: Duration,
    /// Disable to skip geolocation entirely
    pub enabled: bool,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExplorerConfig::default();
        assert_eq!(config.markers.cluster_threshold, 5);
        assert_eq!(config.markers.rebuild_delay, Duration::from_millis(150));
        assert_eq!(config.api.cache_capacity, 64);
        assert_eq!(config.geolocation.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_testing_preset_removes_deferrals() {
        let config = ExplorerConfig::for_testing();
        assert_eq!(config.markers.rebuild_delay, Duration::ZERO);
        assert_eq!(config.api.cache_capacity, 0);
    }
}
