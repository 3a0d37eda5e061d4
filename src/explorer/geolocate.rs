//! Single-shot geolocation with a bounded wait
//!
//! Position lookups come from a pluggable provider (browser API,
//! OS service, or a fixed test location) and are always raced against
//! a timeout. Failure and timeout both degrade to "no reference
//! location"; nothing here is allowed to block a list load.

use crate::core::geo::LatLng;
use crate::runtime::async_utils::async_delay;
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Source of the device's current position
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn locate(&self) -> Result<LatLng>;
}

/// Provider that always reports the same position; used in tests and
/// by the demo app
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub LatLng);

#[async_trait]
impl GeolocationProvider for FixedLocation {
    async fn locate(&self) -> Result<LatLng> {
        if self.0.is_valid() {
            Ok(self.0)
        } else {
            Err(crate::Error::Geolocation(format!(
                "fixed location is invalid: {}, {}",
                self.0.lat, self.0.lng
            )))
        }
    }
}

/// Asks the provider for a position, giving up after `timeout`.
///
/// Denial, error, an invalid position, and timeout all collapse to
/// `None`; callers proceed without a reference location.
pub async fn locate_bounded(
    provider: &dyn GeolocationProvider,
    timeout: Duration,
) -> Option<LatLng> {
    let locate = provider.locate();
    let deadline = async_delay(timeout);
    futures::pin_mut!(locate);
    futures::pin_mut!(deadline);

    match futures::future::select(locate, deadline).await {
        futures::future::Either::Left((Ok(position), _)) if position.is_valid() => Some(position),
        futures::future::Either::Left((Ok(position), _)) => {
            log::warn!(
                "geolocation returned invalid position {}, {}",
                position.lat,
                position.lng
            );
            None
        }
        futures::future::Either::Left((Err(e), _)) => {
            log::warn!("geolocation failed: {e}");
            None
        }
        futures::future::Either::Right(((), _)) => {
            log::warn!("geolocation timed out after {timeout:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverLocates;

    #[async_trait]
    impl GeolocationProvider for NeverLocates {
        async fn locate(&self) -> Result<LatLng> {
            futures::future::pending().await
        }
    }

    struct Denied;

    #[async_trait]
    impl GeolocationProvider for Denied {
        async fn locate(&self) -> Result<LatLng> {
            Err(crate::Error::Geolocation("permission denied".to_string()))
        }
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_fixed_location_resolves() {
        let provider = FixedLocation(LatLng::new(44.47, -73.21));
        let position = locate_bounded(&provider, Duration::from_secs(1)).await;
        assert_eq!(position, Some(LatLng::new(44.47, -73.21)));
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_timeout_falls_back_to_none() {
        let position = locate_bounded(&NeverLocates, Duration::from_millis(20)).await;
        assert_eq!(position, None);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_denial_falls_back_to_none() {
        let position = locate_bounded(&Denied, Duration::from_secs(1)).await;
        assert_eq!(position, None);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_invalid_fixed_location_is_rejected() {
        let provider = FixedLocation(LatLng::new(99.0, 0.0));
        let position = locate_bounded(&provider, Duration::from_secs(1)).await;
        assert_eq!(position, None);
    }
}
