//! Timeout configuration for engine client operations.
//!
//! Every remote call is bounded: an expired timeout surfaces as
//! [`LinkError::Timeout`](crate::LinkError::Timeout) rather than hanging the
//! session.

use std::time::Duration;

/// Per-operation timeout configuration for the engine client.
///
/// # Examples
///
/// ```rust
/// use querydeck_link::EngineTimeouts;
/// use std::time::Duration;
///
/// // Defaults (recommended)
/// let timeouts = EngineTimeouts::default();
///
/// // Longer submit window for heavyweight queries
/// let timeouts = EngineTimeouts::builder()
///     .submit_timeout(Duration::from_secs(120))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct EngineTimeouts {
    /// Timeout for establishing connections (TCP + TLS handshake).
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Timeout for the job-creation round trip.
    /// Default: 30 seconds
    pub submit_timeout: Duration,

    /// Timeout for one page fetch.
    /// Default: 30 seconds
    pub fetch_timeout: Duration,

    /// Timeout for a metadata fetch.
    /// Default: 10 seconds
    pub metadata_timeout: Duration,

    /// Timeout for a cancellation request.
    /// Default: 10 seconds
    pub cancel_timeout: Duration,
}

impl Default for EngineTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            metadata_timeout: Duration::from_secs(10),
            cancel_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> EngineTimeoutsBuilder {
        EngineTimeoutsBuilder::new()
    }

    /// Timeouts suited to a local emulator or test server.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            submit_timeout: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
            metadata_timeout: Duration::from_secs(2),
            cancel_timeout: Duration::from_secs(2),
        }
    }

    /// Timeouts suited to high-latency links or very large scans.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            submit_timeout: Duration::from_secs(120),
            fetch_timeout: Duration::from_secs(120),
            metadata_timeout: Duration::from_secs(30),
            cancel_timeout: Duration::from_secs(30),
        }
    }
}

/// Builder for [`EngineTimeouts`].
pub struct EngineTimeoutsBuilder {
    timeouts: EngineTimeouts,
}

impl EngineTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: EngineTimeouts::default(),
        }
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    pub fn submit_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.submit_timeout = timeout;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.fetch_timeout = timeout;
        self
    }

    pub fn metadata_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.metadata_timeout = timeout;
        self
    }

    pub fn cancel_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.cancel_timeout = timeout;
        self
    }

    pub fn build(self) -> EngineTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = EngineTimeouts::default();
        assert_eq!(timeouts.submit_timeout, Duration::from_secs(30));
        assert_eq!(timeouts.metadata_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_overrides() {
        let timeouts = EngineTimeouts::builder()
            .submit_timeout(Duration::from_secs(120))
            .fetch_timeout(Duration::from_secs(45))
            .build();
        assert_eq!(timeouts.submit_timeout, Duration::from_secs(120));
        assert_eq!(timeouts.fetch_timeout, Duration::from_secs(45));
        // untouched fields keep defaults
        assert_eq!(timeouts.cancel_timeout, Duration::from_secs(10));
    }
}
