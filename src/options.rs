use std::time::Duration;

/// Default bound on the non-blocking connect wait.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Socket options applied to an [`Endpoint`](crate::Endpoint) in one call.
///
/// Unset fields leave the OS default in place.
///
/// ```
/// use std::time::Duration;
/// use xsocket::EndpointOptions;
///
/// let opts = EndpointOptions::default()
///     .with_no_delay(true)
///     .with_receive_timeout(Duration::from_millis(250));
/// assert_eq!(opts.no_delay, Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointOptions {
    /// Disable send coalescing (`TCP_NODELAY`). Tcp only.
    pub no_delay: Option<bool>,
    /// Address reuse (`SO_REUSEADDR`).
    pub reuse_address: Option<bool>,
    /// Bound on blocking receives. `None` blocks until data arrives.
    pub receive_timeout: Option<Duration>,
    /// Bound on the connect wait used by [`Endpoint::connect_with`](crate::Endpoint::connect_with).
    pub connect_timeout: Duration,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            no_delay: None,
            reuse_address: None,
            receive_timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl EndpointOptions {
    /// Same as `default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `no_delay`.
    pub fn with_no_delay(mut self, enable: bool) -> Self {
        self.no_delay = Some(enable);
        self
    }

    /// Sets `reuse_address`.
    pub fn with_reuse_address(mut self, enable: bool) -> Self {
        self.reuse_address = Some(enable);
        self
    }

    /// Sets `receive_timeout`.
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    /// Sets `connect_timeout`.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_os_settings_alone() {
        let opts = EndpointOptions::default();
        assert_eq!(opts.no_delay, None);
        assert_eq!(opts.reuse_address, None);
        assert_eq!(opts.receive_timeout, None);
        assert_eq!(opts.connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn builder_sets_fields() {
        let opts = EndpointOptions::new()
            .with_no_delay(true)
            .with_reuse_address(false)
            .with_receive_timeout(Duration::from_millis(20))
            .with_connect_timeout(Duration::ZERO);
        assert_eq!(opts.no_delay, Some(true));
        assert_eq!(opts.reuse_address, Some(false));
        assert_eq!(opts.receive_timeout, Some(Duration::from_millis(20)));
        assert_eq!(opts.connect_timeout, Duration::ZERO);
    }
}
