//! Request admission check for remote addresses.
//!
//! Thin predicate the request pipeline calls once per inbound request. The
//! filter specification comes from a provider closure so configuration can be
//! re-read per request (env var, config file, whatever the host uses).
//! Log output never influences the returned verdict.

use tracing::warn;

use crate::filter;

/// Checks whether a request's peer address is allowed by the configured filter.
pub struct RemoteAddrCheck<P>
where
    P: Fn() -> Option<String>,
{
    filter_provider: P,
}

impl<P> RemoteAddrCheck<P>
where
    P: Fn() -> Option<String>,
{
    pub fn new(filter_provider: P) -> Self {
        Self { filter_provider }
    }

    /// Decide whether a request from `remote_addr` is admitted.
    ///
    /// With no filter configured the gate is off and every request passes.
    /// A request without a remote address is denied.
    pub fn check(&self, remote_addr: Option<&str>) -> bool {
        let Some(spec) = (self.filter_provider)() else {
            return true;
        };

        let Some(remote_addr) = remote_addr else {
            warn!("no remote address found in request");
            return false;
        };

        // TODO: support X-Forwarded-For once the pipeline exposes trusted proxies

        let allowed = filter::matches(Some(remote_addr), Some(&spec));
        if !allowed {
            warn!(remote_addr, "remote address does not match IP filter");
        }
        allowed
    }
}
