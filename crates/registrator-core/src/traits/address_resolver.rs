// # Address Resolver Trait
//
// Resolves the registrable address of the host this process runs on.
//
// ## Implementations
//
// - EC2 instance metadata: `registrator-addr-metadata` crate

use async_trait::async_trait;

/// Trait for host address lookups
///
/// Implementations must not cache: every call performs a fresh lookup so a
/// replaced host is picked up on the next event.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve this host's address (hostname or IP literal)
    async fn resolve(&self) -> Result<String, crate::Error>;

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}
