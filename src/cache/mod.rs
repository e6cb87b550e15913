//! Caching subsystem.
//!
//! Two independent caches:
//!
//! - [`ResultCache`]: bounded LRU + TTL store of finished generation
//!   results, keyed on a request [`Fingerprint`]. Consulted by the
//!   conductor before routing and written after every successful
//!   generation. Disabled via `[dispatch] enable_cache = false`.
//!
//! - [`DecisionCache`]: short-lived moka cache of classifier decisions,
//!   owned by the strategy router so repeated requests of the same shape
//!   skip the classifier.

pub mod decision;
pub mod fingerprint;
pub mod response;

pub use decision::DecisionCache;
pub use fingerprint::Fingerprint;
pub use response::{CacheConfig, CacheEntryInfo, CacheStats, ResultCache};
