//! Connection manager (§4.4): owns the name-keyed map of connections across
//! every dialect, a singleton accessor, and a background health loop with
//! optional auto-reconnect.

pub mod descriptor;
pub mod existing;
pub mod manager;

pub use descriptor::{BehaviorFlags, ConnectionDescriptor, ConnectionOptions, Dialect, PoolLimits, Target};
pub use existing::ExistingHandleProvider;
pub use manager::{ConnectionManager, DEFAULT_HEALTH_CHECK_INTERVAL};
