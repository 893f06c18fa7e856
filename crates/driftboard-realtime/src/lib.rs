// In-process realtime registries: broadcast hub, presence tracker, rate
// limiters, and the short-TTL read cache.
//
// Everything here is derived, ephemeral state. Each registry is constructed
// once at startup and shared by reference for the life of the process; a
// restart intentionally drops all live connections, presence, and limiter
// state. Durability lives only in the event log. Single-process by design;
// cross-process fan-out is a known extension point, not covered here.

pub mod cache;
pub mod hub;
pub mod presence;
pub mod rate_limit;

pub use cache::BoardCache;
pub use hub::{BroadcastHub, ConnectionHandle};
pub use presence::{PresenceTracker, UserInfo};
pub use rate_limit::FixedWindowLimiter;
