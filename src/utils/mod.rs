//! Shared helpers

pub mod net;
pub mod throttle;

pub use net::{bind_tcp_listener, resolve_bind_addr};
pub use throttle::LogThrottler;
