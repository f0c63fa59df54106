//! HTTP wiring: router, error envelope, middleware, and handlers.

pub(crate) mod constants;
pub(crate) mod errors;
pub(crate) mod health;
pub(crate) mod router;
pub(crate) mod telemetry;
pub(crate) mod torrents;
