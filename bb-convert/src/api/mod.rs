//! HTTP API handlers for bb-convert

pub mod convert;
pub mod health;
pub mod platforms;
pub mod sse;

pub use convert::convert_routes;
pub use health::health_routes;
pub use platforms::platform_routes;
pub use sse::conversion_event_stream;
