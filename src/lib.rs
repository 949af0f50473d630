//! Real-time vehicle-to-vehicle collision-risk engine.
//!
//! Vehicles stream kinematic telemetry over a persistent WebSocket; the
//! engine keeps an expiring spatial view of the fleet, runs a bank of
//! path predictors against every nearby pair, and pushes typed threat
//! notifications to both endpoints of a predicted interaction.
//!
//! Headings are compass bearings (0° = north, clockwise); the local
//! tangent frame is (east, north) meters. See [`geometry`] for the math.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod geo_index;
pub mod geometry;
pub mod history;
pub mod predictors;
pub mod server;
pub mod sessions;
pub mod status;
pub mod telemetry;
pub mod telemetry_store;
pub mod threat;
