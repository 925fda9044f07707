//! SmartThings capability adapters.
//!
//! This library wraps individual SmartThings device capabilities
//! (audioVolume, contactSensor, temperatureMeasurement) around a pluggable
//! SDK boundary, and ships a loopback SDK for tests and the sample device.

pub mod capabilities;
pub mod config;
pub mod device;
pub mod error;
pub mod sdk;
pub mod simulation;
