//! Cloud Resource Operator common library
//!
//! Error and configuration types shared by the operator components.

pub mod config;
pub mod error;

pub use self::config::{OperatorSettings, PrometheusSettings, TelemetrySettings};
pub use self::error::{CroError, Result};
