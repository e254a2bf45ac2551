//! Cardio Service - HTTP surface and configuration of the risk predictor host

pub mod api;
pub mod config;
