//! HTTP handlers

pub mod health;
pub mod devices;
pub mod detections;
pub mod frames;
pub mod threats;
pub mod manual;
pub mod alerts;
pub mod reports;
