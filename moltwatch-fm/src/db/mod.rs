//! Database queries for the field monitor service

pub mod detections;
pub mod environment;
pub mod individuals;
