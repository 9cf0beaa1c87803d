#![allow(dead_code)]

pub mod backtest;
pub mod config;
pub mod detectors;
pub mod error;
pub mod executor;
pub mod freshness;
pub mod matcher;
pub mod models;
pub mod monitor;
pub mod numeric;
pub mod repository;
pub mod scanner;
pub mod telemetry;
pub mod venue;
