//! econ-core: a closed artificial economy of households, firms and a
//! government, advanced one simulated month per step under a fiscal
//! policy supplied by an external controller.

pub mod clock;
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod event;
pub mod firm;
pub mod fiscal;
pub mod goods_market;
pub mod household;
pub mod labor_market;
pub mod metrics;
pub mod rng;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod world;
