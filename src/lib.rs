pub mod config;
pub mod engine;
pub mod inquiry;
pub mod limits;
pub mod model;
pub mod observability;
pub mod snapshot;
pub mod tools;
pub mod wire;
