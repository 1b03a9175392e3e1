//! irrigd library - exposes modules for the daemon binary and tests.

pub mod actuator;
pub mod config;
pub mod coordinator;
pub mod feed;
pub mod history;
pub mod lifecycle;
pub mod metrics;
pub mod model;
pub mod poller;
pub mod routes;
pub mod server;
pub mod state;
