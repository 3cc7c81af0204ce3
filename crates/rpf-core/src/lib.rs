pub mod config;
pub mod logging;

pub mod admission;
pub mod coordinator;
pub mod learn;
pub mod manager;
pub mod manifest;
pub mod queue;
pub mod selection;
pub mod session;
pub mod target;
pub mod transport;
