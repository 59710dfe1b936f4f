pub mod api;
pub mod comms;
pub mod config;
pub mod error;
pub mod keyspace;
pub mod master;
pub mod model;
pub mod protocol;
pub mod scheduler;
pub mod shutdown;
pub mod store;
