pub mod actions;
pub mod client;
pub mod error;
pub mod remote_model;
