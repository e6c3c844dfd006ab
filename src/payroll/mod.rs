pub mod audit_log;
pub mod catalog;
pub mod engine;
pub mod response;
pub mod store;
