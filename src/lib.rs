//! Payroll component engine and leave ledger for the HRM back-end.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod leave;
pub mod model;
pub mod models;
pub mod payroll;
pub mod routes;
