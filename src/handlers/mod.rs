pub mod auth;
pub mod csrf;
pub mod employee;
pub mod file;
