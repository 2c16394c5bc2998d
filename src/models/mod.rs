pub mod employee;
pub mod file;
pub mod user;
