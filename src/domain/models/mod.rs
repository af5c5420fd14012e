pub mod booking;
pub mod lab;
pub mod user;
