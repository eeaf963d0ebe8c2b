pub mod alert;
pub mod bot;
pub mod db;
pub mod reading;
pub mod serial;
pub mod store;
pub mod telegram;
