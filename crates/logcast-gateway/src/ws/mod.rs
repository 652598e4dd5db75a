pub mod connection;
pub mod sink;
