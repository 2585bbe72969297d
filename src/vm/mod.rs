pub mod bridge;
pub mod control;
pub mod host;
pub mod notify;
pub mod resolver;
