pub mod diagnostic;
pub mod logger;
pub mod sink;
