pub mod capabilities;
pub mod runner;
