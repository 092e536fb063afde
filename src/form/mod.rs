pub mod diff;
pub mod element_model;
pub mod loader;
pub mod snapshot;
pub mod values;
