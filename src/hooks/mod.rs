pub mod hook_model;
pub mod registry;
