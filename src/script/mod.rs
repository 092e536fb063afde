pub mod compiler;
pub mod sandbox;
