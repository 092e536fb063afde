//! Dynamic form panel: elements carry user-authored script hooks that decide
//! visibility, enablement, option lists and cascading value changes, and
//! buttons carry action code run in a sandbox with host capabilities.

pub mod action;
pub mod cli;
pub mod error;
pub mod evaluator;
pub mod form;
pub mod hooks;
pub mod panel;
pub mod report;
pub mod script;
pub mod trace;
