// Core data models for Stagetrack
// These structs represent the domain entities

pub mod stage;
pub mod task;
pub mod template;

pub use stage::*;
pub use task::*;
pub use template::*;
