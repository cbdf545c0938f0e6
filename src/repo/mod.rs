// Repository layer for data access

pub mod stage;
pub mod task;
pub mod template;

pub use stage::StageRepo;
pub use task::TaskRepo;
pub use template::TemplateRepo;
