// Board-level orchestration: selection, view state, and command dispatch
// against the store

pub mod command;
pub mod controller;
pub mod selection;

pub use command::{BoardCommand, Confirmation, DispatchOutcome, MoveDirection};
pub use controller::{BoardController, ViewMode};
pub use selection::Selection;
