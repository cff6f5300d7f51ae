//! # Workflow Module
//!
//! The editorial stage model, stage transitions and the workflow view state.

mod stage;
mod transition;
mod view;

pub use stage::*;
pub use transition::*;
pub use view::*;
