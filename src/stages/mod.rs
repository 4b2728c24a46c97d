//! Stage controllers.
//!
//! Each module holds the pure collection transforms for its stage plus a
//! controller handle that applies them to a [`Pipeline`](crate::Pipeline).

pub mod broll;
pub mod ideas;
pub mod script;
pub mod video;

pub use broll::{BrollController, PromptSummary};
pub use ideas::IdeaController;
pub use script::{ScriptController, ScriptStats};
pub use video::{TimelineEntry, VideoController};
