//! Browser automation layer (spec §4.1): the one seam in this crate not
//! grounded in the teacher's own stack — chromiumoxide, the CDP client the
//! retrieval pack converges on (see SPEC_FULL.md §2, DESIGN.md).

pub mod controller;
pub mod types;

pub use controller::{BrowserController, ChromiumoxideController};
pub use types::{BrowserConfig, ConsoleMessage, CoverageRange, FrameNavigatedEvent, ScriptCoverageEntry};
