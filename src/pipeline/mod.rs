//! # Pipeline
//!
//! Per-uid stages and the batch loop that strings them together:
//!
//! 1. [`poses`] plans the seven camera poses through an injected policy
//! 2. [`compositor`] builds a fresh [`Scene`](crate::gfx::Scene) around the normalized asset
//! 3. [`orbit`] renders one PNG per pose
//! 4. [`completion`] decides whether an output directory is already done
//! 5. [`driver`] walks the manifest slice and isolates per-uid failures

pub mod completion;
pub mod compositor;
pub mod driver;
pub mod orbit;
pub mod poses;

pub use completion::{is_complete, REQUIRED_VIEWS};
pub use compositor::compose_scene;
pub use driver::{BatchDriver, BatchOptions, BatchReport, UidOutcome};
pub use orbit::{camera_distance, render_orbit};
pub use poses::{CameraPose, FixedOffsetPolicy, PosePolicy, PoseSequence, RandomQueryPolicy};
