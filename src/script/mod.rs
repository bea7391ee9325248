//! Flow script synthesis
//!
//! The platform executes work described in its own workflow scripting
//! language ("flow scripts"). This module turns structured operation intent
//! into script source: [`builder`] models definitions and statements and
//! renders them through a single serializer, [`synth`] holds the
//! per-operation shapes, and [`params`] models the typed entry-point
//! arguments submitted alongside the source.

pub mod builder;
pub mod params;
pub mod synth;

pub use builder::{Definition, Script, Stmt};
pub use params::{NamedParameter, Parameter};
pub use synth::{CompositeSpec, SynthesizedScript};
