//! Kiln native project export
//!
//! Reads a built project and its nested packages, writes generator
//! descriptors for one of `ios`, `android`, `mac` or `linux`, runs the
//! external generator and scaffolds the platform project around it.

pub mod descriptor;
pub mod engine;
pub mod error;
pub mod generator;
pub mod gyp;
pub mod package;
pub mod patch;
pub mod platform;
pub mod scaffold;

pub use descriptor::{Descriptor, Target, TargetType, UmbrellaGyp, VarGypi};
pub use engine::{local_address, ExportEngine};
pub use error::{ExportError, ExportResult};
pub use generator::ProjectLayout;
pub use package::{scan_package, ExportPackageNode, SourceScan};
pub use patch::StartArgs;
pub use platform::Platform;
