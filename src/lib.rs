pub mod acoustics;
pub mod engine;
pub mod geom;
pub mod profile;
pub mod propagation;
pub mod scene;

// Prelude
pub use engine::config::{EngineConfig, ExportPathsMethod};
pub use engine::runner::{run, ComputeResult};
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use profile::cutpoint::{CutPoint, CutPointKind};
pub use profile::cutprofile::CutProfile;
pub use scene::Scene;
