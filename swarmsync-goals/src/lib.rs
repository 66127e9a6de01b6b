//! Goal resolution, weighted goal blending, and coherence estimation.
//!
//! Pure computation over `swarmsync-core` types: [`resolver`] turns a
//! declared goal and swarm size into a [`swarmsync_core::Strategy`],
//! [`blend`] combines a local and global target, and [`coherence`] computes
//! the order parameter (and its histogram) over a phase distribution.

pub mod blend;
pub mod coherence;
pub mod resolver;

pub use blend::blend as blend_targets;
pub use coherence::{coherence as estimate_coherence, histogram};
pub use resolver::{recommended_coherence, recommended_target, resolve};

pub mod prelude {
    pub use crate::blend::blend as blend_targets;
    pub use crate::coherence::{coherence as estimate_coherence, histogram};
    pub use crate::resolver::{recommended_coherence, recommended_target, resolve};
}
