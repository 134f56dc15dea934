//! pixbonk: pixel-accurate 2D collision engine (self-tuning grid + impulse resolution)

pub mod types;
pub mod api;
pub mod error;
pub mod mask;
pub mod pool;
pub mod resolver;
pub mod world;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::{MaskError, MaskResult};
pub use crate::mask::{CollisionMask, MaskCache, Run};
pub use crate::pool::{ScratchPool, ScratchSet};
pub use crate::resolver::CollisionResolver;
pub use crate::world::SpatialIndex;
