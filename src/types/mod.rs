mod coord;
mod layer_types;

pub use coord::*;
pub use layer_types::*;
