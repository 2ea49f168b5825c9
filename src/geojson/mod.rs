mod extract;
mod loader;
mod summary;

pub use extract::*;
pub use loader::*;
pub use summary::*;
