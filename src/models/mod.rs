pub mod content;
pub mod sync;

pub use content::*;
pub use sync::*;
