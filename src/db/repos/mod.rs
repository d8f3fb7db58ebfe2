mod backups;
mod orders;
mod runs;

pub use backups::*;
pub use orders::*;
pub use runs::*;
