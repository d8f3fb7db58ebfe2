mod order;
mod run;

pub use order::*;
pub use run::*;
