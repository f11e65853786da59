mod refresh;
mod settings;

pub use refresh::*;
pub use settings::*;
