pub mod health;
pub mod diagnostics;
pub mod execute;
pub mod run;
pub mod run_piston;

pub use health::*;
pub use diagnostics::*;
pub use execute::*;
pub use run::*;
pub use run_piston::*;
