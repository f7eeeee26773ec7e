pub mod health;
pub mod diagnostics;
pub mod error;
pub mod execution;
pub mod messages;

pub use health::*;
pub use diagnostics::*;
pub use error::*;
pub use execution::*;
pub use messages::*;
