pub mod dispatcher;
pub mod languages;
pub mod normalize;
pub mod piston;
pub mod process;
pub mod sandbox;
pub mod script;
