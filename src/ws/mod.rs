pub mod hub;
pub mod registry;
