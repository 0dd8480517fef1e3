pub mod audit;
pub mod registry;
