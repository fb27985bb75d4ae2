pub mod defs;
pub mod identity;
pub mod state;
