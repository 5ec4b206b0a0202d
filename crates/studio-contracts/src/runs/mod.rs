pub mod artifacts;
pub mod summary;
