pub mod gif;
pub mod jpeg;
pub mod media;
pub mod png;
