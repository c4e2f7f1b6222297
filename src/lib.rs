#[macro_use]
extern crate lazy_static;

pub mod atlas;
pub mod curve;
pub mod envelope;
pub mod errors;
pub mod file;
pub mod headers;
pub mod reader;
pub mod sections;
pub mod skins;
pub mod timelines;
