pub extern crate serde;
pub extern crate serde_json;

mod message;
mod registry;

pub use message::*;
pub use registry::*;
