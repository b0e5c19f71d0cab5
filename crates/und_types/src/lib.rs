#![doc = include_str!("../README.md")]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod elastic;
mod state;
mod und;

pub mod option;
pub mod xml;

// -----------------------------------------------------------------------------
// Exports

pub use elastic::Elastic;
pub use option::{OptionExt, Options};
pub use state::State;
pub use und::Und;
pub use xml::{XmlError, XmlValue, XmlWriter};
