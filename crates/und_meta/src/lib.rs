#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Compilation config

/// Macros used for compilation control.
pub mod cfg {
    und_cfg::define_alias! {
        #[cfg(all(debug_assertions, feature = "debug"))] => debug,
    }
}

// -----------------------------------------------------------------------------
// Extern Self

// Generated code names this crate `und_meta`, which must also resolve
// inside the crate's own tests.
extern crate self as und_meta;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod codec;
mod error;
mod registry;

pub mod info;
pub mod json;
pub mod xml;

#[doc(hidden)]
pub mod __macro_exports {
    pub use roxmltree::Node;
    pub use serde_json::Value;
    pub use und_types::XmlWriter;
}

// -----------------------------------------------------------------------------
// Exports

pub use codec::{Codec, FieldCodec};
pub use error::{CodecError, MetaError};
pub use info::{CodecHint, FieldInfo, FieldKind, StructInfo};
pub use registry::{MetaRegistry, RegistryStats, UndStruct};

#[cfg(feature = "derive")]
pub use und_meta_derive::UndStruct;

// -----------------------------------------------------------------------------
// Tests
