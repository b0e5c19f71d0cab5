#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use und_cfg as cfg;
pub use und_meta as meta;
pub use und_types as types;
pub use und_utils as utils;

pub use und_meta::{MetaRegistry, UndStruct};
pub use und_types::{Elastic, OptionExt, Options, State, Und};
