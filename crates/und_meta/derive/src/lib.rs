//! `#[derive(UndStruct)]`, re-exported by `und_meta`.
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static UND_ATTRIBUTE_NAME: &str = "und";

// -----------------------------------------------------------------------------
// Modules

mod attrs;
mod expand;
mod rename;

// -----------------------------------------------------------------------------
// Crate Path

/// Path of `und_meta` as seen from the invoking crate.
///
/// Reading the manifest is not cheap, so it happens once per derive and
/// the path is passed down.
pub(crate) fn und_meta() -> syn::Path {
    und_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("und_meta"))
}

// -----------------------------------------------------------------------------
// Macros

/// Implements `UndStruct`, `FieldCodec` and `Codec` for a struct with
/// named fields.
///
/// The generated `build_info` lists every field in declaration order.
/// Field types must implement `und_meta::Codec`; flattened fields must
/// implement `UndStruct`.
///
/// # Container attributes
///
/// - `#[und(rename = "name")]`: XML root element name, defaults to the
///   struct name.
/// - `#[und(rename_all = "...")]`: one of `lowercase`, `UPPERCASE`,
///   `PascalCase`, `camelCase`, `snake_case`, `SCREAMING_SNAKE_CASE`,
///   `kebab-case`, `SCREAMING-KEBAB-CASE`.
///
/// # Field attributes
///
/// - `#[und(rename = "wire")]`
/// - `#[und(string)]`: the scalar travels as a JSON string.
/// - `#[und(skip)]`
/// - `#[und(flatten)]`
///
/// ```rust, ignore
/// #[derive(UndStruct, Default)]
/// #[und(rename = "user", rename_all = "camelCase")]
/// struct User {
///     display_name: Und<String>,
///     #[und(string)]
///     age: Und<u32>,
///     #[und(flatten)]
///     audit: Audit,
///     #[und(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(UndStruct, attributes(und))]
pub fn derive_und_struct(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match expand::expand(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}
