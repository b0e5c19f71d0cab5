use syn::{Attribute, LitStr};

use crate::UND_ATTRIBUTE_NAME;
use crate::rename::RenameRule;

/// `#[und(...)]` on the struct.
#[derive(Default)]
pub(crate) struct ContainerAttrs {
    pub rename: Option<LitStr>,
    pub rename_all: Option<RenameRule>,
}

impl ContainerAttrs {
    pub(crate) fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident(UND_ATTRIBUTE_NAME)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    set_once(&mut out.rename, meta.value()?.parse()?, &meta.path)
                } else if meta.path.is_ident("rename_all") {
                    let lit: LitStr = meta.value()?.parse()?;
                    set_once(&mut out.rename_all, RenameRule::parse(&lit)?, &meta.path)
                } else {
                    Err(meta.error("expected `rename` or `rename_all`"))
                }
            })?;
        }
        Ok(out)
    }
}

/// `#[und(...)]` on a field.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub rename: Option<LitStr>,
    pub string: bool,
    pub skip: bool,
    pub flatten: bool,
}

impl FieldAttrs {
    pub(crate) fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident(UND_ATTRIBUTE_NAME)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    set_once(&mut out.rename, meta.value()?.parse()?, &meta.path)
                } else if meta.path.is_ident("string") {
                    out.string = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                    Ok(())
                } else if meta.path.is_ident("flatten") {
                    out.flatten = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `rename`, `string`, `skip` or `flatten`"))
                }
            })?;
        }

        if out.flatten && (out.rename.is_some() || out.string || out.skip) {
            let span = attrs
                .iter()
                .find(|a| a.path().is_ident(UND_ATTRIBUTE_NAME))
                .map_or_else(proc_macro2::Span::call_site, |a| {
                    syn::spanned::Spanned::span(a)
                });
            return Err(syn::Error::new(
                span,
                "`flatten` cannot be combined with other field attributes",
            ));
        }
        Ok(out)
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, path: &syn::Path) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new_spanned(path, "duplicate attribute"));
    }
    *slot = Some(value);
    Ok(())
}
