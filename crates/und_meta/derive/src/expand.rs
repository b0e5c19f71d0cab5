use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, LitStr, WherePredicate, parse_quote};

use crate::attrs::{ContainerAttrs, FieldAttrs};

/// One entry of the generated `build_info` chain.
enum Entry {
    Field {
        ident: syn::Ident,
        ty: syn::Type,
        wire_name: LitStr,
        string: bool,
    },
    Flatten {
        ident: syn::Ident,
        ty: syn::Type,
    },
}

pub(crate) fn expand(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "`UndStruct` requires a struct with named fields",
                ));
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "`UndStruct` can only be derived for structs",
            ));
        }
    };
    if let Some(lifetime) = ast.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "`UndStruct` types must be `'static`",
        ));
    }

    let container = ContainerAttrs::parse(&ast.attrs)?;
    let und_meta = crate::und_meta();

    let mut entries = Vec::with_capacity(fields.len());
    for field in fields {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let ty = field.ty.clone();
        if attrs.flatten {
            entries.push(Entry::Flatten { ident, ty });
            continue;
        }
        let wire_name = match attrs.rename {
            Some(lit) => lit,
            None => {
                let plain = ident.unraw().to_string();
                let wire = match container.rename_all {
                    Some(rule) => rule.apply(&plain),
                    None => plain,
                };
                LitStr::new(&wire, ident.span())
            }
        };
        entries.push(Entry::Field {
            ident,
            ty,
            wire_name,
            string: attrs.string,
        });
    }

    let xml_name = match &container.rename {
        Some(lit) => lit.clone(),
        None => LitStr::new(&ast.ident.unraw().to_string(), ast.ident.span()),
    };

    // Bounds
    let mut generics = ast.generics.clone();
    {
        let where_clause = generics.make_where_clause();
        where_clause.predicates.push(parse_quote!(Self: 'static));
        for entry in &entries {
            let predicate: WherePredicate = match entry {
                Entry::Field { ty, .. } => parse_quote!(#ty: #und_meta::Codec),
                Entry::Flatten { ty, .. } => parse_quote!(#ty: #und_meta::UndStruct),
            };
            where_clause.predicates.push(predicate);
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let ident = &ast.ident;

    let chain = entries.iter().map(|entry| match entry {
        Entry::Field {
            ident,
            ty,
            wire_name,
            string,
        } => {
            let name = ident.unraw().to_string();
            let hint = string.then(|| quote!(.with_hint(#und_meta::CodecHint::String)));
            quote! {
                .field(
                    #und_meta::FieldInfo::<Self>::new::<#ty>(
                        #name,
                        |s| &s.#ident,
                        |s| &mut s.#ident,
                    )
                    .with_wire_name(#wire_name)
                    #hint
                )
            }
        }
        Entry::Flatten { ident, ty } => {
            let name = ident.unraw().to_string();
            quote! {
                .flatten::<#ty>(#name, |s| &s.#ident, |s| &mut s.#ident)
            }
        }
    });

    let exports = quote!(#und_meta::__macro_exports);

    Ok(quote! {
        const _: () = {
            impl #impl_generics #und_meta::UndStruct for #ident #ty_generics #where_clause {
                fn build_info(
                    registry: &#und_meta::MetaRegistry,
                ) -> ::core::result::Result<#und_meta::StructInfo<Self>, #und_meta::MetaError> {
                    #und_meta::StructInfo::builder(registry, #xml_name)
                        #(#chain)*
                        .build()
                }
            }

            impl #impl_generics #und_meta::FieldCodec for #ident #ty_generics #where_clause {
                fn encode_json(
                    &self,
                    _: #und_meta::CodecHint,
                    registry: &#und_meta::MetaRegistry,
                ) -> ::core::result::Result<#exports::Value, #und_meta::CodecError> {
                    #und_meta::json::encode_struct(self, registry)
                }

                fn decode_json(
                    &mut self,
                    value: &#exports::Value,
                    _: #und_meta::CodecHint,
                    registry: &#und_meta::MetaRegistry,
                ) -> ::core::result::Result<(), #und_meta::CodecError> {
                    #und_meta::json::decode_into(self, value, registry)
                }

                fn encode_xml(
                    &self,
                    name: &str,
                    w: &mut #exports::XmlWriter,
                    registry: &#und_meta::MetaRegistry,
                ) -> ::core::result::Result<(), #und_meta::CodecError> {
                    #und_meta::xml::encode_struct(self, name, w, registry)
                }

                fn decode_xml(
                    &mut self,
                    node: #exports::Node<'_, '_>,
                    registry: &#und_meta::MetaRegistry,
                ) -> ::core::result::Result<(), #und_meta::CodecError> {
                    #und_meta::xml::decode_into(self, node, registry)
                }
            }

            impl #impl_generics #und_meta::Codec for #ident #ty_generics #where_clause {
                const KIND: #und_meta::FieldKind = #und_meta::FieldKind::Nested;
            }
        };
    })
}
