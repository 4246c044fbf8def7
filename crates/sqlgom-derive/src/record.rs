//! Record derive macro implementation

mod attrs;

use attrs::{FieldAttr, HintKind};
use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let struct_attr = attrs::struct_attr(&input)?;

    let mut decls = Vec::new();
    let mut setters = Vec::new();
    let mut getters = Vec::new();

    for (i, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let field_name = ident.to_string();
        let attr = attrs::field_attr(field)?;
        let index = Literal::usize_unsuffixed(i);

        if attr.ignore {
            decls.push(quote! { ::sqlgom::FieldDecl::ignored(#field_name) });
            continue;
        }

        if attr.embed {
            decls.push(quote! { ::sqlgom::FieldDecl::embedded::<#ty>(#field_name) });
            setters.push(quote! {
                [#index, rest @ ..] => ::sqlgom::Record::set_field(&mut self.#ident, rest, value)
            });
            getters.push(quote! {
                [#index, rest @ ..] => ::sqlgom::Record::field_value(&self.#ident, rest)
            });
            continue;
        }

        let tag = attr
            .column
            .clone()
            .or_else(|| attr.column_bare.then(|| field_name.clone()));
        let column = match &tag {
            Some(c) => quote! { ::core::option::Option::Some(#c) },
            None => quote! { ::core::option::Option::None },
        };
        let hint = hint_tokens(&attr);
        let key = attr.key;
        decls.push(quote! {
            ::sqlgom::FieldDecl::scalar::<#ty>(#field_name, #column, #hint, #key)
        });
        setters.push(quote! {
            [#index] => ::sqlgom::assign(&mut self.#ident, value)
        });
        getters.push(quote! {
            [#index] => ::core::option::Option::Some(::sqlgom::FieldValue::to_value(&self.#ident))
        });
    }

    let table_const = struct_attr.table.as_ref().map(|table| {
        quote! {
            const TABLE: ::core::option::Option<&'static str> = ::core::option::Option::Some(#table);
        }
    });

    let hooks = struct_attr.hooks.then(|| {
        quote! {
            fn before_insert(&mut self) {
                <Self as ::sqlgom::RecordHooks>::before_insert(self)
            }

            fn before_update(&mut self) {
                <Self as ::sqlgom::RecordHooks>::before_update(self)
            }
        }
    });

    // Generic types have no single TypeId to warm, so only concrete ones register.
    let registration = generics.params.is_empty().then(|| {
        let table = match &struct_attr.table {
            Some(t) => quote! { ::core::option::Option::Some(#t) },
            None => quote! { ::core::option::Option::None },
        };
        quote! {
            ::sqlgom::inventory::submit! {
                ::sqlgom::RecordRegistration {
                    type_name: ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#name)),
                    table: #table,
                    warm: || {
                        let _ = ::sqlgom::describe::<#name>();
                    },
                }
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::sqlgom::Record for #name #ty_generics #where_clause {
            #table_const

            fn declared_fields() -> ::std::vec::Vec<::sqlgom::FieldDecl> {
                ::std::vec![#(#decls),*]
            }

            fn set_field(&mut self, path: &[usize], value: ::sqlgom::Value) -> bool {
                match path {
                    #(#setters,)*
                    _ => {
                        let _ = value;
                        false
                    }
                }
            }

            fn field_value(&self, path: &[usize]) -> ::core::option::Option<::sqlgom::Value> {
                match path {
                    #(#getters,)*
                    _ => ::core::option::Option::None,
                }
            }

            #hooks
        }

        #registration
    })
}

fn hint_tokens(attr: &FieldAttr) -> TokenStream {
    match attr.hint {
        Some(HintKind::Date) => quote! { ::core::option::Option::Some(::sqlgom::TypeHint::Date) },
        Some(HintKind::DateTime) => {
            quote! { ::core::option::Option::Some(::sqlgom::TypeHint::DateTime) }
        }
        Some(HintKind::Decimal) => {
            quote! { ::core::option::Option::Some(::sqlgom::TypeHint::Decimal) }
        }
        None => quote! { ::core::option::Option::None },
    }
}
