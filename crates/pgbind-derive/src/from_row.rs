//! FromRow derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Expr, ExprLit, Fields, Lit, Meta, Result};

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
                    "FromRow can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRow can only be derived for structs",
            ));
        }
    };

    let mut field_extracts = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let column_name = get_column_name(field)?;
        field_extracts.push(quote! {
            #field_name: row.try_get_column(#column_name)?
        });
    }

    Ok(quote! {
        impl #impl_generics pgbind::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &pgbind::Row) -> pgbind::BindResult<Self> {
                use pgbind::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

/// `#[pgbind(column = "...")]`, else the field name. Binding attributes on the
/// same field are left to the BindArgs derive.
fn get_column_name(field: &syn::Field) -> Result<String> {
    for attr in &field.attrs {
        if !attr.path().is_ident("pgbind") {
            continue;
        }
        let nested = attr.parse_args_with(
            syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
        )?;
        for meta in &nested {
            let Meta::NameValue(nv) = meta else {
                continue;
            };
            if !nv.path.is_ident("column") {
                continue;
            }
            let Expr::Lit(ExprLit {
                lit: Lit::Str(lit), ..
            }) = &nv.value
            else {
                return Err(syn::Error::new_spanned(
                    &nv.value,
                    "pgbind(column = \"...\") expects a string literal",
                ));
            };
            return Ok(lit.value());
        }
    }
    Ok(field
        .ident
        .as_ref()
        .map(|ident| syn::ext::IdentExt::unraw(ident).to_string())
        .unwrap_or_default())
}
