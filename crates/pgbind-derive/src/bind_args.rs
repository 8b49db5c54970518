//! BindArgs derive macro implementation

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase,
};
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashMap;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Expr, ExprLit, Fields, Lit, Meta, Result, Visibility};

#[derive(Clone, Copy)]
enum RenameRule {
    Lower,
    Upper,
    Snake,
    ScreamingSnake,
    Kebab,
    Camel,
    Pascal,
}

impl RenameRule {
    fn parse(lit: &syn::LitStr) -> Result<Self> {
        Ok(match lit.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "camelCase" => Self::Camel,
            "PascalCase" => Self::Pascal,
            other => {
                return Err(syn::Error::new_spanned(
                    lit,
                    format!(
                        "unknown rename_all rule \"{other}\"; expected one of lowercase, UPPERCASE, \
                         snake_case, SCREAMING_SNAKE_CASE, kebab-case, camelCase, PascalCase"
                    ),
                ));
            }
        })
    }

    fn apply(self, name: &str) -> String {
        match self {
            Self::Lower => name.to_lowercase(),
            Self::Upper => name.to_uppercase(),
            Self::Snake => name.to_snake_case(),
            Self::ScreamingSnake => name.to_shouty_snake_case(),
            Self::Kebab => name.to_kebab_case(),
            Self::Camel => name.to_lower_camel_case(),
            Self::Pascal => name.to_upper_camel_case(),
        }
    }
}

#[derive(Default)]
struct FieldAttrs {
    skip: bool,
    rename: Option<String>,
}

fn pgbind_metas(attrs: &[syn::Attribute]) -> Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("pgbind") {
            continue;
        }
        let nested = attr.parse_args_with(
            syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
        )?;
        metas.extend(nested);
    }
    Ok(metas)
}

fn string_value<'a>(expr: &'a Expr, key: &str) -> Result<&'a syn::LitStr> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s),
        _ => Err(syn::Error::new_spanned(
            expr,
            format!("pgbind({key} = \"...\") expects a string literal"),
        )),
    }
}

fn parse_rename_all(input: &DeriveInput) -> Result<Option<RenameRule>> {
    let mut rule = None;
    for meta in pgbind_metas(&input.attrs)? {
        match &meta {
            Meta::NameValue(nv) if nv.path.is_ident("rename_all") => {
                rule = Some(RenameRule::parse(string_value(&nv.value, "rename_all")?)?);
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    meta,
                    "unsupported container attribute; expected pgbind(rename_all = \"...\")",
                ));
            }
        }
    }
    Ok(rule)
}

fn parse_field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for meta in pgbind_metas(&field.attrs)? {
        match &meta {
            Meta::Path(p) if p.is_ident("skip") => attrs.skip = true,
            Meta::NameValue(nv) if nv.path.is_ident("rename") => {
                attrs.rename = Some(string_value(&nv.value, "rename")?.value());
            }
            // Row mapping attribute, read by the FromRow derive.
            Meta::NameValue(nv) if nv.path.is_ident("column") => {}
            _ => {
                return Err(syn::Error::new_spanned(
                    meta,
                    "unsupported field attribute; expected pgbind(skip) or pgbind(rename = \"...\")",
                ));
            }
        }
    }
    Ok(attrs)
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => return Ok(empty_impl(&input)),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "BindArgs can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "BindArgs can only be derived for structs",
            ));
        }
    };

    let rename_all = parse_rename_all(&input)?;

    let mut names = Vec::new();
    let mut accessors = Vec::new();
    let mut seen: HashMap<String, &syn::Ident> = HashMap::new();

    for field in fields {
        let attrs = parse_field_attrs(field)?;
        if attrs.skip || !matches!(field.vis, Visibility::Public(_)) {
            continue;
        }

        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let declared = ident.unraw().to_string();
        let bind_name = match (attrs.rename, rename_all) {
            (Some(rename), _) => rename,
            (None, Some(rule)) => rule.apply(&declared),
            (None, None) => declared,
        };

        if let Some(first) = seen.get(&bind_name) {
            return Err(syn::Error::new_spanned(
                ident,
                format!("bind name \"{bind_name}\" is already used by field `{first}`"),
            ));
        }
        seen.insert(bind_name.clone(), ident);

        let index = names.len();
        names.push(bind_name);
        accessors.push(quote! {
            #index => ::core::option::Option::Some(
                &self.#ident as &(dyn pgbind::ToSql + ::core::marker::Sync)
            ),
        });
    }

    Ok(quote! {
        impl #impl_generics pgbind::BindArgs for #name #ty_generics #where_clause {
            fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn field_value(
                &self,
                index: usize,
            ) -> ::core::option::Option<&(dyn pgbind::ToSql + ::core::marker::Sync)> {
                match index {
                    #(#accessors)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

fn empty_impl(input: &DeriveInput) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    quote! {
        impl #impl_generics pgbind::BindArgs for #name #ty_generics #where_clause {
            fn field_names() -> &'static [&'static str] {
                &[]
            }

            fn field_value(
                &self,
                _index: usize,
            ) -> ::core::option::Option<&(dyn pgbind::ToSql + ::core::marker::Sync)> {
                ::core::option::Option::None
            }
        }
    }
}
