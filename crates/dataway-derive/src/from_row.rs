//! FromRow derive macro implementation

use proc_macro2::TokenStream;
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
                    "FromRow can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "FromRow can only be derived for structs",
            ))
        }
    };

    let field_extracts: Vec<_> = fields
        .iter()
        .map(|field| {
            let field_name = field.ident.as_ref().unwrap();
            let column_name = get_column_name(field);

            quote! {
                #field_name: row.try_get_column(#column_name)?
            }
        })
        .collect();

    Ok(quote! {
        impl #impl_generics dataway_pg::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &tokio_postgres::Row) -> dataway_pg::PgResult<Self> {
                use dataway_pg::RowExt;
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}

fn get_column_name(field: &syn::Field) -> String {
    let mut column = None;
    let mut has_table = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let syn::Meta::List(meta_list) = &attr.meta else { continue };
        let (c, t) = parse_column_and_table_keys(meta_list.tokens.clone());
        column = column.or(c);
        has_table |= t;
    }

    // A field joined in from another table (`table = "..."`) is aliased by its
    // own Rust field name in the generated SELECT_LIST (see the `Model` derive),
    // so it must be looked up by that same name here rather than by its source
    // column, which may collide with a same-named column on another table.
    if has_table {
        return field.ident.as_ref().unwrap().to_string();
    }
    column.unwrap_or_else(|| field.ident.as_ref().unwrap().to_string())
}

/// Scans a comma-separated `#[orm(...)]` attribute for `column = "..."` and
/// `table = "..."` entries, ignoring any other keys (`id`, `skip`, ...) present
/// alongside them. Returns `(column value, whether a table key was present)`.
fn parse_column_and_table_keys(tokens: proc_macro2::TokenStream) -> (Option<String>, bool) {
    use syn::ext::IdentExt;

    syn::parse::Parser::parse2(
        |input: syn::parse::ParseStream| -> syn::Result<(Option<String>, bool)> {
            let mut column = None;
            let mut has_table = false;
            loop {
                if input.is_empty() {
                    break;
                }
                let key = syn::Ident::parse_any(input)?;
                if input.peek(syn::Token![=]) {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    if key == "column" {
                        column = Some(value.value());
                    } else if key == "table" {
                        has_table = true;
                    }
                }
                if input.peek(syn::Token![,]) {
                    let _: syn::Token![,] = input.parse()?;
                } else {
                    break;
                }
            }
            Ok((column, has_table))
        },
        tokens,
    )
    .unwrap_or((None, false))
}
