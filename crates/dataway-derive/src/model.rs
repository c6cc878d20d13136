//! `Model` derive macro implementation.
//!
//! Builds a `dataway_core::model::ModelDescriptor` once, at registration
//! time, the way the struct's fields and `#[orm(...)]` attributes describe
//! it — the descriptor itself is what the engine consults on every request,
//! never the struct.

use crate::common::syn_types::column_type_tokens;
use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

struct StructAttrs {
    table: Option<String>,
    schema: Option<String>,
    entity: Option<String>,
}

impl syn::parse::Parse for StructAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs = StructAttrs { table: None, schema: None, entity: None };
        loop {
            if input.is_empty() {
                break;
            }
            let ident = syn::Ident::parse_any(input)?;
            let key = ident.to_string();
            if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                match key.as_str() {
                    "table" => attrs.table = Some(value.value()),
                    "schema" => attrs.schema = Some(value.value()),
                    "entity" => attrs.entity = Some(value.value()),
                    _ => {}
                }
            }
            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attrs)
    }
}

enum RelationAttrKind {
    HasMany,
    HasOne,
    BelongsTo,
    ManyToMany,
}

struct RelationAttr {
    kind: RelationAttrKind,
    related: syn::Path,
    foreign_key: String,
    references: Option<String>,
    join_table: Option<String>,
    name: Option<String>,
}

impl syn::parse::Parse for RelationAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let ident: syn::Ident = input.parse()?;
        let kind = match ident.to_string().as_str() {
            "has_many" => RelationAttrKind::HasMany,
            "has_one" => RelationAttrKind::HasOne,
            "belongs_to" => RelationAttrKind::BelongsTo,
            "many_to_many" => RelationAttrKind::ManyToMany,
            other => return Err(syn::Error::new(ident.span(), format!("unknown relation kind `{other}`"))),
        };

        let content;
        syn::parenthesized!(content in input);
        let related: syn::Path = content.parse()?;

        let mut foreign_key: Option<String> = None;
        let mut references: Option<String> = None;
        let mut join_table: Option<String> = None;
        let mut name: Option<String> = None;

        while content.peek(syn::Token![,]) {
            let _: syn::Token![,] = content.parse()?;
            if content.is_empty() {
                break;
            }
            let key = syn::Ident::parse_any(&content)?;
            let _: syn::Token![=] = content.parse()?;
            let value: syn::LitStr = content.parse()?;
            match key.to_string().as_str() {
                "foreign_key" => foreign_key = Some(value.value()),
                "references" => references = Some(value.value()),
                "join_table" => join_table = Some(value.value()),
                "as" | "name" => name = Some(value.value()),
                _ => {}
            }
        }

        let foreign_key = foreign_key.ok_or_else(|| {
            syn::Error::new(Span::call_site(), "relation requires foreign_key = \"...\"")
        })?;

        Ok(RelationAttr { kind, related, foreign_key, references, join_table, name })
    }
}

struct JoinAttr {
    table: String,
    on: String,
    join_type: String,
}

impl syn::parse::Parse for JoinAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let ident: syn::Ident = input.parse()?;
        if ident != "join" {
            return Err(syn::Error::new(ident.span(), "expected `join`"));
        }

        let content;
        syn::parenthesized!(content in input);

        let mut table: Option<String> = None;
        let mut on: Option<String> = None;
        let mut join_type: Option<String> = None;

        loop {
            if content.is_empty() {
                break;
            }
            let key = syn::Ident::parse_any(&content)?;
            let _: syn::Token![=] = content.parse()?;
            let value: syn::LitStr = content.parse()?;
            match key.to_string().as_str() {
                "table" => table = Some(value.value()),
                "on" => on = Some(value.value()),
                "type" => join_type = Some(value.value()),
                _ => {}
            }
            if content.peek(syn::Token![,]) {
                let _: syn::Token![,] = content.parse()?;
            } else {
                break;
            }
        }

        let table = table
            .ok_or_else(|| syn::Error::new(Span::call_site(), "join requires table = \"...\""))?;
        let on = on.ok_or_else(|| syn::Error::new(Span::call_site(), "join requires on = \"...\""))?;
        let join_type = join_type.unwrap_or_else(|| "inner".to_string());

        Ok(JoinAttr { table, on, join_type })
    }
}

fn join_keyword(join_type: &str) -> &'static str {
    match join_type.to_ascii_lowercase().as_str() {
        "left" => "LEFT JOIN",
        "right" => "RIGHT JOIN",
        "full" => "FULL JOIN",
        _ => "INNER JOIN",
    }
}

fn relation_default_name(related: &syn::Path, kind: &RelationAttrKind) -> String {
    use heck::ToSnakeCase;
    let base = related.segments.last().unwrap().ident.to_string().to_snake_case();
    match kind {
        RelationAttrKind::HasMany | RelationAttrKind::ManyToMany => format!("{base}s"),
        RelationAttrKind::HasOne | RelationAttrKind::BelongsTo => base,
    }
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    let struct_attrs = get_struct_attrs(&input)?;
    let table = struct_attrs.table.ok_or_else(|| {
        syn::Error::new_spanned(&input, "Model requires #[orm(table = \"table_name\")] attribute")
    })?;
    let entity = struct_attrs.entity.unwrap_or_else(|| {
        table.rsplit('.').next().unwrap_or(&table).to_string()
    });
    let schema_tokens = match struct_attrs.schema {
        Some(s) => quote! { ::std::option::Option::Some(#s.to_string()) },
        None => quote! { ::std::option::Option::None },
    };

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Model can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(&input, "Model can only be derived for structs"))
        }
    };

    let entity_table = table.rsplit('.').next().unwrap_or(&table).to_string();

    let mut column_entries = Vec::new();
    let mut select_exprs: Vec<String> = Vec::new();
    let mut id_column: Option<String> = None;
    let mut id_field: Option<(syn::Ident, syn::Type)> = None;
    let mut row_number_field: Option<String> = None;

    for field in fields.iter() {
        let field_attrs = get_field_attrs(field)?;
        if field_attrs.skip {
            continue;
        }

        let field_name = field.ident.as_ref().unwrap();
        // A field carrying an explicit `table` attr is being pulled in through a
        // `join`; alias it by its (struct-unique) Rust field name rather than its
        // possibly-colliding source column name, so joined tables sharing a column
        // name (e.g. both having `name`) stay distinguishable in the result row.
        let json_name = if field_attrs.table.is_some() {
            field_name.to_string()
        } else {
            field_attrs.column.clone().unwrap_or_else(|| field_name.to_string())
        };
        let column_name = field_attrs.column.unwrap_or_else(|| field_name.to_string());
        let source_table = field_attrs.table.clone().unwrap_or_else(|| entity_table.clone());
        let is_pk = field_attrs.is_id;
        let nullable = crate::common::syn_types::option_inner(&field.ty).is_some();
        let ty_tokens = column_type_tokens(&field.ty);

        if is_pk {
            id_column = Some(column_name.clone());
            id_field = Some((field_name.clone(), field.ty.clone()));
        }
        if field_attrs.row_number {
            row_number_field = Some(json_name.clone());
        }

        select_exprs.push(format!("{source_table}.{column_name} AS {json_name}"));
        column_entries.push(quote! {
            ::dataway_core::model::ColumnDescriptor {
                json_name: #json_name.to_string(),
                column_name: #column_name.to_string(),
                is_primary_key: #is_pk,
                nullable: #nullable,
                ty: #ty_tokens,
            }
        });
    }

    let id_column = id_column.unwrap_or_else(|| "id".to_string());
    let select_list = select_exprs.join(", ");

    let mut joins: Vec<JoinAttr> = Vec::new();
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let syn::Meta::List(meta_list) = &attr.meta else { continue };
        if let Ok(join) = syn::parse2::<JoinAttr>(meta_list.tokens.clone()) {
            joins.push(join);
        }
    }
    let join_clause = joins
        .iter()
        .map(|j| format!("{} {} ON {}", join_keyword(&j.join_type), j.table, j.on))
        .collect::<Vec<_>>()
        .join(" ");

    let mut relation_entries = Vec::new();
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let syn::Meta::List(meta_list) = &attr.meta else { continue };
        let Ok(rel) = syn::parse2::<RelationAttr>(meta_list.tokens.clone()) else { continue };

        let method_name = rel.name.unwrap_or_else(|| relation_default_name(&rel.related, &rel.kind));
        let related_path = &rel.related;
        let foreign_key = &rel.foreign_key;
        let references = rel.references.unwrap_or_else(|| "id".to_string());
        let join_table_tokens = match &rel.join_table {
            Some(jt) => quote! { ::std::option::Option::Some(#jt.to_string()) },
            None => quote! { ::std::option::Option::None },
        };
        let kind_tokens = match rel.kind {
            RelationAttrKind::HasMany => quote! { ::dataway_core::model::RelationKind::HasMany },
            RelationAttrKind::HasOne => quote! { ::dataway_core::model::RelationKind::HasOne },
            RelationAttrKind::BelongsTo => quote! { ::dataway_core::model::RelationKind::BelongsTo },
            RelationAttrKind::ManyToMany => quote! { ::dataway_core::model::RelationKind::Many2Many },
        };

        relation_entries.push(quote! {
            ::dataway_core::model::RelationDescriptor {
                name: #method_name.to_string(),
                kind: #kind_tokens,
                foreign_key: #foreign_key.to_string(),
                references: #references.to_string(),
                join_table: #join_table_tokens,
                related_model: #related_path::ENTITY.to_string(),
            }
        });
    }

    let row_number_tokens = match &row_number_field {
        Some(f) => quote! { ::std::option::Option::Some(#f.to_string()) },
        None => quote! { ::std::option::Option::None },
    };

    let model_pk_impl = match &id_field {
        Some((ident, ty)) => quote! {
            impl dataway_pg::ModelPk for #name {
                type Id = #ty;

                fn pk(&self) -> &Self::Id {
                    &self.#ident
                }
            }
        },
        None => quote! {},
    };

    Ok(quote! {
        #model_pk_impl

        impl #name {
            /// Entity name as registered in the catalog; relation attributes on
            /// other models reference this to name the related model without
            /// constructing its full descriptor.
            pub const ENTITY: &'static str = #entity;

            /// Table name, unqualified (schema stripped).
            pub const TABLE: &'static str = #entity_table;

            /// Primary key column name.
            pub const ID: &'static str = #id_column;

            /// Comma-joined, table-qualified column list for `SELECT`.
            pub const SELECT_LIST: &'static str = #select_list;

            /// Extra `JOIN` clause needed to resolve [`Self::SELECT_LIST`]; empty
            /// for models backed directly by their own table.
            pub const JOIN_CLAUSE: &'static str = #join_clause;

            pub fn model_descriptor() -> ::dataway_core::model::ModelDescriptor {
                ::dataway_core::model::ModelDescriptor {
                    entity: #entity.to_string(),
                    schema: #schema_tokens,
                    table: #table.to_string(),
                    columns: ::std::vec![#(#column_entries),*],
                    relations: ::std::vec![#(#relation_entries),*],
                    row_number_field: #row_number_tokens,
                }
            }

            /// Selects every row, resolving any configured `JOIN`s.
            pub async fn select_all(
                conn: &impl dataway_pg::GenericClient,
            ) -> dataway_pg::PgResult<::std::vec::Vec<Self>> {
                let sql = ::std::format!(
                    "SELECT {} FROM {} {}",
                    Self::SELECT_LIST,
                    Self::TABLE,
                    Self::JOIN_CLAUSE,
                );
                dataway_pg::query(sql).fetch_all_as::<Self>(conn).await
            }

            /// Selects a single row by primary key, resolving any configured `JOIN`s.
            pub async fn select_one<I>(
                conn: &impl dataway_pg::GenericClient,
                id: I,
            ) -> dataway_pg::PgResult<Self>
            where
                I: ::tokio_postgres::types::ToSql + ::core::marker::Sync + ::core::marker::Send + 'static,
            {
                let mut q = dataway_pg::Sql::empty();
                q.push("SELECT ");
                q.push(Self::SELECT_LIST);
                q.push(" FROM ");
                q.push(Self::TABLE);
                q.push(" ");
                q.push(Self::JOIN_CLAUSE);
                q.push(" WHERE ");
                q.push(Self::TABLE);
                q.push(".");
                q.push(Self::ID);
                q.push(" = ");
                q.push_bind(id);
                q.fetch_one_as::<Self>(conn).await
            }

            /// Deletes a row by primary key and returns it mapped through any
            /// configured `JOIN`s.
            pub async fn delete_by_id_returning<I>(
                conn: &impl dataway_pg::GenericClient,
                id: I,
            ) -> dataway_pg::PgResult<Self>
            where
                I: ::tokio_postgres::types::ToSql + ::core::marker::Sync + ::core::marker::Send + 'static,
            {
                let mut q = dataway_pg::Sql::empty();
                q.push("WITH ");
                q.push(Self::TABLE);
                q.push(" AS (DELETE FROM ");
                q.push(Self::TABLE);
                q.push(" WHERE ");
                q.push(Self::TABLE);
                q.push(".");
                q.push(Self::ID);
                q.push(" = ");
                q.push_bind(id);
                q.push(" RETURNING *) SELECT ");
                q.push(Self::SELECT_LIST);
                q.push(" FROM ");
                q.push(Self::TABLE);
                q.push(" ");
                q.push(Self::JOIN_CLAUSE);
                q.fetch_one_as::<Self>(conn).await
            }

            /// Deletes rows matching any of the given primary keys and returns
            /// them mapped through any configured `JOIN`s.
            pub async fn delete_by_ids_returning<I>(
                conn: &impl dataway_pg::GenericClient,
                ids: ::std::vec::Vec<I>,
            ) -> dataway_pg::PgResult<::std::vec::Vec<Self>>
            where
                I: ::tokio_postgres::types::ToSql + ::core::marker::Sync + ::core::marker::Send + 'static,
            {
                if ids.is_empty() {
                    return ::std::result::Result::Ok(::std::vec::Vec::new());
                }

                let mut q = dataway_pg::Sql::empty();
                q.push("WITH ");
                q.push(Self::TABLE);
                q.push(" AS (DELETE FROM ");
                q.push(Self::TABLE);
                q.push(" WHERE ");
                q.push(Self::TABLE);
                q.push(".");
                q.push(Self::ID);
                q.push(" = ANY(");
                q.push_bind(ids);
                q.push(") RETURNING *) SELECT ");
                q.push(Self::SELECT_LIST);
                q.push(" FROM ");
                q.push(Self::TABLE);
                q.push(" ");
                q.push(Self::JOIN_CLAUSE);
                q.fetch_all_as::<Self>(conn).await
            }
        }
    })
}

fn get_struct_attrs(input: &DeriveInput) -> Result<StructAttrs> {
    let mut merged = StructAttrs { table: None, schema: None, entity: None };
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let syn::Meta::List(meta_list) = &attr.meta else { continue };
        if let Ok(parsed) = syn::parse2::<StructAttrs>(meta_list.tokens.clone()) {
            merged.table = merged.table.or(parsed.table);
            merged.schema = merged.schema.or(parsed.schema);
            merged.entity = merged.entity.or(parsed.entity);
        }
    }
    Ok(merged)
}

struct FieldAttrs {
    is_id: bool,
    skip: bool,
    row_number: bool,
    column: Option<String>,
    table: Option<String>,
}

impl syn::parse::Parse for FieldAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs =
            FieldAttrs { is_id: false, skip: false, row_number: false, column: None, table: None };
        loop {
            if input.is_empty() {
                break;
            }
            let ident = syn::Ident::parse_any(input)?;
            let key = ident.to_string();
            match key.as_str() {
                "id" => attrs.is_id = true,
                "skip" => attrs.skip = true,
                "row_number" => attrs.row_number = true,
                _ => {
                    if input.peek(syn::Token![=]) {
                        let _: syn::Token![=] = input.parse()?;
                        let value: syn::LitStr = input.parse()?;
                        match key.as_str() {
                            "column" => attrs.column = Some(value.value()),
                            "table" => attrs.table = Some(value.value()),
                            _ => {}
                        }
                    }
                }
            }
            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attrs)
    }
}

fn get_field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut merged =
        FieldAttrs { is_id: false, skip: false, row_number: false, column: None, table: None };
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let syn::Meta::List(meta_list) = &attr.meta else { continue };
        let parsed = syn::parse2::<FieldAttrs>(meta_list.tokens.clone())?;
        merged.is_id |= parsed.is_id;
        merged.skip |= parsed.skip;
        merged.row_number |= parsed.row_number;
        merged.column = merged.column.or(parsed.column);
        merged.table = merged.table.or(parsed.table);
    }
    Ok(merged)
}
