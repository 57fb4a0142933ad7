//! Implementation of the Model derive macro.
//!
//! Parses `#[sqlmeta(...)]` struct and field attributes into a [`ModelDef`]
//! and generates the `Entity` and `Model` implementations from it.

use std::sync::OnceLock;

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{
    Data, DeriveInput, Error, Field, Fields, GenericArgument, Ident, Lit, PathArguments, Result,
    Type,
};

/// Parsed model definition from a struct with `#[derive(Model)]`.
#[derive(Debug)]
pub struct ModelDef {
    /// The struct name.
    pub name: Ident,
    /// Table name, explicit or derived from the struct name.
    pub table: String,
    /// Mapped fields, in declaration order. Skipped fields are not listed.
    pub fields: Vec<ModelFieldDef>,
    /// Generics from the struct.
    pub generics: syn::Generics,
    /// Path to `sqlmeta-core` given with `#[sqlmeta(crate = "...")]`.
    pub core: Option<syn::Path>,
}

/// Parsed mapping of a single field.
#[derive(Debug)]
pub struct ModelFieldDef {
    /// The Rust field name.
    pub ident: Ident,
    /// The field type.
    pub ty: Type,
    /// Column name.
    pub column: String,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub index: bool,
    /// Explicit `nullable`; `Option<T>` fields are nullable regardless.
    pub nullable: bool,
    pub max_length: Option<u32>,
    /// Related model type for `ForeignKey<R>` fields.
    pub related: Option<Type>,
}

impl ModelFieldDef {
    /// Relation name of a foreign-key field: the Rust field name.
    fn relation(&self) -> Option<String> {
        self.related.as_ref().map(|_| self.ident.to_string())
    }
}

fn identifier_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .expect("identifier pattern is a valid literal")
    })
}

/// Parse a `DeriveInput` into a `ModelDef`.
pub fn parse_model(input: &DeriveInput) -> Result<ModelDef> {
    let name = input.ident.clone();
    let generics = input.generics.clone();

    let mut table = None;
    let mut core = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("sqlmeta") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: Lit = meta.value()?.parse()?;
                table = Some(parse_identifier_lit(&value)?);
                Ok(())
            } else if meta.path.is_ident("crate") {
                let value: syn::LitStr = meta.value()?.parse()?;
                core = Some(value.parse::<syn::Path>()?);
                Ok(())
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                Err(Error::new_spanned(
                    &meta.path,
                    format!(
                        "unknown sqlmeta struct attribute `{attr_name}`. \
                         Valid attributes are: table, crate"
                    ),
                ))
            }
        })?;
    }
    let table = table.unwrap_or_else(|| to_snake_case(&name.to_string()));

    let fields = match &input.data {
        Data::Struct(data) => parse_model_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Model can only be derived for structs, not unions",
            ));
        }
    };

    let mut def = ModelDef {
        name,
        table,
        fields,
        generics,
        core,
    };
    resolve_primary_key(&mut def, input)?;
    Ok(def)
}

/// Parse all fields from a struct.
fn parse_model_fields(fields: &Fields) -> Result<Vec<ModelFieldDef>> {
    let Fields::Named(named) = fields else {
        return Err(Error::new_spanned(
            fields,
            "Model requires a struct with named fields",
        ));
    };

    let mut parsed: Vec<ModelFieldDef> = Vec::new();
    for field in &named.named {
        let Some(def) = parse_model_field(field)? else {
            continue;
        };
        if parsed.iter().any(|f| f.column == def.column) {
            return Err(Error::new_spanned(
                field,
                format!("duplicate column `{}`", def.column),
            ));
        }
        parsed.push(def);
    }
    Ok(parsed)
}

/// Parse a single field and its attributes. `None` for skipped fields.
fn parse_model_field(field: &Field) -> Result<Option<ModelFieldDef>> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let ty = field.ty.clone();
    if is_optional_foreign_key(&ty) {
        return Err(Error::new_spanned(
            &field.ty,
            format!(
                "`Option<ForeignKey<_>>` is not supported; an unset `ForeignKey` already \
                 stores NULL. Declare `#[sqlmeta(nullable)] {ident}: ForeignKey<_>` instead"
            ),
        ));
    }
    let related = extract_foreign_key_target(&ty).cloned();

    let mut column = None;
    let mut primary_key = false;
    let mut auto_increment = false;
    let mut unique = false;
    let mut index = false;
    let mut nullable = false;
    let mut max_length = None;
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("sqlmeta") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("primary_key") {
                primary_key = true;
            } else if path.is_ident("auto_increment") {
                auto_increment = true;
            } else if path.is_ident("unique") {
                unique = true;
            } else if path.is_ident("index") {
                index = true;
            } else if path.is_ident("nullable") {
                nullable = true;
            } else if path.is_ident("skip") {
                skip = true;
            } else if path.is_ident("max_length") {
                let value: Lit = meta.value()?.parse()?;
                max_length = Some(parse_u32_lit(&value)?);
            } else if path.is_ident("column") {
                let value: Lit = meta.value()?.parse()?;
                column = Some(parse_identifier_lit(&value)?);
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown sqlmeta attribute `{attr_name}`. \
                         Valid attributes are: primary_key, auto_increment, unique, index, \
                         nullable, max_length, column, skip"
                    ),
                ));
            }

            Ok(())
        })?;
    }

    if skip {
        return Ok(None);
    }

    // Foreign keys store the related key under `<relation>_id`.
    let column = column.unwrap_or_else(|| {
        let name = ident.to_string();
        let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
        if related.is_some() {
            format!("{name}_id")
        } else {
            name
        }
    });

    Ok(Some(ModelFieldDef {
        ident,
        ty,
        column,
        primary_key,
        auto_increment,
        unique,
        index,
        nullable,
        max_length,
        related,
    }))
}

/// Exactly one primary key. Without an explicit one, a field named `id`
/// becomes the key, database-assigned when it is an integer.
fn resolve_primary_key(def: &mut ModelDef, input: &DeriveInput) -> Result<()> {
    let explicit: Vec<_> = def.fields.iter().filter(|f| f.primary_key).collect();
    if explicit.len() > 1 {
        return Err(Error::new_spanned(
            &explicit[1].ident,
            "Model allows a single primary key field",
        ));
    }
    if explicit.is_empty() {
        let Some(id) = def.fields.iter_mut().find(|f| f.ident == "id") else {
            return Err(Error::new_spanned(
                input,
                "Model requires a primary key: name a field `id` or mark one with #[sqlmeta(primary_key)]",
            ));
        };
        id.primary_key = true;
        if is_integer_type(&id.ty) {
            id.auto_increment = true;
        }
    }
    Ok(())
}

/// Parse a string literal holding a SQL identifier.
fn parse_identifier_lit(lit: &Lit) -> Result<String> {
    let Lit::Str(lit_str) = lit else {
        return Err(Error::new_spanned(lit, "expected string literal"));
    };
    let value = lit_str.value();
    if !identifier_pattern().is_match(&value) {
        return Err(Error::new_spanned(
            lit_str,
            format!("`{value}` is not a valid SQL identifier"),
        ));
    }
    Ok(value)
}

/// Parse a numeric literal to u32.
fn parse_u32_lit(lit: &Lit) -> Result<u32> {
    match lit {
        Lit::Int(int_lit) => int_lit
            .base10_parse::<u32>()
            .map_err(|e| Error::new_spanned(lit, format!("invalid integer: {e}"))),
        _ => Err(Error::new_spanned(lit, "expected integer literal")),
    }
}

/// `BlogPost` -> `blog_post`.
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Last path segment of a type, with its generic arguments.
fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}

/// First generic type argument of a path type.
fn first_type_argument(segment: &syn::PathSegment) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(GenericArgument::Type(inner)) = args.args.first() {
            return Some(inner);
        }
    }
    None
}

/// Extract `R` from `ForeignKey<R>`.
fn extract_foreign_key_target(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident != "ForeignKey" {
        return None;
    }
    first_type_argument(segment)
}

/// `Option<ForeignKey<R>>`, under any path prefix.
fn is_optional_foreign_key(ty: &Type) -> bool {
    last_segment(ty)
        .filter(|segment| segment.ident == "Option")
        .and_then(first_type_argument)
        .and_then(extract_foreign_key_target)
        .is_some()
}

/// Check if a type is `i32`/`i64`, optionally wrapped in `Option`.
fn is_integer_type(ty: &Type) -> bool {
    let Some(segment) = last_segment(ty) else {
        return false;
    };
    if segment.ident == "Option" {
        return first_type_argument(segment).is_some_and(is_integer_type);
    }
    segment.ident == "i32" || segment.ident == "i64"
}

/// Generate the `Entity` and `Model` implementations. Generated code names
/// `sqlmeta-core` items through `def.core`, or `default_core` without one.
pub fn generate_model_impl(def: &ModelDef, default_core: &syn::Path) -> TokenStream {
    let core = def.core.as_ref().unwrap_or(default_core);
    let name = &def.name;
    let table = &def.table;
    let (impl_generics, ty_generics, where_clause) = def.generics.split_for_impl();

    let field_infos = def.fields.iter().map(|f| generate_field_info(f, core));

    let getters = def.fields.iter().map(|f| {
        let ident = &f.ident;
        let column = &f.column;
        quote! {
            #column => ::core::option::Option::Some(#core::SqlField::to_value(&self.#ident)),
        }
    });

    let setters = def.fields.iter().map(|f| {
        let ident = &f.ident;
        let column = &f.column;
        quote! {
            #column => #core::SqlField::assign(&mut self.#ident, value)
                .map_err(|e| e.in_field(#column)),
        }
    });

    let pk = def.fields.iter().find(|f| f.primary_key);
    let pk_column = pk.map_or("id", |f| f.column.as_str());
    let pk_ty = pk.map_or_else(|| quote!(i64), |f| f.ty.to_token_stream());

    let relations = generate_relations(def, core);

    quote! {
        impl #impl_generics #core::Entity for #name #ty_generics #where_clause {
            fn table_name(&self) -> &'static str {
                #table
            }

            fn field_infos(&self) -> ::std::vec::Vec<#core::FieldInfo> {
                <Self as #core::Model>::fields()
            }

            fn get_value(&self, field: &str) -> ::core::option::Option<#core::Value> {
                match field {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_value(
                &mut self,
                field: &str,
                value: #core::Value,
            ) -> #core::Result<()> {
                match field {
                    #(#setters)*
                    _ => ::core::result::Result::Err(#core::Error::unknown_field(#table, field)),
                }
            }

            #relations

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }
        }

        impl #impl_generics #core::Model for #name #ty_generics #where_clause {
            const TABLE_NAME: &'static str = #table;
            const PRIMARY_KEY: &'static str = #pk_column;
            const PRIMARY_KEY_TYPE: #core::SqlType =
                <#pk_ty as #core::SqlField>::SQL_TYPE;

            fn fields() -> ::std::vec::Vec<#core::FieldInfo> {
                ::std::vec![#(#field_infos),*]
            }
        }
    }
}

/// Builder expression for one field's `FieldInfo`.
fn generate_field_info(field: &ModelFieldDef, core: &syn::Path) -> TokenStream {
    let ty = &field.ty;
    let column = &field.column;
    let primary_key = field.primary_key;
    let auto_increment = field.auto_increment;
    let unique = field.unique;
    let index = field.index;
    let nullable = field.nullable;
    let max_length = match field.max_length {
        Some(len) => quote!(::core::option::Option::Some(#len)),
        None => quote!(::core::option::Option::None),
    };
    let foreign_key = match (&field.related, field.relation()) {
        (Some(related), Some(relation)) => quote! {
            .foreign_key(#relation, <#related as #core::Model>::TABLE_NAME)
            .references(<#related as #core::Model>::PRIMARY_KEY)
        },
        _ => TokenStream::new(),
    };

    quote! {
        #core::FieldInfo::new(#column, <#ty as #core::SqlField>::SQL_TYPE)
            .primary_key(#primary_key)
            .auto_increment(#auto_increment)
            .unique(#unique)
            .index(#index)
            .nullable(#nullable || <#ty as #core::SqlField>::NULLABLE)
            .max_length_opt(#max_length)
            #foreign_key
    }
}

/// `related`, `related_mut` and `set_related` over the foreign-key fields.
fn generate_relations(def: &ModelDef, core: &syn::Path) -> TokenStream {
    let fks: Vec<_> = def
        .fields
        .iter()
        .filter_map(|f| f.relation().map(|relation| (&f.ident, relation)))
        .collect();
    if fks.is_empty() {
        return TokenStream::new();
    }

    let table = &def.table;
    let idents: Vec<_> = fks.iter().map(|(ident, _)| *ident).collect();
    let relations: Vec<_> = fks.iter().map(|(_, relation)| relation).collect();

    quote! {
        fn related(&self, relation: &str) -> ::core::option::Option<&dyn #core::Entity> {
            match relation {
                #(#relations => self.#idents.as_entity(),)*
                _ => ::core::option::Option::None,
            }
        }

        fn related_mut(
            &mut self,
            relation: &str,
        ) -> ::core::option::Option<&mut dyn #core::Entity> {
            match relation {
                #(#relations => self.#idents.as_entity_mut(),)*
                _ => ::core::option::Option::None,
            }
        }

        fn set_related(
            &mut self,
            relation: &str,
            object: ::std::boxed::Box<dyn ::core::any::Any + ::core::marker::Send + ::core::marker::Sync>,
        ) -> #core::Result<()> {
            match relation {
                #(#relations => self.#idents.set_boxed(object),)*
                _ => ::core::result::Result::Err(#core::Error::Mapping(::std::format!(
                    "model `{}` has no relation `{}`",
                    #table,
                    relation
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_snake_case_table_name() {
        assert_eq!(to_snake_case("BlogPost"), "blog_post");
        assert_eq!(to_snake_case("User"), "user");
        assert_eq!(to_snake_case("Item2Tag"), "item2_tag");
    }

    #[test]
    fn test_implicit_id_primary_key() {
        let input: DeriveInput = parse_quote! {
            struct BlogPost {
                id: i64,
                title: String,
            }
        };
        let def = parse_model(&input).unwrap();
        assert_eq!(def.table, "blog_post");
        let id = &def.fields[0];
        assert!(id.primary_key);
        assert!(id.auto_increment);
        assert!(!def.fields[1].primary_key);
    }

    #[test]
    fn test_explicit_text_primary_key() {
        let input: DeriveInput = parse_quote! {
            #[sqlmeta(table = "accounts")]
            struct Account {
                #[sqlmeta(primary_key, max_length = 64)]
                username: String,
                #[sqlmeta(skip)]
                cache: Vec<u8>,
                id: i64,
            }
        };
        let def = parse_model(&input).unwrap();
        assert_eq!(def.table, "accounts");
        assert_eq!(def.fields.len(), 2);
        assert!(def.fields[0].primary_key);
        assert!(!def.fields[0].auto_increment);
        assert_eq!(def.fields[0].max_length, Some(64));
        // `id` is an ordinary column once another key is declared.
        assert!(!def.fields[1].primary_key);
    }

    #[test]
    fn test_foreign_key_column_and_relation() {
        let input: DeriveInput = parse_quote! {
            struct Player {
                id: i64,
                team: ForeignKey<Team>,
                #[sqlmeta(column = "coach_ref")]
                coach: sqlmeta::ForeignKey<Coach>,
            }
        };
        let def = parse_model(&input).unwrap();
        assert_eq!(def.fields[1].column, "team_id");
        assert_eq!(def.fields[1].relation().as_deref(), Some("team"));
        assert_eq!(def.fields[2].column, "coach_ref");
        assert_eq!(def.fields[2].relation().as_deref(), Some("coach"));
        assert!(def.fields[0].relation().is_none());
    }

    #[test]
    fn test_missing_primary_key_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Note {
                body: String,
            }
        };
        assert!(parse_model(&input).is_err());
    }

    #[test]
    fn test_two_primary_keys_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Pair {
                #[sqlmeta(primary_key)]
                a: i64,
                #[sqlmeta(primary_key)]
                b: i64,
            }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("single primary key"));
    }

    #[test]
    fn test_bad_attributes_rejected() {
        let unknown: DeriveInput = parse_quote! {
            struct T {
                #[sqlmeta(primary)]
                id: i64,
            }
        };
        assert!(parse_model(&unknown).is_err());

        let bad_column: DeriveInput = parse_quote! {
            struct T {
                id: i64,
                #[sqlmeta(column = "drop table")]
                name: String,
            }
        };
        assert!(parse_model(&bad_column).is_err());

        let duplicate: DeriveInput = parse_quote! {
            struct T {
                id: i64,
                #[sqlmeta(column = "id")]
                other: i64,
            }
        };
        assert!(parse_model(&duplicate).is_err());

        let tuple: DeriveInput = parse_quote! {
            struct T(i64);
        };
        assert!(parse_model(&tuple).is_err());
    }

    #[test]
    fn test_is_integer_type() {
        let ty: Type = parse_quote!(i64);
        assert!(is_integer_type(&ty));
        let ty: Type = parse_quote!(Option<i32>);
        assert!(is_integer_type(&ty));
        let ty: Type = parse_quote!(String);
        assert!(!is_integer_type(&ty));
    }

    #[test]
    fn test_generated_impl_mentions_relations() {
        let input: DeriveInput = parse_quote! {
            struct Player {
                id: i64,
                team: ForeignKey<Team>,
            }
        };
        let def = parse_model(&input).unwrap();
        let tokens = generate_model_impl(&def, &parse_quote!(::sqlmeta_core)).to_string();
        assert!(tokens.contains("set_boxed"));
        assert!(tokens.contains("\"team_id\""));
        assert!(tokens.contains("TABLE_NAME"));
        assert!(tokens.contains(":: sqlmeta_core :: Entity"));
    }

    #[test]
    fn test_crate_path_override() {
        let input: DeriveInput = parse_quote! {
            #[sqlmeta(crate = "::app::orm")]
            struct Team {
                id: i64,
            }
        };
        let def = parse_model(&input).unwrap();
        let tokens = generate_model_impl(&def, &parse_quote!(::sqlmeta_core)).to_string();
        assert!(tokens.contains(":: app :: orm :: Model"));
        assert!(!tokens.contains("sqlmeta_core"));

        let plain: DeriveInput = parse_quote! {
            struct Team {
                id: i64,
            }
        };
        let def = parse_model(&plain).unwrap();
        let tokens = generate_model_impl(&def, &parse_quote!(::sqlmeta::crates::core)).to_string();
        assert!(tokens.contains(":: sqlmeta :: crates :: core :: SqlField"));
    }

    #[test]
    fn test_optional_foreign_key_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Player {
                id: i64,
                team: Option<ForeignKey<Team>>,
            }
        };
        let err = parse_model(&input).unwrap_err();
        assert!(err.to_string().contains("#[sqlmeta(nullable)] team: ForeignKey<_>"));

        let nested: DeriveInput = parse_quote! {
            struct Player {
                id: i64,
                team: std::option::Option<sqlmeta::ForeignKey<Team>>,
            }
        };
        assert!(parse_model(&nested).is_err());

        let nullable: DeriveInput = parse_quote! {
            struct Player {
                id: i64,
                #[sqlmeta(nullable)]
                team: ForeignKey<Team>,
            }
        };
        let def = parse_model(&nullable).unwrap();
        assert!(def.fields[1].nullable);
        assert_eq!(def.fields[1].column, "team_id");
        assert_eq!(def.fields[1].relation().as_deref(), Some("team"));
    }
}
