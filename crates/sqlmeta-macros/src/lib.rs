//! Procedural macros for sqlmeta.
//!
//! `#[derive(Model)]` turns a plain struct into a mapped model: it generates
//! the `Entity` and `Model` implementations from `sqlmeta-core`, so the
//! table schema is fixed at compile time.
//!
//! # Attributes
//!
//! On the struct:
//!
//! - `#[sqlmeta(table = "name")]`: table name (default: the struct name in
//!   lower snake case).
//! - `#[sqlmeta(crate = "path")]`: where the generated code finds the
//!   `sqlmeta-core` items (default: `::sqlmeta_core`, or
//!   `::sqlmeta::crates::core` when derived through the `sqlmeta` facade).
//!
//! On fields:
//!
//! - `primary_key`, `auto_increment`, `unique`, `index`, `nullable`
//! - `max_length = N`: `VARCHAR(N)` for text columns
//! - `column = "name"`: column name (default: the field name, or
//!   `<field>_id` for `ForeignKey<R>` fields)
//! - `skip`: not mapped
//!
//! A field named `id` becomes the primary key when no field is marked
//! `primary_key`; integer `id` keys are assigned by the database. A
//! nullable foreign key is `#[sqlmeta(nullable)] team: ForeignKey<Team>`;
//! `Option<ForeignKey<_>>` is rejected.
//!
//! ```ignore
//! #[derive(Debug, Default, Model)]
//! struct Player {
//!     id: i64,
//!     #[sqlmeta(max_length = 100, index)]
//!     name: String,
//!     team: ForeignKey<Team>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input, parse_quote};

mod model_derive;

/// Derive `Entity` and `Model` for a struct with named fields.
#[proc_macro_derive(Model, attributes(sqlmeta))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    expand(input, &parse_quote!(::sqlmeta_core))
}

/// `Model` as re-exported by the `sqlmeta` facade: the generated code goes
/// through `::sqlmeta::crates::core`, so the facade is the only dependency.
#[doc(hidden)]
#[proc_macro_derive(FacadeModel, attributes(sqlmeta))]
pub fn derive_facade_model(input: TokenStream) -> TokenStream {
    expand(input, &parse_quote!(::sqlmeta::crates::core))
}

fn expand(input: TokenStream, default_core: &syn::Path) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match model_derive::parse_model(&input) {
        Ok(def) => model_derive::generate_model_impl(&def, default_core).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
