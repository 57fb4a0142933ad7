//! DDL generation for table descriptors.
//!
//! Each dialect implements [`DdlGenerator`]; the shared column and index
//! rendering lives here.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDdlGenerator;
pub use postgres::PostgresDdlGenerator;
pub use sqlite::SqliteDdlGenerator;

use sqlmeta_core::{Dialect, FieldInfo, quote_ident};

use crate::descriptor::TableDescriptor;

/// Generates CREATE/DROP statements for one SQL dialect.
pub trait DdlGenerator: Send + Sync {
    /// Dialect the statements are written in.
    fn dialect(&self) -> Dialect;

    /// Column type of an ordinary (not database-assigned) field.
    fn column_type(&self, field: &FieldInfo) -> String;

    /// Type and key clause of an auto-increment primary key column.
    fn auto_increment_key(&self, field: &FieldInfo) -> String;

    /// Whether `REFERENCES` is written on the column. Otherwise a
    /// table-level `FOREIGN KEY` constraint is emitted.
    fn inline_references(&self) -> bool {
        true
    }

    /// `CREATE TABLE` followed by one `CREATE INDEX` per indexed or
    /// foreign-key column.
    fn create_table(&self, table: &TableDescriptor) -> Vec<String> {
        let mut stmts = vec![generate_create_table(self, table)];
        stmts.extend(
            table
                .local_fields()
                .iter()
                .filter(|f| (f.index || f.is_foreign_key()) && !f.primary_key)
                .map(|f| generate_create_index(table.table(), f.name, self.dialect())),
        );
        stmts
    }

    /// `DROP TABLE`.
    fn drop_table(&self, table: &TableDescriptor) -> Vec<String> {
        vec![format!(
            "DROP TABLE {}",
            quote_ident(table.table(), self.dialect())
        )]
    }
}

/// The generator for `dialect`.
pub fn generator_for(dialect: Dialect) -> &'static dyn DdlGenerator {
    match dialect {
        Dialect::Sqlite => &SqliteDdlGenerator,
        Dialect::Postgres => &PostgresDdlGenerator,
        Dialect::MySql => &MySqlDdlGenerator,
    }
}

/// `TEXT`, or `VARCHAR(n)` when the field is length-bounded.
pub(crate) fn text_type(field: &FieldInfo) -> String {
    match field.max_length {
        Some(len) => format!("VARCHAR({len})"),
        None => "TEXT".to_string(),
    }
}

fn references(field: &FieldInfo, dialect: Dialect) -> Option<String> {
    let table = field.foreign_model?;
    let mut clause = format!("REFERENCES {}", quote_ident(table, dialect));
    if let Some(column) = field.foreign_column {
        clause.push_str(&format!(" ({})", quote_ident(column, dialect)));
    }
    Some(clause)
}

/// One column definition.
fn generate_column<G: DdlGenerator + ?Sized>(generator: &G, field: &FieldInfo) -> String {
    let dialect = generator.dialect();
    let mut def = quote_ident(field.name, dialect);
    def.push(' ');

    if field.primary_key && field.auto_increment {
        def.push_str(&generator.auto_increment_key(field));
        return def;
    }

    def.push_str(&generator.column_type(field));
    if field.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if !field.nullable {
        def.push_str(" NOT NULL");
    }
    if field.unique && !field.primary_key {
        def.push_str(" UNIQUE");
    }
    if generator.inline_references() {
        if let Some(clause) = references(field, dialect) {
            def.push(' ');
            def.push_str(&clause);
        }
    }
    def
}

fn generate_create_table<G: DdlGenerator + ?Sized>(generator: &G, table: &TableDescriptor) -> String {
    let dialect = generator.dialect();
    let mut parts: Vec<String> = table
        .local_fields()
        .iter()
        .map(|f| generate_column(generator, f))
        .collect();

    if !generator.inline_references() {
        for field in table.local_fields() {
            if let Some(clause) = references(field, dialect) {
                parts.push(format!(
                    "FOREIGN KEY ({}) {clause}",
                    quote_ident(field.name, dialect)
                ));
            }
        }
    }

    format!(
        "CREATE TABLE {} ({})",
        quote_ident(table.table(), dialect),
        parts.join(", ")
    )
}

/// `CREATE INDEX "<table>_<column>" ON "<table>" ("<column>")`.
fn generate_create_index(table: &str, column: &str, dialect: Dialect) -> String {
    let name = quote_ident(&format!("{table}_{column}"), dialect);
    format!(
        "CREATE INDEX {name} ON {} ({})",
        quote_ident(table, dialect),
        quote_ident(column, dialect)
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlmeta_core::{FieldInfo, SqlType};

    use crate::descriptor::TableDescriptor;

    /// `player(id, name VARCHAR(40) indexed, score nullable, team_id -> team.id)`.
    pub fn player_table() -> TableDescriptor {
        TableDescriptor::from_parts(
            "player",
            "Player",
            None,
            vec![
                FieldInfo::new("id", SqlType::BigInt)
                    .primary_key(true)
                    .auto_increment(true),
                FieldInfo::new("name", SqlType::Text)
                    .max_length(40)
                    .index(true),
                FieldInfo::new("score", SqlType::Double).nullable(true),
                FieldInfo::new("team_id", SqlType::BigInt)
                    .foreign_key("team", "team")
                    .references("id"),
            ],
        )
        .unwrap()
    }

    /// `tag(label TEXT PRIMARY KEY, note TEXT UNIQUE)`.
    pub fn tag_table() -> TableDescriptor {
        TableDescriptor::from_parts(
            "tag",
            "Tag",
            None,
            vec![
                FieldInfo::new("label", SqlType::Text).primary_key(true),
                FieldInfo::new("note", SqlType::Text).unique(true),
            ],
        )
        .unwrap()
    }
}
