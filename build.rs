//! Build script keeping embedded migrations fresh.
//!
//! `embed_migrations!` reads the migration files at compile time, but Cargo
//! does not watch them on its own. The rerun directive makes incremental
//! builds notice new or edited migrations.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
