//! Build script keeping embedded migrations fresh.
//!
//! `embed_migrations!` reads the migration directory at compile time, and
//! Cargo has no way to notice edits to those SQL files on its own. Emitting
//! a `rerun-if-changed` directive makes incremental builds re-embed them.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
