#![forbid(unsafe_code)]

/// `embed_migrations!` is a procedural macro and cannot track the migration
/// directory on its own, so cargo has to be told to rebuild the crate when
/// any migration file is added or changed.
fn main() {
    println!("cargo:rerun-if-changed=./migrations");
}
