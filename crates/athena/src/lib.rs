#![doc(html_no_source)]

mod athena;
pub use athena::Athena;

// Reexport all crates
pub use athena_asset_database;
pub use athena_model;
pub use athena_procedural;
pub use athena_profiling;
pub use athena_rigging;
pub use athena_transform;
