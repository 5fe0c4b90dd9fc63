//! Database repositories for each table.

pub mod values;

pub use values::ValuesRepo;
