pub mod file;
pub mod memory;
pub mod postgres;

pub use memory::MemoryContentStore;
pub use postgres::PgContentStore;
