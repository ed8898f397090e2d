pub mod in_memory;
pub mod postgres;
mod r#trait;

pub use in_memory::InMemoryStockEngine;
pub use postgres::PostgresStockEngine;
pub use r#trait::{EngineError, StockMutation};
