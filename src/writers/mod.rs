pub mod parquet_writer;
pub mod table_writer;

pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
pub use table_writer::{OutputFormat, TableWriter};
