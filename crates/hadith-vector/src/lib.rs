#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod ingest;
pub mod registry;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use ingest::{ingest_collection, IngestReport, DEFAULT_BATCH_SIZE};
pub use registry::LanceRegistry;
pub use search::LanceIndex;
pub use table::{open_db, table_exists};
pub use writer::CollectionWriter;
