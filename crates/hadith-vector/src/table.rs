//! LanceDB connection helpers and error mapping.
use anyhow::Result;
use hadith_core::error::ExternalError;
use lancedb::{connect, Connection};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// Missing tables and rejected inputs will not change on retry; everything else might.
pub(crate) fn to_external(collection: &str, e: lancedb::Error) -> ExternalError {
    match e {
        lancedb::Error::TableNotFound { .. } => {
            ExternalError::InvalidInput(format!("collection '{}' does not exist", collection))
        }
        lancedb::Error::InvalidInput { .. }
        | lancedb::Error::InvalidTableName { .. }
        | lancedb::Error::Schema { .. } => ExternalError::InvalidInput(format!("{}: {}", collection, e)),
        other if is_shape_mismatch(&other.to_string()) => {
            ExternalError::InvalidInput(format!("{}: {}", collection, other))
        }
        other => ExternalError::Unavailable(format!("{}: {}", collection, other)),
    }
}

// Lance reports vector width mismatches from inside the query planner, not as a typed variant.
fn is_shape_mismatch(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("dimension") || lower.contains("dim(") || lower.contains("invalid user input")
}
