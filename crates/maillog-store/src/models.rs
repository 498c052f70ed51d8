use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recorded charset and collation of one text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEncoding {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub charset: String,
    pub collation: String,
    pub updated_at: DateTime<Utc>,
}
