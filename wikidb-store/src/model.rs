//! Page record

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A wiki page as stored.
///
/// `id` is assigned by the store and `name` is fixed at creation; only
/// `content` changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: i64,
    pub name: String,
    pub content: String,
}
