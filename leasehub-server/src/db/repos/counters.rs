//! Atomic sequences for human-readable ids

use bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use leasehub_core::models::Counter;

use super::DbError;

pub struct CounterRepo<'a> {
    db: &'a Database,
}

impl<'a> CounterRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn counters(&self) -> Collection<Counter> {
        self.db.collection(Counter::COLLECTION)
    }

    /// Next value of `name`, creating the sequence at 1.
    pub async fn next_value(&self, name: &str) -> Result<i64, DbError> {
        self.reserve(name, 1).await
    }

    /// Reserve `n` consecutive values and return the last one; the block
    /// is `last - n + 1 ..= last`.
    pub async fn reserve(&self, name: &str, n: i64) -> Result<i64, DbError> {
        let counter = self
            .counters()
            .find_one_and_update(
                doc! { "_id": name },
                doc! { "$inc": { "sequence_value": n } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| DbError::not_found("counter", name))?;
        Ok(counter.sequence_value)
    }
}
