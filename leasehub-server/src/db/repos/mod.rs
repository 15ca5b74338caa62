//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Borrows the `Database`; cheap to construct per request
//! - Returns documents already shaped for the wire where handlers only
//!   pass them through, typed models where logic needs the fields
//! - Uses a session transaction when a request writes more than one
//!   document

pub mod analytics;
pub mod counters;
pub mod leads;
pub mod master;
pub mod notifications;
pub mod profiles;
pub mod properties;
pub mod roles;
pub mod users;
pub mod visitors;
pub mod wishlists;

pub use analytics::{AgentPerformance, AnalyticsRepo, LeadSummary};
pub use counters::CounterRepo;
pub use leads::{AssignOutcome, LeadError, LeadRepo, NewLeadOutcome};
pub use master::MasterRepo;
pub use notifications::NotificationRepo;
pub use profiles::ProfileRepo;
pub use properties::{find_property_summary, property_name, search_all_properties, PropertyRepo};
pub use roles::{MenuRepo, RoleRepo};
pub use users::{UserContact, UserRepo};
pub use visitors::{OtpKey, OtpRepo, VisitorRepo};
pub use wishlists::WishlistRepo;

use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{ClientSession, Cursor};
use serde::de::DeserializeOwned;
use tracing::warn;

/// MongoDB duplicate-key error code
const DUPLICATE_KEY: i32 = 11000;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("could not encode document: {0}")]
    Bson(#[from] bson::ser::Error),

    #[error("could not decode document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("duplicate {resource}")]
    Duplicate { resource: &'static str },
}

impl DbError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// True when the write was rejected by a unique index.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        ErrorKind::InsertMany(e) => e
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|w| w.code == DUPLICATE_KEY)),
        _ => false,
    }
}

/// Map a duplicate-key failure to [`DbError::Duplicate`].
pub(crate) fn on_duplicate(resource: &'static str) -> impl Fn(mongodb::error::Error) -> DbError {
    move |err| {
        if is_duplicate_key(&err) {
            DbError::Duplicate { resource }
        } else {
            DbError::Mongo(err)
        }
    }
}

pub(crate) async fn collect<T>(cursor: Cursor<T>) -> Result<Vec<T>, DbError>
where
    T: DeserializeOwned + Send + Sync + Unpin,
{
    Ok(cursor.try_collect().await?)
}

pub(crate) fn by_id(id: ObjectId) -> Document {
    doc! { "_id": id }
}

/// `_id` of a freshly inserted document.
pub(crate) fn inserted_id(id: &bson::Bson) -> Option<ObjectId> {
    id.as_object_id()
}

/// Abort an open transaction; a failure here is only logged since the
/// caller is already returning the original error.
pub(crate) async fn abort(session: &mut ClientSession) {
    if let Err(err) = session.abort_transaction().await {
        warn!(error = %err, "failed to abort transaction");
    }
}
