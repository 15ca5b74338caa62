//! MongoDB client management
//!
//! One `Client` per process; the driver pools connections internally.

use std::time::Duration;

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use tokio::sync::OnceCell;

use leasehub_core::models::{
    Otp, PropertyType, User, UserProfile, Visitor, Wishlist,
};
use leasehub_core::otp::OTP_TTL;

static CLIENT: OnceCell<Client> = OnceCell::const_new();

/// Connect (once) and return the named database.
///
/// Later calls reuse the first client regardless of `uri`.
///
/// # Example
///
/// ```ignore
/// let db = connect("mongodb://localhost:27017", "leasehub").await?;
/// ```
pub async fn connect(uri: &str, database: &str) -> Result<Database, mongodb::error::Error> {
    let client = CLIENT
        .get_or_try_init(|| async {
            tracing::info!("connecting to MongoDB");
            Client::with_uri_str(uri).await
        })
        .await?;
    Ok(client.database(database))
}

/// Round-trip to the server.
pub async fn ping(db: &Database) -> Result<(), mongodb::error::Error> {
    db.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

fn unique(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn unique_sparse(keys: Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).sparse(true).build())
        .build()
}

/// Create the indexes the handlers rely on for uniqueness and expiry.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    db.collection::<Document>(User::COLLECTION)
        .create_index(unique(doc! { "email": 1 }))
        .await?;
    db.collection::<Document>(UserProfile::COLLECTION)
        .create_index(unique(doc! { "userId": 1 }))
        .await?;

    let visitors = db.collection::<Document>(Visitor::COLLECTION);
    visitors.create_index(unique(doc! { "email": 1 })).await?;
    visitors.create_index(unique_sparse(doc! { "mobile": 1 })).await?;

    for kind in PropertyType::ALL {
        db.collection::<Document>(kind.collection())
            .create_index(unique(doc! { "propertyId": 1 }))
            .await?;
    }

    db.collection::<Document>(Wishlist::COLLECTION)
        .create_index(unique(doc! { "visitorId": 1, "propertyId": 1 }))
        .await?;

    let otps = db.collection::<Document>(Otp::COLLECTION);
    otps.create_index(
        IndexModel::builder()
            .keys(doc! { "createdAt": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(OTP_TTL.as_secs()))
                    .build(),
            )
            .build(),
    )
    .await?;
    otps.create_index(unique_sparse(doc! { "email": 1 })).await?;
    otps.create_index(unique_sparse(doc! { "mobile": 1 })).await?;

    tracing::info!(database = %db.name(), "indexes ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a running MongoDB
    // Run with: MONGODB_URI=mongodb://... cargo test -p leasehub-server -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn connects_and_pings() {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI required");
        let db = connect(&uri, "leasehub_test").await.expect("connect failed");
        ping(&db).await.expect("ping failed");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn indexes_are_idempotent() {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI required");
        let db = connect(&uri, "leasehub_test").await.expect("connect failed");
        ensure_indexes(&db).await.expect("first run");
        ensure_indexes(&db).await.expect("second run");
    }
}
