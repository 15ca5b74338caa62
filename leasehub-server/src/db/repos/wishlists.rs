//! Visitor wishlists

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use mongodb::{ClientSession, Collection, Database};

use leasehub_core::models::{PropertyType, Wishlist};

use super::{abort, collect, DbError};

/// Shown in place of a property that no longer exists.
fn unknown_property() -> Document {
    doc! {
        "buildingName": "Unknown",
        "location": Bson::Null,
        "images": Bson::Null,
        "type": Bson::Null,
    }
}

fn entry(visitor_id: ObjectId, property_id: ObjectId) -> Document {
    doc! { "visitorId": visitor_id, "propertyId": property_id }
}

pub struct WishlistRepo<'a> {
    db: &'a Database,
}

impl<'a> WishlistRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(Wishlist::COLLECTION)
    }

    /// Add an entry; adding it again only touches `updatedAt`.
    pub async fn add(&self, visitor_id: ObjectId, property_id: ObjectId) -> Result<Document, DbError> {
        let mut session = self.db.client().start_session().await?;
        session.start_transaction().await?;
        match self.upsert(visitor_id, property_id, &mut session).await {
            Ok(Some(doc)) => {
                session.commit_transaction().await?;
                Ok(doc)
            }
            Ok(None) => {
                abort(&mut session).await;
                Err(DbError::not_found("wishlist", visitor_id))
            }
            Err(err) => {
                abort(&mut session).await;
                Err(err)
            }
        }
    }

    async fn upsert(
        &self,
        visitor_id: ObjectId,
        property_id: ObjectId,
        session: &mut ClientSession,
    ) -> Result<Option<Document>, DbError> {
        let now = DateTime::now();
        self.docs()
            .update_one(
                entry(visitor_id, property_id),
                doc! {
                    "$set": { "updatedAt": now },
                    "$setOnInsert": { "createdAt": now },
                },
            )
            .upsert(true)
            .session(&mut *session)
            .await?;
        Ok(self
            .docs()
            .find_one(entry(visitor_id, property_id))
            .session(session)
            .await?)
    }

    /// Remove an entry, returning what was deleted.
    pub async fn remove(
        &self,
        visitor_id: ObjectId,
        property_id: ObjectId,
    ) -> Result<Option<Document>, DbError> {
        let mut session = self.db.client().start_session().await?;
        session.start_transaction().await?;
        let deleted = self
            .docs()
            .find_one_and_delete(entry(visitor_id, property_id))
            .session(&mut session)
            .await;
        match deleted {
            Ok(Some(doc)) => {
                session.commit_transaction().await?;
                Ok(Some(doc))
            }
            Ok(None) => {
                abort(&mut session).await;
                Ok(None)
            }
            Err(err) => {
                abort(&mut session).await;
                Err(err.into())
            }
        }
    }

    /// Entries of a visitor, each with a `property` summary.
    pub async fn list(&self, visitor_id: ObjectId) -> Result<Vec<Document>, DbError> {
        let mut pipeline = vec![
            doc! { "$match": { "visitorId": visitor_id } },
            doc! { "$sort": { "createdAt": -1 } },
        ];
        let mut found = Vec::new();
        for (n, kind) in PropertyType::ALL.iter().enumerate() {
            let alias = format!("p{n}");
            pipeline.push(doc! {
                "$lookup": {
                    "from": kind.collection(),
                    "localField": "propertyId",
                    "foreignField": "_id",
                    "as": alias.clone(),
                    "pipeline": [ { "$project": { "buildingName": 1, "location": 1, "images": 1, "type": 1 } } ],
                }
            });
            found.push(format!("${alias}"));
        }
        pipeline.push(doc! {
            "$addFields": {
                "property": {
                    "$ifNull": [
                        { "$arrayElemAt": [ { "$concatArrays": found }, 0 ] },
                        unknown_property(),
                    ]
                }
            }
        });
        pipeline.push(doc! { "$unset": ["p0", "p1", "p2"] });

        let cursor = self.docs().aggregate(pipeline).await?;
        collect(cursor).await
    }

    pub async fn contains(&self, visitor_id: ObjectId, property_id: ObjectId) -> Result<bool, DbError> {
        Ok(self
            .docs()
            .find_one(entry(visitor_id, property_id))
            .await?
            .is_some())
    }
}
