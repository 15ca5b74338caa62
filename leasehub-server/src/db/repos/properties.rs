//! Property listings, one collection per office subtype
//!
//! [`PropertyRepo`] is generic over the subtype; the handful of queries
//! that span all three collections are free functions.

use std::marker::PhantomData;

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use tracing::warn;

use leasehub_core::filters::{ci_exact, core_list_filter, unpack_facet, AllPropertiesSearch, PropertySearch};
use leasehub_core::import::RowIssue;
use leasehub_core::models::property::summary_projection;
use leasehub_core::models::{Property, PropertyKind, PropertyType, User};
use leasehub_core::pagination::{Paginated, Pagination};

use super::{by_id, collect, inserted_id, on_duplicate, DbError};

/// Replace `assigned_agent` with `{_id, fullName, email}` when the user
/// still exists.
fn populate_agent() -> [Document; 3] {
    [
        doc! {
            "$lookup": {
                "from": User::COLLECTION,
                "localField": "assigned_agent",
                "foreignField": "_id",
                "as": "agent",
                "pipeline": [ { "$project": { "fullName": 1, "email": 1 } } ],
            }
        },
        doc! {
            "$addFields": {
                "assigned_agent": {
                    "$ifNull": [ { "$arrayElemAt": ["$agent", 0] }, "$assigned_agent" ]
                }
            }
        },
        doc! { "$unset": "agent" },
    ]
}

pub struct PropertyRepo<'a, K: PropertyKind> {
    db: &'a Database,
    kind: PhantomData<K>,
}

impl<'a, K: PropertyKind> PropertyRepo<'a, K> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            kind: PhantomData,
        }
    }

    fn typed(&self) -> Collection<Property<K>> {
        self.db.collection(K::collection())
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(K::collection())
    }

    /// Newest first, optionally narrowed by name, city or address.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Document>, DbError> {
        let filter = core_list_filter(search);
        let cursor = self
            .docs()
            .find(filter.clone())
            .sort(doc! { "createdAt": -1 })
            .skip(page.skip())
            .limit(page.limit())
            .await?;
        let items = collect(cursor).await?;
        let total = self.docs().count_documents(filter).await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn search(&self, search: &PropertySearch) -> Result<Paginated<Document>, DbError> {
        let page = search.pagination::<K>();
        let mut cursor = self.docs().aggregate(search.pipeline::<K>(page)).await?;
        let (items, total) = unpack_facet(cursor.try_next().await?);
        Ok(Paginated::new(items, total, page))
    }

    /// Document with the assigned agent populated.
    pub async fn get(&self, id: ObjectId) -> Result<Option<Document>, DbError> {
        let mut pipeline = vec![doc! { "$match": by_id(id) }];
        pipeline.extend(populate_agent());
        let mut cursor = self.docs().aggregate(pipeline).await?;
        Ok(cursor.try_next().await?)
    }

    pub async fn get_typed(&self, id: ObjectId) -> Result<Option<Property<K>>, DbError> {
        Ok(self.typed().find_one(by_id(id)).await?)
    }

    /// A listing with the same building name and address is already stored.
    pub async fn exists_same(&self, building_name: &str, address: Option<&str>) -> Result<bool, DbError> {
        let mut filter = doc! { "buildingName": ci_exact(building_name) };
        if let Some(address) = address.map(str::trim).filter(|a| !a.is_empty()) {
            filter.insert("location.address", ci_exact(address));
        }
        Ok(self.docs().find_one(filter).await?.is_some())
    }

    pub async fn insert(&self, property: &Property<K>) -> Result<Document, DbError> {
        let result = self
            .typed()
            .insert_one(property)
            .await
            .map_err(on_duplicate("property"))?;
        let id = inserted_id(&result.inserted_id)
            .ok_or_else(|| DbError::not_found("property", "inserted id"))?;
        self.docs()
            .find_one(by_id(id))
            .await?
            .ok_or_else(|| DbError::not_found("property", id))
    }

    /// `$set` a patch already passed through
    /// `leasehub_core::models::property::sanitize_update`.
    pub async fn update(&self, id: ObjectId, patch: Document) -> Result<Option<Document>, DbError> {
        Ok(self
            .docs()
            .find_one_and_update(by_id(id), doc! { "$set": patch })
            .return_document(ReturnDocument::After)
            .await?)
    }

    pub async fn delete(&self, id: ObjectId) -> Result<Option<Document>, DbError> {
        Ok(self.docs().find_one_and_delete(by_id(id)).await?)
    }

    pub async fn deactivate(&self, id: ObjectId) -> Result<Option<Document>, DbError> {
        let now = DateTime::now();
        Ok(self
            .docs()
            .find_one_and_update(
                by_id(id),
                doc! { "$set": { "is_active": false, "last_updated": now, "updatedAt": now } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    /// Every stored building name for this subtype.
    pub async fn existing_names(&self) -> Result<Vec<String>, DbError> {
        let names = self.docs().distinct("buildingName", doc! {}).await?;
        Ok(names
            .into_iter()
            .filter_map(|name| name.as_str().map(str::to_owned))
            .collect())
    }

    /// Unordered bulk insert. Rows rejected by the database are returned
    /// as issues against their spreadsheet line; the rest stay inserted.
    pub async fn insert_many(
        &self,
        rows: Vec<(u32, Property<K>)>,
    ) -> Result<(usize, Vec<RowIssue>), DbError> {
        if rows.is_empty() {
            return Ok((0, Vec::new()));
        }
        let (lines, properties): (Vec<u32>, Vec<Property<K>>) = rows.into_iter().unzip();
        let names: Vec<String> = properties.iter().map(|p| p.building_name.clone()).collect();

        match self.typed().insert_many(&properties).ordered(false).await {
            Ok(result) => Ok((result.inserted_ids.len(), Vec::new())),
            Err(err) => {
                let write_errors = match err.kind.as_ref() {
                    ErrorKind::InsertMany(e) if e.write_concern_error.is_none() => {
                        e.write_errors.clone()
                    }
                    _ => None,
                };
                let Some(write_errors) = write_errors else {
                    return Err(DbError::Mongo(err));
                };
                warn!(rejected = write_errors.len(), "bulk insert partially rejected");
                let issues: Vec<RowIssue> = write_errors
                    .iter()
                    .filter_map(|w| {
                        let line = *lines.get(w.index)?;
                        Some(RowIssue::new(line, names.get(w.index).cloned(), w.message.clone()))
                    })
                    .collect();
                Ok((properties.len() - write_errors.len(), issues))
            }
        }
    }
}

/// Find a property by `_id` in whichever collection holds it, returning
/// its subtype and a summary projection.
pub async fn find_property_summary(
    db: &Database,
    id: ObjectId,
) -> Result<Option<(PropertyType, Document)>, DbError> {
    for kind in PropertyType::ALL {
        let found = db
            .collection::<Document>(kind.collection())
            .find_one(by_id(id))
            .projection(summary_projection())
            .await?;
        if let Some(doc) = found {
            return Ok(Some((kind, doc)));
        }
    }
    Ok(None)
}

/// Building name for messages; `None` when no collection has the id.
pub async fn property_name(db: &Database, id: ObjectId) -> Result<Option<String>, DbError> {
    Ok(find_property_summary(db, id)
        .await?
        .and_then(|(_, doc)| doc.get_str("buildingName").ok().map(str::to_owned)))
}

/// Search all three subtypes at once.
pub async fn search_all_properties(
    db: &Database,
    search: &AllPropertiesSearch,
    page: Pagination,
) -> Result<Paginated<Document>, DbError> {
    let mut cursor = db
        .collection::<Document>(PropertyType::CoWorking.collection())
        .aggregate(search.pipeline(page))
        .await?;
    let (items, total) = unpack_facet(cursor.try_next().await?);
    Ok(Paginated::new(items, total, page))
}
