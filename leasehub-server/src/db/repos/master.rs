//! Staff directory: profiles joined with their user accounts

use bson::{doc, oid::ObjectId, Document};
use mongodb::Database;

use leasehub_core::filters::{any_field_contains, ci_contains};
use leasehub_core::models::{Role, User, UserProfile};
use leasehub_core::pagination::{Paginated, Pagination};

use super::{collect, DbError};

const USER_SEARCH_FIELDS: [&str; 4] = ["fullName", "email", "mobile", "city"];

pub struct MasterRepo<'a> {
    db: &'a Database,
}

impl<'a> MasterRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Profile filter for a search term: the past company name, or any
    /// user whose name, email, mobile or city matches.
    async fn filter_for(&self, search: Option<&str>) -> Result<Document, DbError> {
        let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Document::new());
        };
        let cursor = self
            .db
            .collection::<Document>(User::COLLECTION)
            .find(any_field_contains(&USER_SEARCH_FIELDS, term))
            .projection(doc! { "_id": 1 })
            .await?;
        let user_ids: Vec<ObjectId> = collect(cursor)
            .await?
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect();
        Ok(doc! {
            "$or": [
                { "pastCompany.name": ci_contains(term) },
                { "userId": { "$in": user_ids } },
            ]
        })
    }

    /// Newest profiles first, `userId` replaced by the user summary.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Document>, DbError> {
        let filter = self.filter_for(search).await?;
        let profiles = self.db.collection::<Document>(UserProfile::COLLECTION);
        let pipeline = vec![
            doc! { "$match": filter.clone() },
            doc! { "$sort": { "createdAt": -1 } },
            doc! { "$skip": page.skip() as i64 },
            doc! { "$limit": page.limit() },
            doc! {
                "$lookup": {
                    "from": User::COLLECTION,
                    "localField": "userId",
                    "foreignField": "_id",
                    "as": "user",
                    "pipeline": [ { "$project": {
                        "fullName": 1, "email": 1, "mobile": 1, "profileImage": 1, "isActive": 1,
                    } } ],
                }
            },
            doc! {
                "$addFields": {
                    "userId": { "$ifNull": [ { "$arrayElemAt": ["$user", 0] }, "$userId" ] }
                }
            },
            doc! { "$unset": "user" },
        ];
        let items = collect(profiles.aggregate(pipeline).await?).await?;
        let total = profiles.count_documents(filter).await?;
        Ok(Paginated::new(items, total, page))
    }

    /// One flat record per profile:
    /// `{userId, fullName, email, mobile, profileImage, role, roleId, managerId, profileId}`.
    pub async fn flattened(&self) -> Result<Vec<Document>, DbError> {
        let pipeline = vec![
            doc! {
                "$lookup": {
                    "from": User::COLLECTION,
                    "localField": "userId",
                    "foreignField": "_id",
                    "as": "user",
                }
            },
            doc! {
                "$lookup": {
                    "from": Role::COLLECTION,
                    "localField": "roleId",
                    "foreignField": "_id",
                    "as": "role",
                }
            },
            doc! {
                "$project": {
                    "_id": 0,
                    "userId": { "$arrayElemAt": ["$user._id", 0] },
                    "fullName": { "$arrayElemAt": ["$user.fullName", 0] },
                    "email": { "$arrayElemAt": ["$user.email", 0] },
                    "mobile": { "$arrayElemAt": ["$user.mobile", 0] },
                    "profileImage": { "$arrayElemAt": ["$user.profileImage", 0] },
                    "role": { "$arrayElemAt": ["$role.roleName", 0] },
                    "roleId": { "$arrayElemAt": ["$role._id", 0] },
                    "managerId": "$managerId",
                    "profileId": "$_id",
                }
            },
        ];
        let cursor = self
            .db
            .collection::<Document>(UserProfile::COLLECTION)
            .aggregate(pipeline)
            .await?;
        collect(cursor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn empty_search_matches_everything() {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
        let db = connect(&uri, "leasehub_test").await.expect("connect");
        let repo = MasterRepo::new(&db);
        assert!(repo.filter_for(Some("  ")).await.unwrap().is_empty());

        let filter = repo.filter_for(Some("acme")).await.unwrap();
        assert_eq!(filter.get_array("$or").unwrap().len(), 2);
    }
}
