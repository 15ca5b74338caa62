//! Staff user accounts
//!
//! Password hashes never leave this module in document reads; the only
//! typed read that carries the hash is [`UserRepo::credentials`].

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use serde::Deserialize;

use leasehub_core::filters::ci_contains;
use leasehub_core::models::User;
use leasehub_core::pagination::{Paginated, Pagination};

use super::{by_id, collect, on_duplicate, DbError};

/// Name and address used for notification emails
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContact {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

fn without_password() -> Document {
    doc! { "password": 0 }
}

pub struct UserRepo<'a> {
    db: &'a Database,
}

impl<'a> UserRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(User::COLLECTION)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Document>, DbError> {
        Ok(self
            .docs()
            .find_one(doc! { "email": email })
            .projection(without_password())
            .await?)
    }

    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<Document>, DbError> {
        Ok(self
            .docs()
            .find_one(by_id(id))
            .projection(without_password())
            .await?)
    }

    /// Users whose mobile number contains `mobile`.
    pub async fn search_by_mobile(
        &self,
        mobile: &str,
        page: Pagination,
    ) -> Result<Paginated<Document>, DbError> {
        let filter = doc! { "mobile": ci_contains(mobile) };
        let cursor = self
            .docs()
            .find(filter.clone())
            .projection(without_password())
            .sort(doc! { "createdAt": -1 })
            .skip(page.skip())
            .limit(page.limit())
            .await?;
        let items = collect(cursor).await?;
        let total = self.docs().count_documents(filter).await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Email or mobile already taken by another account.
    pub async fn exists(&self, email: &str, mobile: Option<&str>) -> Result<bool, DbError> {
        let mut any = vec![doc! { "email": email }];
        if let Some(mobile) = mobile {
            any.push(doc! { "mobile": mobile });
        }
        Ok(self.docs().find_one(doc! { "$or": any }).await?.is_some())
    }

    /// Insert a new user; returns the stored document without the hash.
    pub async fn create(&self, user: &User) -> Result<Document, DbError> {
        let result = self
            .db
            .collection::<User>(User::COLLECTION)
            .insert_one(user)
            .await
            .map_err(on_duplicate("user"))?;
        let id = super::inserted_id(&result.inserted_id)
            .ok_or_else(|| DbError::not_found("user", "inserted id"))?;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))
    }

    /// Apply a `$set` patch; `password` must already be hashed.
    pub async fn update(&self, id: ObjectId, mut patch: Document) -> Result<Option<Document>, DbError> {
        patch.remove("_id");
        patch.remove("createdAt");
        patch.insert("updatedAt", DateTime::now());
        Ok(self
            .docs()
            .find_one_and_update(by_id(id), doc! { "$set": patch })
            .projection(without_password())
            .return_document(ReturnDocument::After)
            .await
            .map_err(on_duplicate("user"))?)
    }

    /// Full record including the password hash, for login only.
    pub async fn credentials(&self, email: &str) -> Result<Option<User>, DbError> {
        Ok(self
            .db
            .collection::<User>(User::COLLECTION)
            .find_one(doc! { "email": email })
            .await?)
    }

    pub async fn contacts(&self, ids: &[ObjectId]) -> Result<Vec<UserContact>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .db
            .collection::<UserContact>(User::COLLECTION)
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .projection(doc! { "fullName": 1, "email": 1 })
            .await?;
        collect(cursor).await
    }

    pub async fn contact(&self, id: ObjectId) -> Result<Option<UserContact>, DbError> {
        Ok(self
            .db
            .collection::<UserContact>(User::COLLECTION)
            .find_one(by_id(id))
            .projection(doc! { "fullName": 1, "email": 1 })
            .await?)
    }

    /// Every user as a possible agent for spreadsheet imports.
    pub async fn all_contacts(&self) -> Result<Vec<UserContact>, DbError> {
        let cursor = self
            .db
            .collection::<UserContact>(User::COLLECTION)
            .find(doc! {})
            .projection(doc! { "fullName": 1, "email": 1 })
            .await?;
        collect(cursor).await
    }
}
