//! Visitors and pending one-time passwords

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use leasehub_core::filters::any_field_contains;
use leasehub_core::models::{Otp, Visitor};
use leasehub_core::pagination::{Paginated, Pagination};

use super::{by_id, collect, inserted_id, on_duplicate, DbError};

const SEARCH_FIELDS: [&str; 4] = ["fullName", "email", "mobile", "city"];

pub struct VisitorRepo<'a> {
    db: &'a Database,
}

impl<'a> VisitorRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn typed(&self) -> Collection<Visitor> {
        self.db.collection(Visitor::COLLECTION)
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(Visitor::COLLECTION)
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Document>, DbError> {
        let filter = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => any_field_contains(&SEARCH_FIELDS, term),
            None => doc! {},
        };
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

    pub async fn by_id(&self, id: ObjectId) -> Result<Option<Visitor>, DbError> {
        Ok(self.typed().find_one(by_id(id)).await?)
    }

    pub async fn doc_by_id(&self, id: ObjectId) -> Result<Option<Document>, DbError> {
        Ok(self.docs().find_one(by_id(id)).await?)
    }

    pub async fn by_email(&self, email: &str) -> Result<Option<Document>, DbError> {
        Ok(self.docs().find_one(doc! { "email": email }).await?)
    }

    pub async fn by_mobile(&self, mobile: &str) -> Result<Option<Document>, DbError> {
        Ok(self.docs().find_one(doc! { "mobile": mobile }).await?)
    }

    /// Email or mobile already registered.
    pub async fn exists(&self, email: &str, mobile: Option<&str>) -> Result<bool, DbError> {
        let mut any = vec![doc! { "email": email }];
        if let Some(mobile) = mobile {
            any.push(doc! { "mobile": mobile });
        }
        Ok(self.docs().find_one(doc! { "$or": any }).await?.is_some())
    }

    pub async fn create(&self, visitor: &Visitor) -> Result<Document, DbError> {
        let result = self
            .typed()
            .insert_one(visitor)
            .await
            .map_err(on_duplicate("visitor"))?;
        let id = inserted_id(&result.inserted_id)
            .ok_or_else(|| DbError::not_found("visitor", "inserted id"))?;
        self.doc_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("visitor", id))
    }

    /// `$set` a patch on the visitor matching `filter`.
    pub async fn update(&self, filter: Document, mut patch: Document) -> Result<Option<Document>, DbError> {
        patch.remove("_id");
        patch.remove("createdAt");
        if let Ok(email) = patch.get_str("email") {
            let email = leasehub_core::validation::normalize_email(email);
            patch.insert("email", email);
        }
        patch.insert("updatedAt", DateTime::now());
        Ok(self
            .docs()
            .find_one_and_update(filter, doc! { "$set": patch })
            .return_document(ReturnDocument::After)
            .await
            .map_err(on_duplicate("visitor"))?)
    }

    pub async fn mark_verified_by_mobile(&self, mobile: &str) -> Result<Option<Document>, DbError> {
        self.update(doc! { "mobile": mobile }, doc! { "verified": true })
            .await
    }
}

/// Which identifier an OTP is stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpKey<'k> {
    Email(&'k str),
    Mobile(&'k str),
}

impl OtpKey<'_> {
    fn filter(&self) -> Document {
        match self {
            Self::Email(email) => doc! { "email": *email },
            Self::Mobile(mobile) => doc! { "mobile": *mobile },
        }
    }
}

pub struct OtpRepo<'a> {
    db: &'a Database,
}

impl<'a> OtpRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn typed(&self) -> Collection<Otp> {
        self.db.collection(Otp::COLLECTION)
    }

    /// Store `code` for `key`, replacing any pending code and restarting
    /// its expiry clock.
    pub async fn upsert(&self, key: OtpKey<'_>, code: &str) -> Result<(), DbError> {
        self.typed()
            .update_one(
                key.filter(),
                doc! { "$set": { "otp": code, "createdAt": DateTime::now() } },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn find(&self, key: OtpKey<'_>) -> Result<Option<Otp>, DbError> {
        Ok(self.typed().find_one(key.filter()).await?)
    }

    pub async fn delete(&self, key: OtpKey<'_>) -> Result<(), DbError> {
        self.typed().delete_one(key.filter()).await?;
        Ok(())
    }
}
