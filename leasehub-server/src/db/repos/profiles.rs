//! Staff profiles: role, manager and team lookups

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use leasehub_core::filters::ci_exact;
use leasehub_core::models::UserProfile;

use super::{collect, on_duplicate, DbError};

pub struct ProfileRepo<'a> {
    db: &'a Database,
}

impl<'a> ProfileRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn typed(&self) -> Collection<UserProfile> {
        self.db.collection(UserProfile::COLLECTION)
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(UserProfile::COLLECTION)
    }

    pub async fn by_user(&self, user_id: ObjectId) -> Result<Option<UserProfile>, DbError> {
        Ok(self.typed().find_one(doc! { "userId": user_id }).await?)
    }

    pub async fn doc_by_user(&self, user_id: ObjectId) -> Result<Option<Document>, DbError> {
        Ok(self.docs().find_one(doc! { "userId": user_id }).await?)
    }

    pub async fn create(&self, profile: &UserProfile) -> Result<Document, DbError> {
        self.typed()
            .insert_one(profile)
            .await
            .map_err(on_duplicate("profile"))?;
        self.doc_by_user(profile.user_id)
            .await?
            .ok_or_else(|| DbError::not_found("profile", profile.user_id))
    }

    pub async fn update_by_user(
        &self,
        user_id: ObjectId,
        mut patch: Document,
    ) -> Result<Option<Document>, DbError> {
        for key in ["_id", "userId", "createdAt"] {
            patch.remove(key);
        }
        patch.insert("updatedAt", DateTime::now());
        Ok(self
            .docs()
            .find_one_and_update(doc! { "userId": user_id }, doc! { "$set": patch })
            .return_document(ReturnDocument::After)
            .await?)
    }

    pub async fn set_role(&self, user_id: ObjectId, role_id: ObjectId) -> Result<Option<Document>, DbError> {
        self.update_by_user(user_id, doc! { "roleId": role_id }).await
    }

    /// User ids of the handlers reporting to `manager_id`.
    pub async fn team_of(&self, manager_id: ObjectId) -> Result<Vec<ObjectId>, DbError> {
        let cursor = self.typed().find(doc! { "managerId": manager_id }).await?;
        Ok(collect(cursor).await?.into_iter().map(|p| p.user_id).collect())
    }

    pub async fn users_with_role(&self, role_id: ObjectId) -> Result<Vec<ObjectId>, DbError> {
        let cursor = self.typed().find(doc! { "roleId": role_id }).await?;
        Ok(collect(cursor).await?.into_iter().map(|p| p.user_id).collect())
    }

    /// First profile with `role_id` whose `managedLocation` equals `city`,
    /// ignoring case.
    pub async fn manager_for_city(
        &self,
        role_id: ObjectId,
        city: &str,
    ) -> Result<Option<ObjectId>, DbError> {
        Ok(self
            .typed()
            .find_one(doc! { "roleId": role_id, "managedLocation": ci_exact(city) })
            .await?
            .map(|p| p.user_id))
    }
}
