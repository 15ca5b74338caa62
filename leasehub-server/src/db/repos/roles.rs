//! Roles and navigation menus

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use leasehub_core::filters::ci_exact;
use leasehub_core::models::{Menu, MenuEntry, Role};

use super::{by_id, collect, inserted_id, DbError};

pub struct RoleRepo<'a> {
    db: &'a Database,
}

impl<'a> RoleRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn typed(&self) -> Collection<Role> {
        self.db.collection(Role::COLLECTION)
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(Role::COLLECTION)
    }

    pub async fn list(&self) -> Result<Vec<Document>, DbError> {
        let cursor = self.docs().find(doc! {}).sort(doc! { "createdAt": 1 }).await?;
        collect(cursor).await
    }

    pub async fn get(&self, id: ObjectId) -> Result<Option<Document>, DbError> {
        Ok(self.docs().find_one(by_id(id)).await?)
    }

    pub async fn get_typed(&self, id: ObjectId) -> Result<Option<Role>, DbError> {
        Ok(self.typed().find_one(by_id(id)).await?)
    }

    /// Role whose name matches `name`, ignoring case.
    pub async fn by_name(&self, name: &str) -> Result<Option<Role>, DbError> {
        Ok(self.typed().find_one(doc! { "roleName": ci_exact(name) }).await?)
    }

    pub async fn create(&self, role: &Role) -> Result<Document, DbError> {
        let result = self.typed().insert_one(role).await?;
        let id = inserted_id(&result.inserted_id)
            .ok_or_else(|| DbError::not_found("role", "inserted id"))?;
        self.get(id).await?.ok_or_else(|| DbError::not_found("role", id))
    }

    /// `$set` only the fields present in `patch`.
    pub async fn update(&self, id: ObjectId, mut patch: Document) -> Result<Option<Document>, DbError> {
        patch.remove("_id");
        patch.remove("id");
        patch.remove("createdAt");
        patch.insert("updatedAt", DateTime::now());
        Ok(self
            .docs()
            .find_one_and_update(by_id(id), doc! { "$set": patch })
            .return_document(ReturnDocument::After)
            .await?)
    }
}

pub struct MenuRepo<'a> {
    db: &'a Database,
}

impl<'a> MenuRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(Menu::COLLECTION)
    }

    pub async fn list(&self) -> Result<Vec<Document>, DbError> {
        let cursor = self.docs().find(doc! {}).await?;
        collect(cursor).await
    }

    pub async fn get(&self, id: ObjectId) -> Result<Option<Document>, DbError> {
        Ok(self.docs().find_one(by_id(id)).await?)
    }

    /// Menu referenced by a role's `menuId`; `None` when the id is not
    /// an ObjectId or no menu has it.
    pub async fn for_role(&self, role: &Role) -> Result<Option<Document>, DbError> {
        match ObjectId::parse_str(role.menu_id.trim()) {
            Ok(id) => self.get(id).await,
            Err(_) => Ok(None),
        }
    }

    pub async fn create(&self, entries: Vec<MenuEntry>) -> Result<Document, DbError> {
        let now = DateTime::now();
        let menu = Menu {
            id: None,
            menus: entries,
            created_at: now,
            updated_at: now,
        };
        let result = self
            .db
            .collection::<Menu>(Menu::COLLECTION)
            .insert_one(&menu)
            .await?;
        let id = inserted_id(&result.inserted_id)
            .ok_or_else(|| DbError::not_found("menu", "inserted id"))?;
        self.get(id).await?.ok_or_else(|| DbError::not_found("menu", id))
    }

    /// Replace the entries of an existing menu document.
    pub async fn replace_entries(
        &self,
        id: ObjectId,
        entries: Vec<MenuEntry>,
    ) -> Result<Option<Document>, DbError> {
        let entries = bson::to_bson(&entries)?;
        Ok(self
            .docs()
            .find_one_and_update(
                by_id(id),
                doc! { "$set": { "menus": entries, "updatedAt": DateTime::now() } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect;

    async fn test_db() -> Database {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
        connect(&uri, "leasehub_test").await.expect("connect")
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn role_roundtrip_by_name() {
        let db = test_db().await;
        let repo = RoleRepo::new(&db);
        let now = DateTime::now();
        let name = format!("auditor-{}", ObjectId::new().to_hex());
        let created = repo
            .create(&Role {
                id: None,
                role_name: name.clone(),
                menu_id: ObjectId::new().to_hex(),
                is_verified: true,
                permissions: Default::default(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let found = repo.by_name(&name.to_uppercase()).await.unwrap().unwrap();
        assert_eq!(Some(found.id.unwrap()), created.get_object_id("_id").ok());

        let updated = repo
            .update(found.id.unwrap(), doc! { "isVerified": false })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get_bool("isVerified").ok(), Some(false));
    }
}
