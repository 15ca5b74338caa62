//! Per-user notifications

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{ClientSession, Collection, Database};

use leasehub_core::models::Notification;
use leasehub_core::pagination::{Paginated, Pagination};

use super::{collect, DbError};

pub struct NotificationRepo<'a> {
    db: &'a Database,
}

impl<'a> NotificationRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn typed(&self) -> Collection<Notification> {
        self.db.collection(Notification::COLLECTION)
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(Notification::COLLECTION)
    }

    /// Newest first.
    pub async fn list(&self, user_id: ObjectId, page: Pagination) -> Result<Paginated<Document>, DbError> {
        let filter = doc! { "userId": user_id };
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

    pub async fn insert(&self, notification: &Notification) -> Result<(), DbError> {
        self.typed().insert_one(notification).await?;
        Ok(())
    }

    /// Insert inside an open transaction.
    pub async fn insert_in(
        &self,
        notifications: &[Notification],
        session: &mut ClientSession,
    ) -> Result<(), DbError> {
        if notifications.is_empty() {
            return Ok(());
        }
        self.typed()
            .insert_many(notifications)
            .session(session)
            .await?;
        Ok(())
    }

    /// Mark the given notifications read; returns how many changed.
    pub async fn mark_read(&self, ids: &[ObjectId]) -> Result<u64, DbError> {
        let result = self
            .docs()
            .update_many(
                doc! { "_id": { "$in": ids.to_vec() } },
                doc! { "$set": { "isRead": true, "updatedAt": DateTime::now() } },
            )
            .await?;
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect;
    use leasehub_core::models::NotificationKind;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn list_and_mark_read() {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
        let db = connect(&uri, "leasehub_test").await.expect("connect");
        let repo = NotificationRepo::new(&db);
        let user = ObjectId::new();

        for n in 0..3 {
            repo.insert(&Notification::unread(
                user,
                format!("message {n}"),
                None,
                NotificationKind::Lead,
                DateTime::now(),
            ))
            .await
            .unwrap();
        }

        let page = repo.list(user, Pagination::new(1, 2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);

        let ids: Vec<ObjectId> = page
            .items
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect();
        assert_eq!(repo.mark_read(&ids).await.unwrap(), 2);
    }
}
