//! Lead workflows
//!
//! Creation and assignment write the lead and its notifications in one
//! transaction. Emails are not sent here: callers get the recipients back
//! and dispatch mail only after the commit succeeded.

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{ClientSession, Collection, Database};
use tracing::debug;

use leasehub_core::filters::unpack_facet;
use leasehub_core::models::lead::{
    assignment_message, new_lead_message, reply_message, UNSPECIFIED_PROPERTY,
};
use leasehub_core::models::{
    Lead, LeadStatus, Notification, NotificationKind, PropertyType, User, UserProfile,
};
use leasehub_core::pagination::{Paginated, Pagination};
use leasehub_core::roles::{check_assignment, check_status_update, LeadPolicyError, LeadScope, Requester, RoleKind};

use super::{
    abort, by_id, find_property_summary, property_name, DbError, NotificationRepo, ProfileRepo, RoleRepo,
    UserRepo, VisitorRepo,
};

/// Why a lead operation was refused
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    /// Request refused by the workflow; reported as a bad request.
    #[error("{0}")]
    Rejected(&'static str),

    #[error(transparent)]
    Policy(#[from] LeadPolicyError),

    /// A referenced document does not exist.
    #[error("{0}")]
    Missing(&'static str),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<mongodb::error::Error> for LeadError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Db(DbError::Mongo(err))
    }
}

/// A committed lead and who should hear about it.
#[derive(Debug, Clone)]
pub struct NewLeadOutcome {
    pub lead: Lead,
    pub property_name: String,
    /// Users that received an in-app notification, deduplicated.
    pub recipients: Vec<ObjectId>,
}

/// A committed reassignment.
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub lead: Document,
    pub property_name: String,
    pub agent_id: ObjectId,
}

fn dedup_in_order(ids: impl IntoIterator<Item = ObjectId>) -> Vec<ObjectId> {
    let mut seen = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// `$lookup` stages that replace `assignedAgentId` and `propertyId` with
/// summaries of the referenced documents, leaving the raw id when the
/// document is gone.
fn populate_stages() -> Vec<Document> {
    let mut stages = vec![
        doc! {
            "$lookup": {
                "from": User::COLLECTION,
                "localField": "assignedAgentId",
                "foreignField": "_id",
                "as": "agent",
                "pipeline": [ { "$project": { "fullName": 1, "email": 1, "mobile": 1, "profileImage": 1 } } ],
            }
        },
    ];
    let mut found = Vec::new();
    for (n, kind) in PropertyType::ALL.iter().enumerate() {
        let alias = format!("p{n}");
        stages.push(doc! {
            "$lookup": {
                "from": kind.collection(),
                "localField": "propertyId",
                "foreignField": "_id",
                "as": alias.clone(),
                "pipeline": [ { "$project": { "buildingName": 1, "location": 1, "type": 1 } } ],
            }
        });
        found.push(format!("${alias}"));
    }
    stages.push(doc! {
        "$addFields": {
            "assignedAgentId": {
                "$ifNull": [ { "$arrayElemAt": ["$agent", 0] }, "$assignedAgentId" ]
            },
            "propertyId": {
                "$ifNull": [ { "$arrayElemAt": [ { "$concatArrays": found }, 0 ] }, "$propertyId" ]
            },
        }
    });
    stages.push(doc! { "$unset": ["agent", "p0", "p1", "p2"] });
    stages
}

pub struct LeadRepo<'a> {
    db: &'a Database,
}

impl<'a> LeadRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn typed(&self) -> Collection<Lead> {
        self.db.collection(Lead::COLLECTION)
    }

    fn docs(&self) -> Collection<Document> {
        self.db.collection(Lead::COLLECTION)
    }

    pub async fn get(&self, id: ObjectId) -> Result<Option<Lead>, DbError> {
        Ok(self.typed().find_one(by_id(id)).await?)
    }

    /// Resolve a staff member and their role. A role name outside the
    /// hierarchy yields [`RoleKind::Other`], which grants the least access.
    pub async fn requester(&self, user_id: ObjectId) -> Result<(Requester, UserProfile), LeadError> {
        let profile = ProfileRepo::new(self.db)
            .by_user(user_id)
            .await?
            .ok_or(LeadError::Rejected("Requester profile not found"))?;
        let role = RoleRepo::new(self.db)
            .get_typed(profile.role_id)
            .await?
            .ok_or(LeadError::Rejected("Role not found for requester"))?;
        let requester = Requester {
            user_id,
            role: RoleKind::from_name(&role.role_name),
        };
        Ok((requester, profile))
    }

    /// Admins, the manager responsible for the property's city and the
    /// assigned agent.
    async fn new_lead_recipients(&self, city: Option<&str>, agent: ObjectId) -> Result<Vec<ObjectId>, DbError> {
        let roles = RoleRepo::new(self.db);
        let profiles = ProfileRepo::new(self.db);
        let mut recipients = Vec::new();

        if let Some(admin) = roles.by_name("admin").await? {
            if let Some(role_id) = admin.id {
                recipients.extend(profiles.users_with_role(role_id).await?);
            }
        }
        if let Some(city) = city.map(str::trim).filter(|c| !c.is_empty()) {
            if let Some(manager) = roles.by_name("manager").await? {
                if let Some(role_id) = manager.id {
                    recipients.extend(profiles.manager_for_city(role_id, city).await?);
                }
            }
        }
        recipients.push(agent);
        Ok(dedup_in_order(recipients))
    }

    /// Store a new lead and notify everyone concerned, atomically.
    pub async fn create(&self, mut lead: Lead) -> Result<NewLeadOutcome, LeadError> {
        let lead_id = ObjectId::new();
        lead.id = Some(lead_id);

        let summary = find_property_summary(self.db, lead.property_id).await?;
        let property_name = summary
            .as_ref()
            .and_then(|(_, doc)| doc.get_str("buildingName").ok())
            .unwrap_or(UNSPECIFIED_PROPERTY)
            .to_owned();
        let city = summary.as_ref().and_then(|(_, doc)| {
            doc.get_document("location")
                .ok()
                .and_then(|loc| loc.get_str("city").ok())
                .map(str::to_owned)
        });

        let visitor = VisitorRepo::new(self.db)
            .by_id(lead.visitor_id)
            .await?
            .ok_or(LeadError::Missing("Visitor not found."))?;
        let message = new_lead_message(visitor.display_name(), &visitor.email, &property_name);

        let recipients = self
            .new_lead_recipients(city.as_deref(), lead.assigned_agent_id)
            .await?;
        let now = DateTime::now();
        let notifications: Vec<Notification> = recipients
            .iter()
            .map(|user| {
                Notification::unread(*user, message.clone(), Some(lead_id), NotificationKind::Lead, now)
            })
            .collect();

        let mut session = self.db.client().start_session().await?;
        session.start_transaction().await?;
        match self.write_new_lead(&lead, &notifications, &mut session).await {
            Ok(()) => session.commit_transaction().await?,
            Err(err) => {
                abort(&mut session).await;
                return Err(err.into());
            }
        }

        debug!(lead_id = %lead_id, recipients = recipients.len(), "lead created");
        Ok(NewLeadOutcome {
            lead,
            property_name,
            recipients,
        })
    }

    async fn write_new_lead(
        &self,
        lead: &Lead,
        notifications: &[Notification],
        session: &mut ClientSession,
    ) -> Result<(), DbError> {
        self.typed().insert_one(lead).session(&mut *session).await?;
        NotificationRepo::new(self.db)
            .insert_in(notifications, session)
            .await
    }

    /// Hand a lead to another agent. Handlers may not assign; managers
    /// only to agents whose profile names them as manager.
    pub async fn assign(
        &self,
        lead_id: ObjectId,
        agent_id: ObjectId,
        requester_id: ObjectId,
    ) -> Result<AssignOutcome, LeadError> {
        let profiles = ProfileRepo::new(self.db);
        let requester_profile = profiles
            .by_user(requester_id)
            .await?
            .ok_or(LeadError::Rejected("Requester profile not found"))?;
        let requester_user = UserRepo::new(self.db)
            .contact(requester_id)
            .await?
            .ok_or(LeadError::Rejected("Requester not found"))?;
        let role = RoleRepo::new(self.db)
            .get_typed(requester_profile.role_id)
            .await?
            .ok_or(LeadError::Rejected("Role not found for requester"))?;
        let requester = Requester {
            user_id: requester_id,
            role: RoleKind::from_name(&role.role_name),
        };

        let target_manager = profiles.by_user(agent_id).await?.and_then(|p| p.manager_id);
        check_assignment(&requester, target_manager)?;

        let mut session = self.db.client().start_session().await?;
        session.start_transaction().await?;
        let written = self
            .write_assignment(lead_id, agent_id, &requester_user.full_name, &mut session)
            .await;
        let (lead, property_name) = match written {
            Ok(Some(done)) => {
                session.commit_transaction().await?;
                done
            }
            Ok(None) => {
                abort(&mut session).await;
                return Err(LeadError::Rejected("Lead not found or could not be updated."));
            }
            Err(err) => {
                abort(&mut session).await;
                return Err(err.into());
            }
        };

        debug!(lead_id = %lead_id, agent_id = %agent_id, "lead assigned");
        Ok(AssignOutcome {
            lead,
            property_name,
            agent_id,
        })
    }

    async fn write_assignment(
        &self,
        lead_id: ObjectId,
        agent_id: ObjectId,
        requester_name: &str,
        session: &mut ClientSession,
    ) -> Result<Option<(Document, String)>, DbError> {
        let updated = self
            .docs()
            .find_one_and_update(
                by_id(lead_id),
                doc! { "$set": { "assignedAgentId": agent_id, "updatedAt": DateTime::now() } },
            )
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await?;
        let Some(lead) = updated else {
            return Ok(None);
        };

        let property_name = match lead.get_object_id("propertyId") {
            Ok(property_id) => property_name(self.db, property_id).await?,
            Err(_) => None,
        }
        .unwrap_or_else(|| UNSPECIFIED_PROPERTY.to_owned());

        let notification = Notification::unread(
            agent_id,
            assignment_message(&property_name, requester_name),
            Some(lead_id),
            NotificationKind::Assignment,
            DateTime::now(),
        );
        NotificationRepo::new(self.db)
            .insert_in(std::slice::from_ref(&notification), session)
            .await?;
        Ok(Some((lead, property_name)))
    }

    /// Role-scoped listing, newest first, with agent and property
    /// summaries populated.
    pub async fn list_for(
        &self,
        requester_id: ObjectId,
        status: Option<LeadStatus>,
        page: Pagination,
    ) -> Result<Paginated<Document>, LeadError> {
        let (requester, _) = self.requester(requester_id).await?;
        let team = match requester.role {
            RoleKind::Manager => ProfileRepo::new(self.db).team_of(requester_id).await?,
            _ => Vec::new(),
        };
        let mut filter = LeadScope::for_requester(&requester, &team).filter();
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }

        let mut data = vec![
            doc! { "$skip": page.skip() as i64 },
            doc! { "$limit": page.limit() },
        ];
        data.extend(populate_stages());
        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$sort": { "createdAt": -1 } },
            doc! { "$facet": { "data": data, "total": [ { "$count": "count" } ] } },
        ];
        let mut cursor = self.docs().aggregate(pipeline).await.map_err(DbError::from)?;
        let (items, total) = unpack_facet(cursor.try_next().await.map_err(DbError::from)?);
        Ok(Paginated::new(items, total, page))
    }

    /// Change a lead's status within the requester's reach.
    pub async fn set_status(
        &self,
        lead_id: ObjectId,
        requester_id: ObjectId,
        status: LeadStatus,
    ) -> Result<Document, LeadError> {
        let (requester, _) = self.requester(requester_id).await?;
        let lead = self.get(lead_id).await?.ok_or(LeadError::Rejected("Lead not found"))?;
        let team = match requester.role {
            RoleKind::Manager => ProfileRepo::new(self.db).team_of(requester_id).await?,
            _ => Vec::new(),
        };
        check_status_update(&requester, lead.assigned_agent_id, &team)?;

        self.docs()
            .find_one_and_update(
                by_id(lead_id),
                doc! { "$set": { "status": status.as_str(), "updatedAt": DateTime::now() } },
            )
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(LeadError::Rejected("Lead not found"))
    }

    /// Message from staff to the lead's visitor, delivered as a
    /// notification addressed to the visitor.
    pub async fn reply(
        &self,
        lead_id: ObjectId,
        sender_id: ObjectId,
        message: &str,
    ) -> Result<Notification, LeadError> {
        let lead = self.get(lead_id).await?.ok_or(LeadError::Missing("Lead not found."))?;
        let sender = UserRepo::new(self.db)
            .contact(sender_id)
            .await?
            .ok_or(LeadError::Missing("Sender not found."))?;

        let mut notification = Notification::unread(
            lead.visitor_id,
            reply_message(&sender.full_name, message),
            Some(lead_id),
            NotificationKind::Reply,
            DateTime::now(),
        );
        notification.id = Some(ObjectId::new());
        NotificationRepo::new(self.db).insert(&notification).await?;
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_keep_first_occurrence() {
        let (a, b, c) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        assert_eq!(dedup_in_order([a, b, a, c, b]), vec![a, b, c]);
    }

    #[test]
    fn population_covers_every_property_collection() {
        let stages = populate_stages();
        let lookups: Vec<&str> = stages
            .iter()
            .filter_map(|s| s.get_document("$lookup").ok())
            .filter_map(|l| l.get_str("from").ok())
            .collect();
        assert_eq!(
            lookups,
            vec!["users", "managedoffices", "officespaces", "coworkingspaces"]
        );
    }

    #[test]
    fn policy_errors_keep_their_message() {
        let err = LeadError::from(LeadPolicyError::CannotAssign);
        assert_eq!(err.to_string(), "You do not have permission to assign leads.");
        assert_eq!(
            LeadError::Rejected("Lead not found").to_string(),
            "Lead not found"
        );
    }

    /// Staff of one office: an admin, a manager over Pune, and two
    /// handlers reporting to that manager.
    struct Office {
        db: Database,
        admin: ObjectId,
        manager: ObjectId,
        handler: ObjectId,
        agent: ObjectId,
        visitor: ObjectId,
        property: ObjectId,
    }

    async fn role(db: &Database, name: &str) -> ObjectId {
        let created = RoleRepo::new(db)
            .create(&leasehub_core::models::Role {
                id: None,
                role_name: name.to_owned(),
                menu_id: String::new(),
                is_verified: true,
                permissions: Default::default(),
                created_at: DateTime::now(),
                updated_at: DateTime::now(),
            })
            .await
            .unwrap();
        created.get_object_id("_id").unwrap()
    }

    async fn staff(
        db: &Database,
        name: &str,
        role_id: ObjectId,
        manager_id: Option<ObjectId>,
        managed_location: Option<&str>,
    ) -> ObjectId {
        let user_id = ObjectId::new();
        UserRepo::new(db)
            .create(&User {
                id: Some(user_id),
                full_name: name.to_owned(),
                email: format!("{}@leasehub.test", name.to_lowercase()),
                password: "unused".to_owned(),
                mobile: None,
                profile_image: None,
                is_active: true,
                is_terminated: false,
                created_at: DateTime::now(),
                updated_at: DateTime::now(),
            })
            .await
            .unwrap();
        ProfileRepo::new(db)
            .create(&UserProfile {
                id: None,
                user_id,
                role_id,
                manager_id,
                past_company: Default::default(),
                rating: 0.0,
                completed_leads_count: 0,
                managed_location: managed_location.map(str::to_owned),
                created_at: DateTime::now(),
                updated_at: DateTime::now(),
            })
            .await
            .unwrap();
        user_id
    }

    async fn office() -> Office {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
        let shared = crate::db::connect(&uri, "leasehub_test").await.expect("connect");
        let db = shared
            .client()
            .database(&format!("leasehub_test_leads_{}", ObjectId::new().to_hex()));
        crate::db::ensure_indexes(&db).await.unwrap();
        // collections must exist before a transaction writes to them
        for name in [Lead::COLLECTION, Notification::COLLECTION] {
            db.create_collection(name).await.unwrap();
        }

        let admin_role = role(&db, "admin").await;
        let manager_role = role(&db, "manager").await;
        let handler_role = role(&db, "handler").await;

        let admin = staff(&db, "Asha", admin_role, None, None).await;
        let manager = staff(&db, "Milan", manager_role, None, Some("Pune")).await;
        let handler = staff(&db, "Hari", handler_role, Some(manager), None).await;
        let agent = staff(&db, "Anya", handler_role, Some(manager), None).await;

        let visitor = VisitorRepo::new(&db)
            .create(&leasehub_core::models::Visitor {
                id: None,
                full_name: Some("Vera".to_owned()),
                email: "vera@visitor.test".to_owned(),
                mobile: None,
                city: Some("Pune".to_owned()),
                verified: true,
                created_at: DateTime::now(),
                updated_at: DateTime::now(),
            })
            .await
            .unwrap()
            .get_object_id("_id")
            .unwrap();

        let property = ObjectId::new();
        db.collection::<Document>(PropertyType::Managed.collection())
            .insert_one(doc! {
                "_id": property,
                "buildingName": "Skyline Tower",
                "location": { "city": "pune" },
            })
            .await
            .unwrap();

        Office {
            db,
            admin,
            manager,
            handler,
            agent,
            visitor,
            property,
        }
    }

    async fn notifications_for(db: &Database, lead_id: ObjectId) -> Vec<Notification> {
        let cursor = db
            .collection::<Notification>(Notification::COLLECTION)
            .find(doc! { "leadId": lead_id })
            .await
            .unwrap();
        cursor.try_collect().await.unwrap()
    }

    async fn new_lead(office: &Office, agent: ObjectId) -> NewLeadOutcome {
        LeadRepo::new(&office.db)
            .create(Lead {
                id: None,
                property_id: office.property,
                visitor_id: office.visitor,
                assigned_agent_id: agent,
                status: LeadStatus::New,
                message: Some("Need 20 seats".to_owned()),
                created_at: DateTime::now(),
                updated_at: DateTime::now(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_notifies_each_recipient_once() {
        let office = office().await;
        // the manager is both the city manager and the assigned agent
        let outcome = new_lead(&office, office.manager).await;
        let lead_id = outcome.lead.id.unwrap();

        assert_eq!(outcome.property_name, "Skyline Tower");
        assert_eq!(outcome.recipients, vec![office.admin, office.manager]);

        let stored = notifications_for(&office.db, lead_id).await;
        assert_eq!(stored.len(), outcome.recipients.len());
        let mut users: Vec<ObjectId> = stored.iter().map(|n| n.user_id).collect();
        users.sort();
        users.dedup();
        assert_eq!(users.len(), stored.len());
        assert!(stored
            .iter()
            .all(|n| n.kind == Some(NotificationKind::Lead) && n.message.contains("Vera")));

        office.db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_requires_a_known_visitor() {
        let office = office().await;
        let err = LeadRepo::new(&office.db)
            .create(Lead {
                id: None,
                property_id: office.property,
                visitor_id: ObjectId::new(),
                assigned_agent_id: office.agent,
                status: LeadStatus::New,
                message: None,
                created_at: DateTime::now(),
                updated_at: DateTime::now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::Missing("Visitor not found.")));
        let leads = office
            .db
            .collection::<Document>(Lead::COLLECTION)
            .count_documents(doc! {})
            .await
            .unwrap();
        assert_eq!(leads, 0);

        office.db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn handler_cannot_assign_and_lead_is_untouched() {
        let office = office().await;
        let lead_id = new_lead(&office, office.handler).await.lead.id.unwrap();
        let repo = LeadRepo::new(&office.db);

        let err = repo
            .assign(lead_id, office.agent, office.handler)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::Policy(LeadPolicyError::CannotAssign)));

        let lead = repo.get(lead_id).await.unwrap().unwrap();
        assert_eq!(lead.assigned_agent_id, office.handler);
        assert!(notifications_for(&office.db, lead_id)
            .await
            .iter()
            .all(|n| n.kind != Some(NotificationKind::Assignment)));

        office.db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn manager_assigns_within_team_only() {
        let office = office().await;
        let lead_id = new_lead(&office, office.handler).await.lead.id.unwrap();
        let repo = LeadRepo::new(&office.db);

        // the admin reports to nobody, so is outside the manager's team
        let err = repo
            .assign(lead_id, office.admin, office.manager)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::Policy(LeadPolicyError::OutsideTeam)));

        let outcome = repo.assign(lead_id, office.agent, office.manager).await.unwrap();
        assert_eq!(outcome.agent_id, office.agent);
        assert_eq!(outcome.property_name, "Skyline Tower");
        assert_eq!(
            outcome.lead.get_object_id("assignedAgentId").unwrap(),
            office.agent
        );

        let assignments: Vec<Notification> = notifications_for(&office.db, lead_id)
            .await
            .into_iter()
            .filter(|n| n.kind == Some(NotificationKind::Assignment))
            .collect();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].user_id, office.agent);
        assert!(assignments[0].message.ends_with("by Milan."));

        office.db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn assigning_a_missing_lead_is_rejected() {
        let office = office().await;
        let err = LeadRepo::new(&office.db)
            .assign(ObjectId::new(), office.agent, office.admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LeadError::Rejected("Lead not found or could not be updated.")
        ));
        let stray = office
            .db
            .collection::<Document>(Notification::COLLECTION)
            .count_documents(doc! { "type": "assignment" })
            .await
            .unwrap();
        assert_eq!(stray, 0);

        office.db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn status_updates_follow_the_reporting_line() {
        let office = office().await;
        let lead_id = new_lead(&office, office.agent).await.lead.id.unwrap();
        let repo = LeadRepo::new(&office.db);

        let err = repo
            .set_status(lead_id, office.handler, LeadStatus::Hold)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::Policy(LeadPolicyError::NotOwnLead)));

        let updated = repo
            .set_status(lead_id, office.manager, LeadStatus::Converted)
            .await
            .unwrap();
        assert_eq!(updated.get_str("status").unwrap(), "converted");

        office.db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn reply_reaches_the_visitor() {
        let office = office().await;
        let lead_id = new_lead(&office, office.agent).await.lead.id.unwrap();

        let sent = LeadRepo::new(&office.db)
            .reply(lead_id, office.agent, "Visit on Monday?")
            .await
            .unwrap();
        assert_eq!(sent.user_id, office.visitor);
        assert_eq!(sent.kind, Some(NotificationKind::Reply));
        assert_eq!(sent.message, "You have a new message from Anya: \"Visit on Monday?\"");

        office.db.drop().await.unwrap();
    }
}
