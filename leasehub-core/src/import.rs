//! Bulk import of spreadsheet rows
//!
//! Rows are checked in order: building name, office type, duplicates
//! (stored, then within the file), agent, availability, images. The first
//! failing check decides the row's fate; nothing is written here.

use std::collections::{HashMap, HashSet};

use bson::{oid::ObjectId, DateTime, Document};
use serde::Serialize;
use tracing::debug;

use crate::models::{
    AvailabilityStatus, Contact, FieldSpec, FieldType, Location, PropertyDraft, PropertyKind,
    PropertyType, PublicFacilities, Transit,
};
use crate::sheet::SheetRow;
use crate::validation::{normalize_email, IMAGE_URL_RE, MAX_IMAGES};

pub const MISSING_BUILDING: &str = "Missing buildingName";
pub const EXISTS_IN_DB: &str = "Building already exists (DB)";
pub const DUPLICATE_IN_FILE: &str = "Duplicate within uploaded file";
pub const AGENT_NOT_FOUND: &str =
    "Assigned agent not found. Provide valid assigned_agent_email or assigned_agent (ObjectId).";

/// Lookups the reconciler needs from the database.
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    /// Lower-cased email → user id
    pub agents_by_email: HashMap<String, ObjectId>,
    /// Every known user id
    pub agent_ids: HashSet<ObjectId>,
    /// Lower-cased, trimmed building names already stored for this kind
    pub existing_names: HashSet<String>,
}

impl ImportContext {
    pub fn with_existing_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.existing_names
            .extend(names.into_iter().map(|n| name_key(n.as_ref())));
        self
    }

    pub fn with_agent(mut self, id: ObjectId, email: &str) -> Self {
        self.agents_by_email.insert(normalize_email(email), id);
        self.agent_ids.insert(id);
        self
    }

    fn resolve_agent(&self, row: &SheetRow) -> Option<ObjectId> {
        row.text("assigned_agent_email")
            .and_then(|email| self.agents_by_email.get(&normalize_email(&email)).copied())
            .or_else(|| {
                row.text("assigned_agent")
                    .and_then(|raw| ObjectId::parse_str(raw.trim()).ok())
                    .filter(|id| self.agent_ids.contains(id))
            })
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A rejected or skipped row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIssue {
    pub row: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_name: Option<String>,
    pub reason: String,
}

impl RowIssue {
    pub fn new(row: u32, building_name: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            row,
            building_name,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcceptedRow<K: PropertyKind> {
    pub row: u32,
    pub draft: PropertyDraft<K>,
}

/// What to insert and what to report back.
#[derive(Debug, Clone)]
pub struct ImportPlan<K: PropertyKind> {
    pub accepted: Vec<AcceptedRow<K>>,
    pub duplicates: Vec<RowIssue>,
    pub failed: Vec<RowIssue>,
}

impl<K: PropertyKind> ImportPlan<K> {
    /// Final report once `inserted` rows reached the database; rows that
    /// failed at insert time are appended to `failed`.
    pub fn results(self, inserted: usize, insert_failures: Vec<RowIssue>) -> ImportResults {
        let mut failed = self.failed;
        failed.extend(insert_failures);
        failed.sort_by_key(|issue| issue.row);
        ImportResults {
            successfully_inserted: inserted,
            duplicates_found: self.duplicates.len(),
            failed_entries: failed.len(),
            duplicates: self.duplicates,
            failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResults {
    pub successfully_inserted: usize,
    pub duplicates_found: usize,
    pub failed_entries: usize,
    pub duplicates: Vec<RowIssue>,
    pub failed: Vec<RowIssue>,
}

enum Outcome<K: PropertyKind> {
    Accepted(PropertyDraft<K>),
    Duplicate(String),
    Failed(String),
}

/// Sort spreadsheet rows into inserts, duplicates and failures.
pub fn reconcile<K: PropertyKind>(rows: &[SheetRow], ctx: &ImportContext) -> ImportPlan<K> {
    let mut plan = ImportPlan {
        accepted: Vec::new(),
        duplicates: Vec::new(),
        failed: Vec::new(),
    };
    let mut seen: HashSet<String> = HashSet::new();

    for row in rows {
        let name = row.text("buildingName");
        match check_row::<K>(row, name.as_deref(), ctx, &mut seen) {
            Outcome::Accepted(draft) => plan.accepted.push(AcceptedRow { row: row.line, draft }),
            Outcome::Duplicate(reason) => {
                plan.duplicates.push(RowIssue::new(row.line, name, reason))
            }
            Outcome::Failed(reason) => plan.failed.push(RowIssue::new(row.line, name, reason)),
        }
    }

    debug!(
        kind = %K::TYPE,
        accepted = plan.accepted.len(),
        duplicates = plan.duplicates.len(),
        failed = plan.failed.len(),
        "reconciled import rows"
    );
    plan
}

fn check_row<K: PropertyKind>(
    row: &SheetRow,
    name: Option<&str>,
    ctx: &ImportContext,
    seen: &mut HashSet<String>,
) -> Outcome<K> {
    let Some(name) = name else {
        return Outcome::Failed(MISSING_BUILDING.to_owned());
    };

    let raw_type = row.text("type").unwrap_or_default();
    if PropertyType::parse(&raw_type) != Some(K::TYPE) {
        return Outcome::Failed(format!(
            "Invalid office type '{}'. Expected '{}'.",
            raw_type,
            K::TYPE.tag()
        ));
    }

    let key = name_key(name);
    if ctx.existing_names.contains(&key) {
        return Outcome::Duplicate(EXISTS_IN_DB.to_owned());
    }
    if seen.contains(&key) {
        return Outcome::Duplicate(DUPLICATE_IN_FILE.to_owned());
    }

    let Some(assigned_agent) = ctx.resolve_agent(row) else {
        return Outcome::Failed(AGENT_NOT_FOUND.to_owned());
    };

    let availability_status = match row.text("availability_status") {
        None => AvailabilityStatus::default(),
        Some(raw) => match AvailabilityStatus::parse_lenient(&raw) {
            Some(status) => status,
            None => {
                return Outcome::Failed(format!(
                    "Invalid availability_status '{}'. Allowed: {}",
                    raw,
                    AvailabilityStatus::allowed_list()
                ))
            }
        },
    };

    let images = row.list("images");
    if images.len() > MAX_IMAGES {
        return Outcome::Failed(format!("More than {MAX_IMAGES} images provided"));
    }
    if let Some(bad) = images.iter().find(|img| !IMAGE_URL_RE.is_match(img)) {
        return Outcome::Failed(format!("Invalid image URL: '{bad}'"));
    }

    let general_info = match sub_document(row, K::GENERAL_FIELDS) {
        Ok(info) => info,
        Err(e) => return Outcome::Failed(format!("Invalid generalInfo: {e}")),
    };
    let amenities = match sub_document(row, K::AMENITY_FIELDS) {
        Ok(amenities) => amenities,
        Err(e) => return Outcome::Failed(format!("Invalid amenities: {e}")),
    };

    // Only accepted rows claim the name; a rejected row must not shadow a
    // later valid one.
    seen.insert(key);

    Outcome::Accepted(PropertyDraft {
        building_name: name.to_owned(),
        general_info,
        amenities,
        location: location(row),
        transit: Transit {
            metro_stations: row.list("metroStations"),
            bus_stations: row.list("busStations"),
            train_stations: row.list("trainStations"),
            airports: row.list("airports"),
        },
        public_facilities: PublicFacilities {
            hospitals: match row.list("hospitals") {
                list if list.is_empty() => row.list("hospital"),
                list => list,
            },
            restaurants: row.list("restaurants"),
            atms: row.list("atms"),
        },
        images,
        availability_status,
        is_active: row.flag("is_active").unwrap_or(true),
        availability_date: row.date("availability_date").map(DateTime::from_chrono),
        assigned_agent,
        additional_contacts: contact(row).into_iter().collect(),
        internal_notes: row.text("internal_notes"),
    })
}

/// Fill a `generalInfo` / `amenities` struct from its flat columns.
fn sub_document<T: serde::de::DeserializeOwned>(
    row: &SheetRow,
    fields: &[FieldSpec],
) -> Result<T, bson::de::Error> {
    let mut doc = Document::new();
    for spec in fields {
        let value = match spec.ty {
            FieldType::Text => row.text(spec.key).map(bson::Bson::from),
            FieldType::Number => row.number(spec.key).map(bson::Bson::from),
            FieldType::Flag => row.flag(spec.key).map(bson::Bson::from),
        };
        if let Some(value) = value {
            doc.insert(spec.key, value);
        }
    }
    bson::from_document(doc)
}

fn location(row: &SheetRow) -> Location {
    Location {
        address: row.text("address"),
        city: row.text("city"),
        zone: row.text("zone"),
        location_of_property: row.text("locationOfProperty"),
        link: row.text("link"),
        area_sqft: row.number("areaSqft"),
    }
}

fn contact(row: &SheetRow) -> Option<Contact> {
    let contact = Contact {
        name: row.text("additionalContactName"),
        phone: row.text("additionalContactPhone"),
        email: row.text("additionalContactEmail"),
        role: row.text("additionalContactRole"),
    };
    let any = contact.name.is_some()
        || contact.phone.is_some()
        || contact.email.is_some()
        || contact.role.is_some();
    any.then_some(contact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ManagedOffice, OfficeSpace};
    use pretty_assertions::assert_eq;

    fn row(line: u32, cells: &[(&str, &str)]) -> SheetRow {
        SheetRow::new(
            line,
            cells.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
        )
    }

    fn context(agent: ObjectId) -> ImportContext {
        ImportContext::default()
            .with_agent(agent, "Agent@Leasehub.test")
            .with_existing_names(["Stored Tower"])
    }

    #[test]
    fn sorts_rows() {
        let agent = ObjectId::new();
        let ctx = context(agent);
        let hex = agent.to_hex();
        let rows = vec![
            row(2, &[("buildingName", "Orion"), ("type", "Manage"), ("assigned_agent_email", "agent@leasehub.test"), ("seaterOffered", "40"), ("rentPerSeat", "Rs.8,500/- Per seat"), ("wifi", "yes"), ("city", "Pune"), ("metroStations", "Baner, Aundh")]),
            row(3, &[("buildingName", "orion "), ("type", "managed"), ("assigned_agent", hex.as_str())]),
            row(4, &[("buildingName", "stored tower"), ("type", "managed")]),
            row(5, &[("type", "managed")]),
            row(6, &[("buildingName", "Nova"), ("type", "office")]),
            row(7, &[("buildingName", "Vega"), ("type", "managed"), ("assigned_agent_email", "nobody@x.test")]),
        ];

        let plan = reconcile::<ManagedOffice>(&rows, &ctx);

        assert_eq!(plan.accepted.len(), 1);
        let accepted = &plan.accepted[0];
        assert_eq!(accepted.row, 2);
        assert_eq!(accepted.draft.assigned_agent, agent);
        assert_eq!(accepted.draft.general_info.seater_offered, Some(40.0));
        assert_eq!(
            accepted.draft.general_info.rent_per_seat.as_deref(),
            Some("Rs.8,500/- Per seat")
        );
        assert_eq!(accepted.draft.amenities.wifi, Some(true));
        assert_eq!(accepted.draft.transit.metro_stations, vec!["Baner", "Aundh"]);
        assert!(accepted.draft.is_active);

        assert_eq!(
            plan.duplicates,
            vec![
                RowIssue::new(3, Some("orion".into()), DUPLICATE_IN_FILE),
                RowIssue::new(4, Some("stored tower".into()), EXISTS_IN_DB),
            ]
        );
        assert_eq!(
            plan.failed,
            vec![
                RowIssue::new(5, None, MISSING_BUILDING),
                RowIssue::new(6, Some("Nova".into()), "Invalid office type 'office'. Expected 'managed'."),
                RowIssue::new(7, Some("Vega".into()), AGENT_NOT_FOUND),
            ]
        );
    }

    #[test]
    fn missing_type_fails() {
        let agent = ObjectId::new();
        let hex = agent.to_hex();
        let rows = vec![row(2, &[("buildingName", "Atlas"), ("assigned_agent", hex.as_str())])];
        let plan = reconcile::<OfficeSpace>(&rows, &context(agent));
        assert_eq!(plan.failed[0].reason, "Invalid office type ''. Expected 'office'.");
    }

    #[test]
    fn unknown_object_id_is_not_an_agent() {
        let stranger = ObjectId::new().to_hex();
        let rows = vec![row(
            2,
            &[("buildingName", "Atlas"), ("type", "office"), ("assigned_agent", stranger.as_str())],
        )];
        let plan = reconcile::<OfficeSpace>(&rows, &context(ObjectId::new()));
        assert_eq!(plan.failed[0].reason, AGENT_NOT_FOUND);
    }

    #[test]
    fn rejected_row_does_not_claim_its_name() {
        let agent = ObjectId::new();
        let hex = agent.to_hex();
        let rows = vec![
            row(2, &[("buildingName", "Orion"), ("type", "office"), ("assigned_agent_email", "nobody@x.test")]),
            row(3, &[("buildingName", "Orion"), ("type", "office"), ("assigned_agent", hex.as_str())]),
            row(4, &[("buildingName", "ORION"), ("type", "office"), ("assigned_agent", hex.as_str())]),
        ];
        let plan = reconcile::<OfficeSpace>(&rows, &context(agent));

        assert_eq!(plan.accepted.len(), 1);
        assert_eq!(plan.accepted[0].row, 3);
        assert_eq!(plan.failed, vec![RowIssue::new(2, Some("Orion".into()), AGENT_NOT_FOUND)]);
        assert_eq!(
            plan.duplicates,
            vec![RowIssue::new(4, Some("ORION".into()), DUPLICATE_IN_FILE)]
        );
    }

    #[test]
    fn unknown_email_falls_back_to_object_id() {
        let agent = ObjectId::new();
        let hex = agent.to_hex();
        let rows = vec![row(
            2,
            &[
                ("buildingName", "Atlas"),
                ("type", "office"),
                ("assigned_agent_email", "typo@x.test"),
                ("assigned_agent", hex.as_str()),
            ],
        )];
        let plan = reconcile::<OfficeSpace>(&rows, &context(agent));
        assert!(plan.failed.is_empty());
        assert_eq!(plan.accepted[0].draft.assigned_agent, agent);
    }

    #[test]
    fn availability_and_images() {
        let agent = ObjectId::new();
        let ctx = context(agent);
        let hex = agent.to_hex();
        let id = hex.as_str();
        let seven = vec!["https://x.test/i.jpg"; 7].join(",");
        let rows = vec![
            row(2, &[("buildingName", "A"), ("type", "office"), ("assigned_agent", id), ("availability_status", "leased")]),
            row(3, &[("buildingName", "B"), ("type", "office"), ("assigned_agent", id), ("images", seven.as_str())]),
            row(4, &[("buildingName", "C"), ("type", "office"), ("assigned_agent", id), ("images", "https://x.test/a.jpg, ftp://x")]),
            row(5, &[("buildingName", "D"), ("type", "office"), ("assigned_agent", id), ("availability_status", "sold out"), ("hospital", "Ruby Hall"), ("additionalContactName", "Asha")]),
        ];
        let plan = reconcile::<OfficeSpace>(&rows, &ctx);
        let reasons: Vec<&str> = plan.failed.iter().map(|f| f.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec![
                "Invalid availability_status 'leased'. Allowed: Available, Booked, Sold Out, Under Maintenance",
                "More than 6 images provided",
                "Invalid image URL: 'ftp://x'",
            ]
        );

        let draft = &plan.accepted[0].draft;
        assert_eq!(draft.availability_status, AvailabilityStatus::SoldOut);
        assert_eq!(draft.public_facilities.hospitals, vec!["Ruby Hall"]);
        assert_eq!(draft.additional_contacts[0].name.as_deref(), Some("Asha"));
    }

    #[test]
    fn results_report() {
        let plan: ImportPlan<OfficeSpace> = ImportPlan {
            accepted: Vec::new(),
            duplicates: vec![RowIssue::new(3, Some("X".into()), DUPLICATE_IN_FILE)],
            failed: vec![RowIssue::new(4, None, MISSING_BUILDING)],
        };
        let results = plan.results(2, vec![RowIssue::new(2, Some("Y".into()), "write failed")]);
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["successfullyInserted"], 2);
        assert_eq!(json["duplicatesFound"], 1);
        assert_eq!(json["failedEntries"], 2);
        assert_eq!(json["failed"][0]["row"], 2);
        assert_eq!(json["failed"][1].get("buildingName"), None);
    }
}
