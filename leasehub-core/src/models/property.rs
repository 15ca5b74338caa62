//! Property documents shared by the three office subtypes
//!
//! A [`Property<K>`] carries the common listing shape; the subtype `K`
//! (see [`super::kinds`]) supplies its collection, type tag and the
//! `generalInfo` / `amenities` sub-documents.

use std::fmt::{self, Debug};

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::validation::{parse_object_id, validate_images, ValidationError};

/// Column kinds used when mapping spreadsheet rows into sub-documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Flag,
}

/// One flat spreadsheet column and the sub-document key it fills.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub ty: FieldType,
}

pub const fn text(key: &'static str) -> FieldSpec {
    FieldSpec { key, ty: FieldType::Text }
}

pub const fn number(key: &'static str) -> FieldSpec {
    FieldSpec { key, ty: FieldType::Number }
}

pub const fn flag(key: &'static str) -> FieldSpec {
    FieldSpec { key, ty: FieldType::Flag }
}

/// Office subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "managed")]
    Managed,
    #[serde(rename = "office")]
    Office,
    #[serde(rename = "co-working")]
    CoWorking,
}

impl PropertyType {
    /// Lookup order when an id could belong to any collection.
    pub const ALL: [PropertyType; 3] = [Self::Managed, Self::Office, Self::CoWorking];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::Office => "office",
            Self::CoWorking => "co-working",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            Self::Managed => "managedoffices",
            Self::Office => "officespaces",
            Self::CoWorking => "coworkingspaces",
        }
    }

    /// Parse a client- or spreadsheet-supplied type, tolerating the
    /// common misspellings (`manage`, `coworking`, `office space`).
    pub fn parse(raw: &str) -> Option<Self> {
        let squashed: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match squashed.as_str() {
            "managed" | "manage" | "managedoffice" => Some(Self::Managed),
            "office" | "officespace" => Some(Self::Office),
            "coworking" | "coworkingspace" => Some(Self::CoWorking),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Behaviour that differs between the office subtypes.
pub trait PropertyKind: Debug + Clone + Send + Sync + 'static {
    type GeneralInfo: Serialize + DeserializeOwned + Default + Clone + Debug + Send + Sync;
    type Amenities: Serialize + DeserializeOwned + Default + Clone + Debug + Send + Sync;

    const TYPE: PropertyType;
    /// Human label used in response messages ("Managed office").
    const LABEL: &'static str;
    /// `generalInfo.rentPerSeat` is free text ("Rs.8500/- Per seat")
    /// rather than a number.
    const TEXT_RENT: bool;
    const DEFAULT_SEARCH_SIZE: u32;
    const GENERAL_FIELDS: &'static [FieldSpec];
    const AMENITY_FIELDS: &'static [FieldSpec];

    fn collection() -> &'static str {
        Self::TYPE.collection()
    }
}

/// Listing availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    #[default]
    Available,
    Booked,
    #[serde(rename = "Sold Out")]
    SoldOut,
    #[serde(rename = "Under Maintenance")]
    UnderMaintenance,
}

impl AvailabilityStatus {
    pub const ALL: [AvailabilityStatus; 4] = [
        Self::Available,
        Self::Booked,
        Self::SoldOut,
        Self::UnderMaintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Booked => "Booked",
            Self::SoldOut => "Sold Out",
            Self::UnderMaintenance => "Under Maintenance",
        }
    }

    /// Case-insensitive match on the canonical labels.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let wanted = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().to_lowercase() == wanted)
    }

    pub fn allowed_list() -> String {
        Self::ALL.map(|s| s.as_str()).join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_of_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_sqft: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transit {
    #[serde(default)]
    pub metro_stations: Vec<String>,
    #[serde(default)]
    pub bus_stations: Vec<String>,
    #[serde(default)]
    pub train_stations: Vec<String>,
    #[serde(default)]
    pub airports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicFacilities {
    #[serde(default, alias = "hospital")]
    pub hospitals: Vec<String>,
    #[serde(default)]
    pub restaurants: Vec<String>,
    #[serde(default)]
    pub atms: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Stored property document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct Property<K: PropertyKind> {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub property_id: String,
    pub building_name: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    #[serde(default)]
    pub general_info: K::GeneralInfo,
    #[serde(default)]
    pub amenities: K::Amenities,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub transit: Transit,
    #[serde(default)]
    pub public_facilities: PublicFacilities,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(rename = "availability_status", default)]
    pub availability_status: AvailabilityStatus,
    #[serde(rename = "is_active", default = "default_true")]
    pub is_active: bool,
    #[serde(
        rename = "availability_date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub availability_date: Option<DateTime>,
    #[serde(rename = "last_updated", default = "DateTime::now")]
    pub last_updated: DateTime,
    #[serde(rename = "assigned_agent")]
    pub assigned_agent: ObjectId,
    #[serde(default)]
    pub additional_contacts: Vec<Contact>,
    #[serde(
        rename = "internal_notes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub internal_notes: Option<String>,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

/// Everything about a property except the identifiers the server issues.
#[derive(Debug, Clone)]
pub struct PropertyDraft<K: PropertyKind> {
    pub building_name: String,
    pub general_info: K::GeneralInfo,
    pub amenities: K::Amenities,
    pub location: Location,
    pub transit: Transit,
    pub public_facilities: PublicFacilities,
    pub images: Vec<String>,
    pub availability_status: AvailabilityStatus,
    pub is_active: bool,
    pub availability_date: Option<DateTime>,
    pub assigned_agent: ObjectId,
    pub additional_contacts: Vec<Contact>,
    pub internal_notes: Option<String>,
}

impl<K: PropertyKind> PropertyDraft<K> {
    pub fn into_property(self, property_id: String, now: DateTime) -> Property<K> {
        Property {
            id: None,
            property_id,
            building_name: self.building_name,
            kind: K::TYPE,
            general_info: self.general_info,
            amenities: self.amenities,
            location: self.location,
            transit: self.transit,
            public_facilities: self.public_facilities,
            images: self.images,
            availability_status: self.availability_status,
            is_active: self.is_active,
            availability_date: self.availability_date,
            last_updated: now,
            assigned_agent: self.assigned_agent,
            additional_contacts: self.additional_contacts,
            internal_notes: self.internal_notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Property creation payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct PropertyInput<K: PropertyKind> {
    pub building_name: Option<String>,
    #[serde(default)]
    pub general_info: K::GeneralInfo,
    #[serde(default)]
    pub amenities: K::Amenities,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub transit: Transit,
    #[serde(default)]
    pub public_facilities: PublicFacilities,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(rename = "availability_status", default)]
    pub availability_status: Option<String>,
    #[serde(rename = "is_active", default)]
    pub is_active: Option<bool>,
    #[serde(rename = "availability_date", default)]
    pub availability_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "assigned_agent", default)]
    pub assigned_agent: Option<String>,
    #[serde(default)]
    pub additional_contacts: Vec<Contact>,
    #[serde(rename = "internal_notes", default)]
    pub internal_notes: Option<String>,
}

impl<K: PropertyKind> PropertyInput<K> {
    pub fn into_draft(self) -> Result<PropertyDraft<K>, ValidationError> {
        let building_name = self
            .building_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::Empty { field: "buildingName" })?
            .to_owned();

        let assigned_agent = parse_object_id(
            "assigned_agent",
            self.assigned_agent.as_deref().unwrap_or_default(),
        )?;

        validate_images(&self.images)?;

        let availability_status = match self.availability_status.as_deref() {
            None => AvailabilityStatus::default(),
            Some(raw) => AvailabilityStatus::parse_lenient(raw).ok_or_else(|| {
                ValidationError::InvalidVariant {
                    field: "availability_status",
                    value: raw.to_owned(),
                }
            })?,
        };

        Ok(PropertyDraft {
            building_name,
            general_info: self.general_info,
            amenities: self.amenities,
            location: self.location,
            transit: self.transit,
            public_facilities: self.public_facilities,
            images: self.images,
            availability_status,
            is_active: self.is_active.unwrap_or(true),
            availability_date: self.availability_date.map(DateTime::from_chrono),
            assigned_agent,
            additional_contacts: self.additional_contacts,
            internal_notes: self.internal_notes,
        })
    }
}

/// Keys a partial update may never touch.
const IMMUTABLE_KEYS: [&str; 4] = ["_id", "propertyId", "createdAt", "type"];

/// Prepare a client patch for `$set`: drop immutable keys, validate the
/// constrained fields and stamp `last_updated`.
pub fn sanitize_update(mut patch: Document, now: DateTime) -> Result<Document, ValidationError> {
    for key in IMMUTABLE_KEYS {
        patch.remove(key);
    }

    if let Some(images) = patch.get("images") {
        let images = match images {
            Bson::Array(items) => items
                .iter()
                .map(|i| i.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| ValidationError::message("All images must be valid URLs"))?,
            _ => return Err(ValidationError::message("All images must be valid URLs")),
        };
        validate_images(&images)?;
    }

    if let Some(raw) = patch.get("availability_status") {
        let raw = raw.as_str().unwrap_or_default().to_owned();
        let status = AvailabilityStatus::parse_lenient(&raw).ok_or(
            ValidationError::InvalidVariant {
                field: "availability_status",
                value: raw,
            },
        )?;
        patch.insert("availability_status", status.as_str());
    }

    if let Some(raw) = patch.get("assigned_agent") {
        let agent = match raw {
            Bson::ObjectId(oid) => *oid,
            Bson::String(s) => parse_object_id("assigned_agent", s)?,
            _ => return Err(ValidationError::InvalidObjectId { field: "assigned_agent" }),
        };
        patch.insert("assigned_agent", agent);
    }

    patch.insert("last_updated", now);
    patch.insert("updatedAt", now);
    Ok(patch)
}

/// Lightweight projection used in wishlists and lead listings.
pub fn summary_projection() -> Document {
    doc! { "buildingName": 1, "location": 1, "images": 1, "type": 1, "propertyId": 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::kinds::ManagedOffice;
    use serde_json::json;

    #[test]
    fn type_aliases() {
        assert_eq!(PropertyType::parse("Manage"), Some(PropertyType::Managed));
        assert_eq!(PropertyType::parse("co working"), Some(PropertyType::CoWorking));
        assert_eq!(PropertyType::parse("Office-Space"), Some(PropertyType::Office));
        assert_eq!(PropertyType::parse("warehouse"), None);
    }

    #[test]
    fn availability_lenient() {
        assert_eq!(
            AvailabilityStatus::parse_lenient("sold  out"),
            Some(AvailabilityStatus::SoldOut)
        );
        assert_eq!(
            AvailabilityStatus::parse_lenient("BOOKED"),
            Some(AvailabilityStatus::Booked)
        );
        assert_eq!(AvailabilityStatus::parse_lenient("leased"), None);
    }

    #[test]
    fn input_requires_agent_and_name() {
        let input: PropertyInput<ManagedOffice> = serde_json::from_value(json!({
            "buildingName": "Orion",
            "generalInfo": {"seaterOffered": 40, "rentPerSeat": "Rs.8500/- Per seat"},
        }))
        .unwrap();
        let err = input.into_draft().unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "assigned_agent" });
    }

    #[test]
    fn input_to_property() {
        let input: PropertyInput<ManagedOffice> = serde_json::from_value(json!({
            "buildingName": " Orion ",
            "assigned_agent": "64b7f0c2a1b2c3d4e5f60718",
            "availability_status": "booked",
            "location": {"city": "Pune", "areaSqft": 4233},
            "images": ["https://cdn.example/a.jpg"],
        }))
        .unwrap();
        let property = input
            .into_draft()
            .unwrap()
            .into_property("P7".into(), DateTime::now());

        assert_eq!(property.building_name, "Orion");
        assert_eq!(property.kind, PropertyType::Managed);
        assert_eq!(property.availability_status, AvailabilityStatus::Booked);
        assert!(property.is_active);

        let doc = bson::to_document(&property).unwrap();
        assert_eq!(doc.get_str("type").unwrap(), "managed");
        assert_eq!(doc.get_str("availability_status").unwrap(), "Booked");
        assert_eq!(doc.get_str("propertyId").unwrap(), "P7");
        assert!(doc.get_object_id("assigned_agent").is_ok());
    }

    #[test]
    fn update_is_sanitized() {
        let patch = doc! {
            "_id": "x",
            "propertyId": "P1",
            "availability_status": "under maintenance",
            "assigned_agent": "64b7f0c2a1b2c3d4e5f60718",
        };
        let clean = sanitize_update(patch, DateTime::now()).unwrap();
        assert!(!clean.contains_key("_id"));
        assert!(!clean.contains_key("propertyId"));
        assert_eq!(
            clean.get_str("availability_status").unwrap(),
            "Under Maintenance"
        );
        assert!(clean.get_object_id("assigned_agent").is_ok());
        assert!(clean.contains_key("last_updated"));
    }

    #[test]
    fn update_rejects_bad_images() {
        let patch = doc! { "images": ["not a url"] };
        assert!(sanitize_update(patch, DateTime::now()).is_err());
    }
}
