//! The three office subtypes

use serde::{Deserialize, Serialize};

use super::property::{flag, number, text, FieldSpec, PropertyKind, PropertyType};

/// Serviced office sold per seat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedOffice;

/// Conventional leased office floor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfficeSpace;

/// Shared desks, day passes and memberships
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoWorkingSpace;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedGeneralInfo {
    pub seater_offered: Option<f64>,
    /// Free text, e.g. "Rs.8500/- Per seat"
    pub rent_per_seat: Option<String>,
    pub power_and_backup: Option<String>,
    pub oc_availability: Option<bool>,
    pub lock_in_period: Option<String>,
    pub furnishing_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAmenities {
    pub parking: Option<String>,
    pub chairs_desks: Option<bool>,
    pub washrooms: Option<String>,
    pub meeting_rooms: Option<bool>,
    pub security: Option<bool>,
    pub pantry_area: Option<bool>,
    pub first_aid_kit: Option<bool>,
    pub fire_extinguisher: Option<bool>,
    pub air_conditioners: Option<bool>,
    pub power_backup: Option<bool>,
    pub recreation_area: Option<bool>,
    pub private_cabin: Option<bool>,
    pub reception_area: Option<bool>,
    pub wifi: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeGeneralInfo {
    pub seater_offered: Option<f64>,
    pub floor_size: Option<String>,
    pub total_built_up_area: Option<String>,
    pub floors: Option<f64>,
    pub floors_name: Option<String>,
    pub rent_per_seat: Option<f64>,
    pub rent_price: Option<String>,
    pub maintenance_charges: Option<String>,
    pub power_backup: Option<bool>,
    pub oc_availability: Option<bool>,
    pub lock_in_period: Option<String>,
    pub furnishing_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeAmenities {
    pub parking: Option<bool>,
    pub parking4_wheeler: Option<bool>,
    pub parking2_wheeler: Option<bool>,
    pub security: Option<bool>,
    pub security24x7: Option<bool>,
    pub pantry_area: Option<bool>,
    pub first_aid_kit: Option<bool>,
    pub fire_extinguisher: Option<bool>,
    pub air_conditioners: Option<bool>,
    pub power_backup: Option<bool>,
    pub wifi: Option<bool>,
    pub lift: Option<bool>,
    pub gym: Option<bool>,
    pub chairs: Option<String>,
    pub washrooms: Option<String>,
    pub meeting_rooms: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoWorkingGeneralInfo {
    pub seater_offered: Option<f64>,
    pub desk_types: Option<String>,
    pub floor_size: Option<String>,
    pub total_built_up_area: Option<String>,
    pub floors: Option<f64>,
    pub floors_name: Option<String>,
    pub rent_per_seat: Option<f64>,
    pub day_pass_price: Option<f64>,
    pub meeting_room_hourly_rate: Option<f64>,
    pub rent_price: Option<String>,
    pub maintenance_charges: Option<String>,
    pub power_backup: Option<bool>,
    pub oc_availability: Option<bool>,
    pub lock_in_period: Option<String>,
    pub furnishing_level: Option<String>,
    pub membership_plans: Option<String>,
    pub reception_hours: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoWorkingAmenities {
    pub parking: Option<bool>,
    pub parking4_wheeler: Option<bool>,
    pub parking2_wheeler: Option<bool>,
    pub security: Option<bool>,
    pub security24x7: Option<bool>,
    pub cctv: Option<bool>,
    pub pantry_area: Option<bool>,
    pub cafeteria: Option<bool>,
    pub coffee_tea: Option<bool>,
    pub first_aid_kit: Option<bool>,
    pub fire_extinguisher: Option<bool>,
    pub air_conditioners: Option<bool>,
    pub power_backup: Option<bool>,
    pub wifi: Option<bool>,
    pub lift: Option<bool>,
    pub gym: Option<bool>,
    pub lounge_area: Option<bool>,
    pub chairs: Option<String>,
    pub washrooms: Option<String>,
    pub meeting_rooms: Option<bool>,
    pub training_rooms: Option<bool>,
    pub event_space: Option<bool>,
    pub reception: Option<bool>,
    pub mail_handling: Option<bool>,
    pub printing_services: Option<bool>,
    pub community_events: Option<bool>,
    pub storage_lockers: Option<bool>,
}

const OFFICE_AMENITY_FIELDS: &[FieldSpec] = &[
    flag("parking"),
    flag("parking4Wheeler"),
    flag("parking2Wheeler"),
    flag("security"),
    flag("security24x7"),
    flag("pantryArea"),
    flag("firstAidKit"),
    flag("fireExtinguisher"),
    flag("airConditioners"),
    flag("powerBackup"),
    flag("wifi"),
    flag("lift"),
    flag("gym"),
    text("chairs"),
    text("washrooms"),
    flag("meetingRooms"),
];

impl PropertyKind for ManagedOffice {
    type GeneralInfo = ManagedGeneralInfo;
    type Amenities = ManagedAmenities;

    const TYPE: PropertyType = PropertyType::Managed;
    const LABEL: &'static str = "Managed office";
    const TEXT_RENT: bool = true;
    const DEFAULT_SEARCH_SIZE: u32 = 5;
    const GENERAL_FIELDS: &'static [FieldSpec] = &[
        number("seaterOffered"),
        text("rentPerSeat"),
        text("powerAndBackup"),
        flag("ocAvailability"),
        text("lockInPeriod"),
        text("furnishingLevel"),
    ];
    const AMENITY_FIELDS: &'static [FieldSpec] = &[
        text("parking"),
        flag("chairsDesks"),
        text("washrooms"),
        flag("meetingRooms"),
        flag("security"),
        flag("pantryArea"),
        flag("firstAidKit"),
        flag("fireExtinguisher"),
        flag("airConditioners"),
        flag("powerBackup"),
        flag("recreationArea"),
        flag("privateCabin"),
        flag("receptionArea"),
        flag("wifi"),
    ];
}

impl PropertyKind for OfficeSpace {
    type GeneralInfo = OfficeGeneralInfo;
    type Amenities = OfficeAmenities;

    const TYPE: PropertyType = PropertyType::Office;
    const LABEL: &'static str = "Office space";
    const TEXT_RENT: bool = false;
    const DEFAULT_SEARCH_SIZE: u32 = 10;
    const GENERAL_FIELDS: &'static [FieldSpec] = &[
        number("seaterOffered"),
        text("floorSize"),
        text("totalBuiltUpArea"),
        number("floors"),
        text("floorsName"),
        number("rentPerSeat"),
        text("rentPrice"),
        text("maintenanceCharges"),
        flag("powerBackup"),
        flag("ocAvailability"),
        text("lockInPeriod"),
        text("furnishingLevel"),
    ];
    const AMENITY_FIELDS: &'static [FieldSpec] = OFFICE_AMENITY_FIELDS;
}

impl PropertyKind for CoWorkingSpace {
    type GeneralInfo = CoWorkingGeneralInfo;
    type Amenities = CoWorkingAmenities;

    const TYPE: PropertyType = PropertyType::CoWorking;
    const LABEL: &'static str = "Co-working space";
    const TEXT_RENT: bool = false;
    const DEFAULT_SEARCH_SIZE: u32 = 10;
    const GENERAL_FIELDS: &'static [FieldSpec] = &[
        number("seaterOffered"),
        text("deskTypes"),
        text("floorSize"),
        text("totalBuiltUpArea"),
        number("floors"),
        text("floorsName"),
        number("rentPerSeat"),
        number("dayPassPrice"),
        number("meetingRoomHourlyRate"),
        text("rentPrice"),
        text("maintenanceCharges"),
        flag("powerBackup"),
        flag("ocAvailability"),
        text("lockInPeriod"),
        text("furnishingLevel"),
        text("membershipPlans"),
        text("receptionHours"),
    ];
    const AMENITY_FIELDS: &'static [FieldSpec] = &[
        flag("parking"),
        flag("parking4Wheeler"),
        flag("parking2Wheeler"),
        flag("security"),
        flag("security24x7"),
        flag("cctv"),
        flag("pantryArea"),
        flag("cafeteria"),
        flag("coffeeTea"),
        flag("firstAidKit"),
        flag("fireExtinguisher"),
        flag("airConditioners"),
        flag("powerBackup"),
        flag("wifi"),
        flag("lift"),
        flag("gym"),
        flag("loungeArea"),
        text("chairs"),
        text("washrooms"),
        flag("meetingRooms"),
        flag("trainingRooms"),
        flag("eventSpace"),
        flag("reception"),
        flag("mailHandling"),
        flag("printingServices"),
        flag("communityEvents"),
        flag("storageLockers"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Document;

    /// Every column the importer fills must be a field serde knows about.
    fn keys_round_trip<K: PropertyKind>() {
        let general = bson::to_document(&K::GeneralInfo::default()).unwrap();
        let amenities = bson::to_document(&K::Amenities::default()).unwrap();
        let known = |doc: &Document, key: &str| doc.contains_key(key);

        for spec in K::GENERAL_FIELDS {
            assert!(known(&general, spec.key), "{} generalInfo.{}", K::LABEL, spec.key);
        }
        for spec in K::AMENITY_FIELDS {
            assert!(known(&amenities, spec.key), "{} amenities.{}", K::LABEL, spec.key);
        }
    }

    #[test]
    fn column_specs_match_documents() {
        keys_round_trip::<ManagedOffice>();
        keys_round_trip::<OfficeSpace>();
        keys_round_trip::<CoWorkingSpace>();
    }

    #[test]
    fn parking_wheeler_keys() {
        let doc = bson::to_document(&OfficeAmenities {
            parking4_wheeler: Some(true),
            ..OfficeAmenities::default()
        })
        .unwrap();
        assert_eq!(doc.get_bool("parking4Wheeler").unwrap(), true);
    }
}
