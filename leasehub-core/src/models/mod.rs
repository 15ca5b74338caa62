//! Stored documents and request payloads
//!
//! Payloads are validated when converted into documents; invalid input
//! returns `ValidationError`, never a panic.

pub mod kinds;
pub mod lead;
pub mod profile;
pub mod property;
pub mod role;
pub mod user;
pub mod visitor;
pub mod wishlist;

pub use kinds::{CoWorkingSpace, ManagedOffice, OfficeSpace};
pub use lead::{Lead, LeadStatus, NewLead, Notification, NotificationKind};
pub use profile::{NewProfile, PastCompany, UserProfile};
pub use property::{
    AvailabilityStatus, Contact, FieldSpec, FieldType, Location, Property, PropertyDraft,
    PropertyInput, PropertyKind, PropertyType, PublicFacilities, Transit,
};
pub use role::{Menu, MenuEntry, NewRole, Role};
pub use user::{NewUser, User, ValidNewUser};
pub use visitor::{NewVisitor, Otp, Registration, VerifyEmailOtp, Visitor};
pub use wishlist::{property_code, Counter, Wishlist, PROPERTY_SEQUENCE};
