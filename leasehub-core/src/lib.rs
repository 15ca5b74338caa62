pub mod deck;
pub mod filters;
pub mod import;
pub mod models;
pub mod otp;
pub mod pagination;
pub mod roles;
pub mod sheet;
pub mod validation;
pub mod wire;

pub use deck::{deck_file_name, property_deck, Deck, DeckError, Slide, SlideBody, PPTX_CONTENT_TYPE};
pub use filters::{AllPropertiesSearch, PropertySearch, Range};
pub use import::{reconcile, ImportContext, ImportPlan, ImportResults, RowIssue};
pub use otp::{generate_otp, OtpCheck, OTP_TTL};
pub use pagination::{PageQuery, Paginated, Pagination};
pub use roles::{LeadPolicyError, LeadScope, Requester, RoleKind};
pub use sheet::{read_first_sheet, Sheet, SheetError, SheetRow};
pub use validation::ValidationError;
pub use wire::{doc_json, docs_json, json_to_document, to_api_json, Envelope};
