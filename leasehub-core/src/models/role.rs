//! Roles and navigation menus

use std::collections::BTreeMap;

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{require_non_empty, ValidationError};

/// Stored role. `menuId` is the hex id of the role's [`Menu`] document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub role_name: String,
    pub menu_id: String,
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub permissions: BTreeMap<String, bool>,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

impl Role {
    pub const COLLECTION: &'static str = "roles";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRole {
    pub role_name: Option<String>,
    pub menu_id: Option<String>,
    pub is_verified: Option<Value>,
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

impl NewRole {
    pub fn into_role(self, now: DateTime) -> Result<Role, ValidationError> {
        let role_name = require_non_empty("roleName", self.role_name.as_deref())?.to_owned();
        let menu_id = require_non_empty("menuId", self.menu_id.as_deref())?.to_owned();
        let is_verified = match self.is_verified {
            Some(Value::Bool(b)) => b,
            Some(_) => {
                return Err(ValidationError::message(
                    "isVerified Parameter is Missing - Boolean",
                ))
            }
            None => return Err(ValidationError::Empty { field: "isVerified" }),
        };
        Ok(Role {
            id: None,
            role_name,
            menu_id,
            is_verified,
            permissions: self.permissions,
            created_at: now,
            updated_at: now,
        })
    }
}

/// One navigation entry with optional children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub menu: String,
    #[serde(default)]
    pub sub_menu: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub menus: Vec<MenuEntry>,
    #[serde(default = "DateTime::now")]
    pub created_at: DateTime,
    #[serde(default = "DateTime::now")]
    pub updated_at: DateTime,
}

impl Menu {
    pub const COLLECTION: &'static str = "menus";
}

/// Validate a raw `menus` array from a request body.
pub fn parse_menu_entries(raw: Option<&Value>) -> Result<Vec<MenuEntry>, ValidationError> {
    let items = match raw {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(ValidationError::message("Menus array is required")),
    };

    items
        .iter()
        .map(|item| {
            let menu = item
                .get("menu")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .ok_or_else(|| ValidationError::message("Each menu must have a 'menu' field"))?;

            let sub_menu = match item.get("subMenu") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(children)) => children
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect(),
                Some(_) => return Err(ValidationError::message("'subMenu' must be an array")),
            };

            Ok(MenuEntry {
                menu: menu.to_owned(),
                sub_menu,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_requires_boolean_verification() {
        let role = NewRole {
            role_name: Some("manager".into()),
            menu_id: Some("64b7f0c2a1b2c3d4e5f60718".into()),
            is_verified: Some(json!(true)),
            ..NewRole::default()
        }
        .into_role(DateTime::now())
        .unwrap();
        assert!(role.is_verified);

        let err = NewRole {
            role_name: Some("manager".into()),
            menu_id: Some("m".into()),
            is_verified: Some(json!("yes")),
            ..NewRole::default()
        }
        .into_role(DateTime::now())
        .unwrap_err();
        assert!(err.to_string().contains("Boolean"));
    }

    #[test]
    fn menu_entries() {
        let raw = json!([{"menu": "Leads", "subMenu": ["All", "Mine"]}, {"menu": "Reports"}]);
        let entries = parse_menu_entries(Some(&raw)).unwrap();
        assert_eq!(entries[0].sub_menu, vec!["All", "Mine"]);
        assert!(entries[1].sub_menu.is_empty());
    }

    #[test]
    fn menu_entry_errors() {
        assert_eq!(
            parse_menu_entries(Some(&json!([]))).unwrap_err().to_string(),
            "Menus array is required"
        );
        assert_eq!(
            parse_menu_entries(Some(&json!([{"subMenu": []}])))
                .unwrap_err()
                .to_string(),
            "Each menu must have a 'menu' field"
        );
        assert_eq!(
            parse_menu_entries(Some(&json!([{"menu": "Leads", "subMenu": "All"}])))
                .unwrap_err()
                .to_string(),
            "'subMenu' must be an array"
        );
    }
}
