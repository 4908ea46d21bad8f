use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Category / status
// ---------------------------------------------------------------------------

/// Closed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Entertainment,
    Navigation,
    Utilities,
    #[serde(rename = "Smart Home")]
    SmartHome,
    Diagnostics,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Entertainment,
        Category::Navigation,
        Category::Utilities,
        Category::SmartHome,
        Category::Diagnostics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Entertainment => "Entertainment",
            Category::Navigation => "Navigation",
            Category::Utilities => "Utilities",
            Category::SmartHome => "Smart Home",
            Category::Diagnostics => "Diagnostics",
        }
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a package record.
///
/// Every record is created `Verified`. `Pending` and `Rejected` are kept for
/// a future moderation workflow; nothing produces them today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppStatus {
    Pending,
    Verified,
    Rejected,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Pending => "Pending",
            AppStatus::Verified => "Verified",
            AppStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(AppStatus::Pending),
            "Verified" => Some(AppStatus::Verified),
            "Rejected" => Some(AppStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Package record
// ---------------------------------------------------------------------------

/// One published package, as exposed over the API.
///
/// The asset reference linking the record to its binary is deliberately not
/// part of this type; it never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRecord {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub developer: String,
    pub category: Category,
    pub description: String,
    /// Display string such as `"2.0 MB"`; not validated numerically.
    pub size: String,
    pub upload_date: DateTime<Utc>,
    pub status: AppStatus,
    pub icon_url: String,
}

/// The mutable metadata of a package, already validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppFields {
    pub name: String,
    pub version: String,
    pub developer: String,
    pub category: Category,
    pub description: String,
    pub size: String,
    pub icon_url: String,
}

/// Raw metadata as submitted by a client (JSON body or multipart fields).
///
/// Every field defaults to empty so that a missing field surfaces as a
/// [`ValidationError`] rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppFieldsInput {
    pub name: String,
    pub version: String,
    pub developer: String,
    pub category: String,
    pub description: String,
    pub size: String,
    pub icon_url: String,
}

impl AppFieldsInput {
    /// Set a field by its wire name. Unknown names are ignored and
    /// reported back as `false`.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "version" => &mut self.version,
            "developer" => &mut self.developer,
            "category" => &mut self.category,
            "description" => &mut self.description,
            "size" => &mut self.size,
            "iconUrl" => &mut self.icon_url,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn validate(self) -> Result<AppFields, ValidationError> {
        let name = required("name", self.name)?;
        let version = required("version", self.version)?;
        let developer = required("developer", self.developer)?;
        let category = required("category", self.category)?.parse::<Category>()?;

        Ok(AppFields {
            name,
            version,
            developer,
            category,
            description: self.description,
            size: self.size.trim().to_string(),
            icon_url: self.icon_url.trim().to_string(),
        })
    }
}

impl From<AppFields> for AppFieldsInput {
    fn from(fields: AppFields) -> Self {
        Self {
            name: fields.name,
            version: fields.version,
            developer: fields.developer,
            category: fields.category.as_str().to_string(),
            description: fields.description,
            size: fields.size,
            icon_url: fields.icon_url,
        }
    }
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Human-readable package size, one decimal place in MiB (`"2.0 MB"`).
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// An authenticated administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
}

// ---------------------------------------------------------------------------
// Advisory analysis
// ---------------------------------------------------------------------------

/// Result of the optional safety analysis of a package name/description.
///
/// Advisory only: it is shown to the uploader and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyReport {
    /// 0 to 100.
    pub security_score: f64,
    /// `High`, `Medium` or `Low`.
    pub compatibility: String,
    pub recommendations: Vec<String>,
    pub vulnerabilities_found: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AppFieldsInput {
        AppFieldsInput {
            name: "Maps Pro".into(),
            version: "1.0.3".into(),
            developer: "Acme".into(),
            category: "Navigation".into(),
            description: "Offline maps".into(),
            size: "2.0 MB".into(),
            icon_url: "https://example.com/icon.svg".into(),
        }
    }

    #[test]
    fn test_category_wire_names() {
        assert_eq!(
            serde_json::to_string(&Category::SmartHome).unwrap(),
            "\"Smart Home\""
        );
        assert_eq!("Smart Home".parse::<Category>().unwrap(), Category::SmartHome);
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
    }

    #[test]
    fn test_unknown_category_rejected() {
        let err = "Games".parse::<Category>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownCategory("Games".into()));
        // Case matters.
        assert!("navigation".parse::<Category>().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let fields = input().validate().unwrap();
        assert_eq!(fields.category, Category::Navigation);
        assert_eq!(fields.name, "Maps Pro");
    }

    #[test]
    fn test_validate_missing_required() {
        let mut i = input();
        i.version = "   ".into();
        assert_eq!(
            i.validate().unwrap_err(),
            ValidationError::MissingField("version")
        );
    }

    #[test]
    fn test_validate_optional_fields_default_empty() {
        let i: AppFieldsInput = serde_json::from_str(
            r#"{"name":"A","version":"1","developer":"D","category":"Utilities"}"#,
        )
        .unwrap();
        let fields = i.validate().unwrap();
        assert_eq!(fields.description, "");
        assert_eq!(fields.icon_url, "");
    }

    #[test]
    fn test_set_by_wire_name() {
        let mut i = AppFieldsInput::default();
        assert!(i.set("iconUrl", "x".into()));
        assert!(!i.set("status", "Rejected".into()));
        assert_eq!(i.icon_url, "x");
    }

    #[test]
    fn test_record_json_shape() {
        let record = PackageRecord {
            id: Uuid::new_v4(),
            name: "Maps Pro".into(),
            version: "1.0.3".into(),
            developer: "Acme".into(),
            category: Category::Navigation,
            description: String::new(),
            size: "2.0 MB".into(),
            upload_date: Utc::now(),
            status: AppStatus::Verified,
            icon_url: String::new(),
        };
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "id",
            "name",
            "version",
            "developer",
            "category",
            "description",
            "size",
            "uploadDate",
            "status",
            "iconUrl",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 10);
        assert_eq!(obj["status"], "Verified");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(format_size(1536 * 1024), "1.5 MB");
        assert_eq!(format_size(0), "0.0 MB");
    }
}
