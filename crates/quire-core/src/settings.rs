//! # Journal Settings
//!
//! Locale-keyed key/value settings plus the section and category lists of a
//! journal.
//!
//! The empty locale `""` holds values that are not localised. Lookup order
//! is the requested locale, then the fallback locale, then `""`.

use crate::{CategoryId, JournalId, QuireError, SectionId};
use serde::{Deserialize, Serialize};

// =============================================================================
// SETTINGS
// =============================================================================

/// How a setting's text value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    #[default]
    String,
    Bool,
    Int,
    Float,
    Object,
}

/// A setting value decoded according to its [`SettingType`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// One row of journal settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalSetting {
    pub journal_id: JournalId,
    pub name: String,
    pub locale: String,
    pub value: String,
    pub setting_type: SettingType,
}

impl JournalSetting {
    /// Decode the text value.
    ///
    /// `Object` values stay as their raw JSON text.
    pub fn typed_value(&self) -> Result<SettingValue, QuireError> {
        let raw = self.value.trim();
        let invalid = || {
            QuireError::validation(format!(
                "setting {} has invalid {:?} value {:?}",
                self.name, self.setting_type, self.value
            ))
        };
        match self.setting_type {
            SettingType::String | SettingType::Object => Ok(SettingValue::Text(self.value.clone())),
            SettingType::Bool => Ok(SettingValue::Bool(raw == "1" || raw == "true")),
            SettingType::Int => raw.parse().map(SettingValue::Int).map_err(|_| invalid()),
            SettingType::Float => raw.parse().map(SettingValue::Float).map_err(|_| invalid()),
        }
    }
}

/// Find `name` for `journal`, trying `locale`, then `fallback`, then `""`.
pub fn resolve_setting<'a>(
    settings: impl IntoIterator<Item = &'a JournalSetting>,
    journal: JournalId,
    name: &str,
    locale: &str,
    fallback: Option<&str>,
) -> Option<&'a JournalSetting> {
    let candidates: Vec<&JournalSetting> = settings
        .into_iter()
        .filter(|s| s.journal_id == journal && s.name == name)
        .collect();

    let order = [Some(locale), fallback, Some("")];
    order.into_iter().flatten().find_map(|wanted| {
        candidates
            .iter()
            .copied()
            .find(|s| s.locale == wanted && !s.value.is_empty())
    })
}

// =============================================================================
// SECTIONS AND CATEGORIES
// =============================================================================

/// A journal section (Articles, Reviews, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub journal_id: JournalId,
    pub title: String,
    pub abbreviation: String,
    pub sequence: u32,
    pub is_inactive: bool,
}

/// A journal category, optionally nested under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub journal_id: JournalId,
    pub title: String,
    pub path: String,
    pub parent_id: Option<CategoryId>,
    pub sequence: u32,
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setting(locale: &str, value: &str) -> JournalSetting {
        JournalSetting {
            journal_id: JournalId(1),
            name: "authorGuidelines".into(),
            locale: locale.into(),
            value: value.into(),
            setting_type: SettingType::String,
        }
    }

    #[test]
    fn locale_then_fallback_then_unlocalised() {
        let rows = vec![setting("en_US", "Guidelines"), setting("", "Raw")];
        let found = resolve_setting(&rows, JournalId(1), "authorGuidelines", "id_ID", Some("en_US"))
            .expect("fallback");
        assert_eq!(found.value, "Guidelines");

        let found =
            resolve_setting(&rows, JournalId(1), "authorGuidelines", "fr_FR", None).expect("raw");
        assert_eq!(found.value, "Raw");

        assert!(resolve_setting(&rows, JournalId(2), "authorGuidelines", "en_US", None).is_none());
    }

    #[test]
    fn empty_value_falls_through() {
        let rows = vec![setting("id_ID", ""), setting("en_US", "Guidelines")];
        let found = resolve_setting(&rows, JournalId(1), "authorGuidelines", "id_ID", Some("en_US"))
            .expect("fallback");
        assert_eq!(found.locale, "en_US");
    }

    #[test]
    fn typed_values() {
        let mut row = setting("", "1");
        row.setting_type = SettingType::Bool;
        assert_eq!(row.typed_value().expect("bool"), SettingValue::Bool(true));

        row.setting_type = SettingType::Int;
        row.value = "4".into();
        assert_eq!(row.typed_value().expect("int"), SettingValue::Int(4));

        row.value = "four".into();
        assert!(row.typed_value().is_err());
    }
}
