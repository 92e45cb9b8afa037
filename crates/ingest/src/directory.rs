use std::path::Path;

use serde::{Deserialize, Serialize};
use storage::models::is_platform_id;
use tracing::info;
use validator::Validate;

use crate::{IngestError, Result};

/// A known member of the guild and the names they go by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DirectoryMember {
    #[validate(custom(function = "validate_member_id"))]
    pub id: String,

    #[serde(alias = "name")]
    #[validate(length(min = 1, message = "Primary name is required"))]
    pub primary_name: String,

    #[validate(length(min = 1, message = "Display name is required"))]
    pub display_name: String,

    #[serde(default, alias = "global_name", skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub global_alias: Option<String>,
}

impl DirectoryMember {
    pub fn new(
        id: impl Into<String>,
        primary_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            primary_name: primary_name.into(),
            display_name: display_name.into(),
            global_alias: None,
        }
    }

    pub fn with_global_alias(mut self, alias: impl Into<String>) -> Self {
        self.global_alias = Some(alias.into());
        self
    }

    /// Primary name, display name, then the global alias when present
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.primary_name.as_str()),
            Some(self.display_name.as_str()),
            self.global_alias.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

fn validate_member_id(id: &str) -> std::result::Result<(), validator::ValidationError> {
    if is_platform_id(id) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_member_id"))
    }
}

/// Point-in-time snapshot of the guild's members.
///
/// Member order is kept exactly as supplied: resolution picks the first
/// matching member, so order breaks ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Directory {
    members: Vec<DirectoryMember>,
}

impl Directory {
    pub fn new(members: Vec<DirectoryMember>) -> Self {
        Self { members }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn members(&self) -> &[DirectoryMember] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&DirectoryMember> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Load a JSON array of members and validate every entry
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let directory: Directory = serde_json::from_str(&content)?;
        directory.validate_members()?;

        info!(
            "Loaded {} directory member(s) from {}",
            directory.len(),
            path.display()
        );

        Ok(directory)
    }

    pub fn validate_members(&self) -> Result<()> {
        let errors: Vec<String> = self
            .members
            .iter()
            .enumerate()
            .filter_map(|(idx, member)| {
                member
                    .validate()
                    .err()
                    .map(|e| format!("member #{} ({}): {}", idx + 1, member.id, e))
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(IngestError::ValidationError(format!(
                "Directory has {} invalid member(s): {}",
                errors.len(),
                errors.join("; ")
            )))
        }
    }
}

impl FromIterator<DirectoryMember> for Directory {
    fn from_iter<I: IntoIterator<Item = DirectoryMember>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_skip_missing_global_alias() {
        let member = DirectoryMember::new("111", "bela", "Bela");
        assert_eq!(member.aliases().collect::<Vec<_>>(), vec!["bela", "Bela"]);

        let member = member.with_global_alias("BelaGlobal");
        assert_eq!(member.aliases().count(), 3);
    }

    #[test]
    fn test_deserialize_platform_field_names() {
        let json = r#"[
            {"id": "123456789", "name": "ethan", "display_name": "Ethan", "global_name": "EthanGlobal"},
            {"id": "111222333", "primary_name": "bela", "display_name": "bela"}
        ]"#;
        let directory: Directory = serde_json::from_str(json).unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(directory.members()[0].primary_name, "ethan");
        assert_eq!(
            directory.members()[0].global_alias.as_deref(),
            Some("EthanGlobal")
        );
        assert_eq!(directory.members()[1].global_alias, None);
        assert!(directory.validate_members().is_ok());
    }

    #[test]
    fn test_validation_rejects_non_numeric_id() {
        let directory = Directory::new(vec![
            DirectoryMember::new("111", "bela", "bela"),
            DirectoryMember::new("abc", "diego", "diego"),
        ]);

        let err = directory.validate_members().unwrap_err();
        assert!(matches!(err, IngestError::ValidationError(_)));
        assert!(err.to_string().contains("member #2"));
    }

    #[test]
    fn test_validation_rejects_non_ascii_digits() {
        let directory = Directory::new(vec![DirectoryMember::new("١٢٣", "bela", "bela")]);
        assert!(directory.validate_members().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_names() {
        let directory = Directory::new(vec![DirectoryMember::new("111", "", "bela")]);
        assert!(directory.validate_members().is_err());
    }

    #[test]
    fn test_find_by_id() {
        let directory: Directory = [
            DirectoryMember::new("1", "a", "A"),
            DirectoryMember::new("2", "b", "B"),
        ]
        .into_iter()
        .collect();

        assert_eq!(directory.find_by_id("2").map(|m| m.display_name.as_str()), Some("B"));
        assert!(directory.find_by_id("3").is_none());
    }
}
