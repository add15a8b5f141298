use chrono::{DateTime, Utc};
use colloquy_types::Role;
use serde::{Deserialize, Serialize};

/// Fields of a stored message that may be overwritten
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl MessagePatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            role: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.role.is_none()
    }
}

/// Fields of a stored thread that may be overwritten
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ThreadPatch {
    pub fn rename(title: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            title: Some(title.into()),
            updated_at: Some(updated_at),
        }
    }

    pub fn touched(updated_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            updated_at: Some(updated_at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.updated_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patches() {
        assert!(MessagePatch::default().is_empty());
        assert!(ThreadPatch::default().is_empty());
        assert!(!MessagePatch::content("x").is_empty());
        assert!(!ThreadPatch::touched(Utc::now()).is_empty());
    }

    #[test]
    fn test_rename_sets_both_fields() {
        let now = Utc::now();
        let patch = ThreadPatch::rename("Rust lifetimes", now);
        assert_eq!(patch.title.as_deref(), Some("Rust lifetimes"));
        assert_eq!(patch.updated_at, Some(now));
    }
}
