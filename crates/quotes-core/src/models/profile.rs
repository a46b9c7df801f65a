//! User profile model

use serde::{Deserialize, Serialize};

use crate::util::normalize_text_option;

/// Optional per-user display data, keyed by the auth user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Profile fields written by the profile-edit flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Trim both fields, turning blanks into `None`.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            name: normalize_text_option(self.name),
            avatar_url: normalize_text_option(self.avatar_url),
        }
    }
}

/// Fallback avatar letter: the uppercase first character of the email.
#[must_use]
pub fn avatar_initial(email: Option<&str>) -> String {
    email
        .and_then(|email| email.trim().chars().next())
        .map_or_else(|| "?".to_string(), |first| first.to_uppercase().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_initial_uses_first_letter() {
        assert_eq!(avatar_initial(Some("ada@example.com")), "A");
        assert_eq!(avatar_initial(Some("  ")), "?");
        assert_eq!(avatar_initial(None), "?");
    }

    #[test]
    fn profile_update_normalizes_blanks() {
        let update = ProfileUpdate {
            name: Some("  Ada ".to_string()),
            avatar_url: Some(String::new()),
        }
        .normalized();
        assert_eq!(update.name.as_deref(), Some("Ada"));
        assert_eq!(update.avatar_url, None);
    }
}
