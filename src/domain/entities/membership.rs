use serde::{Deserialize, Serialize};

/// Role a member holds within an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum MembershipRole {
    #[default]
    Member,
    Moderator,
    Owner,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Member => "member",
            MembershipRole::Moderator => "moderator",
            MembershipRole::Owner => "owner",
        }
    }

    /// Moderators and owners cannot be removed through the admission API.
    pub fn is_protected(&self) -> bool {
        matches!(self, MembershipRole::Moderator | MembershipRole::Owner)
    }
}

impl std::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
