use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The pairing record between exactly two users.
///
/// `party_a` is the invite owner and `party_b` the redeemer, but callers
/// should treat the pair as unordered and go through [`partner_of`](Self::partner_of).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyConnection {
    pub id: String,
    pub party_a: String,
    pub party_b: String,
    pub connected_at: DateTime<Utc>,
}

impl FamilyConnection {
    pub fn involves(&self, user_id: &str) -> bool {
        self.party_a == user_id || self.party_b == user_id
    }

    /// The other party, or `None` when `user_id` is not part of this connection.
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        if self.party_a == user_id {
            Some(&self.party_b)
        } else if self.party_b == user_id {
            Some(&self.party_a)
        } else {
            None
        }
    }

    pub fn parties(&self) -> [&str; 2] {
        [&self.party_a, &self.party_b]
    }
}

/// Kind of action that advances a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    CheckIn,
    Reply,
    PromptAnswer,
}

impl InteractionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckIn => "check_in",
            Self::Reply => "reply",
            Self::PromptAnswer => "prompt_answer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "check_in" => Some(Self::CheckIn),
            "reply" => Some(Self::Reply),
            "prompt_answer" => Some(Self::PromptAnswer),
            _ => None,
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged qualifying interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub connection_id: String,
    pub user_id: String,
    pub kind: InteractionKind,
    /// Canonical day the interaction counted towards.
    pub day: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> FamilyConnection {
        FamilyConnection {
            id: "c1".into(),
            party_a: "student".into(),
            party_b: "parent".into(),
            connected_at: Utc::now(),
        }
    }

    #[test]
    fn partner_is_symmetric() {
        let c = connection();
        assert_eq!(c.partner_of("student"), Some("parent"));
        assert_eq!(c.partner_of("parent"), Some("student"));
        assert_eq!(c.partner_of("stranger"), None);
        assert!(c.involves("parent"));
        assert!(!c.involves("stranger"));
    }

    #[test]
    fn interaction_kind_parses_its_own_names() {
        for kind in [
            InteractionKind::CheckIn,
            InteractionKind::Reply,
            InteractionKind::PromptAnswer,
        ] {
            assert_eq!(InteractionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(InteractionKind::parse("like"), None);
    }
}
