//! Relationships between characters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Types of relationships between characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    // Positive relationships
    /// Family member.
    Family,
    /// Close friend.
    Friend,
    /// Ally or partner.
    Ally,
    /// Mentor or teacher.
    Mentor,
    /// Student or apprentice.
    Student,
    /// Romantic interest.
    Romantic,

    // Neutral relationships
    /// Acquaintance.
    Acquaintance,
    /// Leads the other.
    Leader,
    /// Follows the other.
    Follower,

    // Negative relationships
    /// Rival or competitor.
    Rival,
    /// Enemy.
    Enemy,
    /// Betrayed the other.
    Betrayer,
    /// Was betrayed by the other.
    Betrayed,
    /// Hunts the other.
    Hunts,
    /// Is hunted by the other.
    HuntedBy,
}

impl RelationType {
    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            RelationType::Family => "family of",
            RelationType::Friend => "friend of",
            RelationType::Ally => "ally of",
            RelationType::Mentor => "mentor to",
            RelationType::Student => "student of",
            RelationType::Romantic => "romantic with",
            RelationType::Acquaintance => "acquainted with",
            RelationType::Leader => "leads",
            RelationType::Follower => "follows",
            RelationType::Rival => "rival of",
            RelationType::Enemy => "enemy of",
            RelationType::Betrayer => "betrayed",
            RelationType::Betrayed => "betrayed by",
            RelationType::Hunts => "hunting",
            RelationType::HuntedBy => "hunted by",
        }
    }

    /// Check if this is a positive relationship.
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            RelationType::Family
                | RelationType::Friend
                | RelationType::Ally
                | RelationType::Mentor
                | RelationType::Student
                | RelationType::Romantic
        )
    }

    /// Check if this is a negative relationship.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            RelationType::Rival
                | RelationType::Enemy
                | RelationType::Betrayer
                | RelationType::Betrayed
                | RelationType::Hunts
                | RelationType::HuntedBy
        )
    }

    /// The relation as seen from the other side.
    pub fn inverse(&self) -> RelationType {
        match self {
            RelationType::Mentor => RelationType::Student,
            RelationType::Student => RelationType::Mentor,
            RelationType::Leader => RelationType::Follower,
            RelationType::Follower => RelationType::Leader,
            RelationType::Betrayer => RelationType::Betrayed,
            RelationType::Betrayed => RelationType::Betrayer,
            RelationType::Hunts => RelationType::HuntedBy,
            RelationType::HuntedBy => RelationType::Hunts,
            // Symmetric relationships
            RelationType::Family
            | RelationType::Friend
            | RelationType::Ally
            | RelationType::Romantic
            | RelationType::Acquaintance
            | RelationType::Rival
            | RelationType::Enemy => *self,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RelationType {
    type Err = String;

    /// Parse the loose labels writers use ("ally", "enemy", "mentor", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let relation = match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "family" => RelationType::Family,
            "friend" => RelationType::Friend,
            "ally" => RelationType::Ally,
            "mentor" => RelationType::Mentor,
            "student" | "apprentice" => RelationType::Student,
            "romantic" | "lover" => RelationType::Romantic,
            "acquaintance" => RelationType::Acquaintance,
            "leader" => RelationType::Leader,
            "follower" => RelationType::Follower,
            "rival" => RelationType::Rival,
            "enemy" => RelationType::Enemy,
            "betrayer" => RelationType::Betrayer,
            "betrayed" => RelationType::Betrayed,
            "hunts" | "hunter" => RelationType::Hunts,
            "hunted_by" | "hunted" => RelationType::HuntedBy,
            other => return Err(format!("unknown relationship type '{other}'")),
        };
        Ok(relation)
    }
}

/// A relationship as recorded on one character's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// The other character, as registered.
    pub with: String,
    /// How this character relates to the other.
    pub relation: RelationType,
    /// Episode the relationship was established or last changed.
    pub since_episode: u32,
}
