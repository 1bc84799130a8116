/// Record shapes for every persisted collection
///
/// Field names serialize in camelCase so that existing seed and fixture
/// data round-trips unchanged.
use crate::auth::Role;
use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical tri-state approval status
///
/// Only `status::resolve_*` turns raw item fields into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }

    pub fn from_str(s: &str) -> PipelineResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            _ => Err(PipelineError::Validation(format!(
                "Invalid approval status: {}",
                s
            ))),
        }
    }
}

/// Pipeline stage, which doubles as the kanban lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Challenge Submitted")]
    ChallengeSubmitted,
    #[serde(rename = "Ideation & Evaluation")]
    IdeationEvaluation,
    #[serde(rename = "POC & Pilot")]
    PocPilot,
    #[serde(rename = "Scaled & Deployed")]
    ScaledDeployed,
    #[serde(rename = "Parking Lot")]
    ParkingLot,
}

impl Stage {
    /// Lanes in board order
    pub const ALL: [Stage; 5] = [
        Stage::ChallengeSubmitted,
        Stage::IdeationEvaluation,
        Stage::PocPilot,
        Stage::ScaledDeployed,
        Stage::ParkingLot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ChallengeSubmitted => "Challenge Submitted",
            Stage::IdeationEvaluation => "Ideation & Evaluation",
            Stage::PocPilot => "POC & Pilot",
            Stage::ScaledDeployed => "Scaled & Deployed",
            Stage::ParkingLot => "Parking Lot",
        }
    }

    /// Parse either the display label or a short slug
    pub fn from_str(s: &str) -> PipelineResult<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "challenge submitted" | "submitted" => Ok(Stage::ChallengeSubmitted),
            "ideation & evaluation" | "ideation" => Ok(Stage::IdeationEvaluation),
            "poc & pilot" | "poc" | "pilot" => Ok(Stage::PocPilot),
            "scaled & deployed" | "scaled" | "deployed" => Ok(Stage::ScaledDeployed),
            "parking lot" | "parking-lot" | "parked" => Ok(Stage::ParkingLot),
            _ => Err(PipelineError::Validation(format!("Invalid stage: {}", s))),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn from_str(s: &str) -> PipelineResult<Self> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(PipelineError::Validation(format!("Invalid priority: {}", s))),
        }
    }
}

/// Kinds of item the approval workflow acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Registration,
    Challenge,
    Idea,
}

impl ItemKind {
    /// Lowercase form used in synthetic notification ids
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Registration => "registration",
            ItemKind::Challenge => "challenge",
            ItemKind::Idea => "idea",
        }
    }

    /// Capitalized form used in admin log entries
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Registration => "Registration",
            ItemKind::Challenge => "Challenge",
            ItemKind::Idea => "Idea",
        }
    }

    pub fn from_str(s: &str) -> PipelineResult<Self> {
        match s.to_lowercase().as_str() {
            "registration" => Ok(ItemKind::Registration),
            "challenge" => Ok(ItemKind::Challenge),
            "idea" => Ok(ItemKind::Idea),
            _ => Err(PipelineError::Validation(format!("Invalid item kind: {}", s))),
        }
    }
}

/// Registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// Self-service registration awaiting an admin decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub requested_role: Role,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
}

/// Challenge record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub stage: Stage,
    /// Absent on records that predate the approval feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Idea record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub submitted_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ApprovalStatus>,
    /// Legacy free-form status (Accepted, Declined, In Review, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Idea row embedded in a challenge detail record
///
/// Only `id` is authoritative. The other fields are leftovers from records
/// written before summaries were computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl IdeaSummary {
    pub fn link(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            submitted_by: None,
            status: None,
        }
    }
}

/// Long-form challenge detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDetail {
    pub id: String,
    #[serde(default)]
    pub problem_statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
    #[serde(default)]
    pub ideas: Vec<IdeaSummary>,
}

/// Board projection of a challenge; position is its index within its lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanCard {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub owner: String,
    #[serde(default)]
    pub priority: Priority,
    pub stage: Stage,
}

impl KanbanCard {
    pub fn from_challenge(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id.clone(),
            title: challenge.title.clone(),
            description: challenge.description.clone(),
            owner: challenge.owner.clone(),
            priority: challenge.priority,
            stage: challenge.stage,
        }
    }
}

/// Admin action history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogEntry {
    pub id: String,
    pub action: String,
    pub item_type: String,
    pub item_name: String,
    pub admin_name: String,
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Feed entry, either persisted or synthesized from a pending item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub text: String,
    pub time: DateTime<Utc>,
    pub unread: bool,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_needed: Option<bool>,
}

/// Next human-readable id such as `CH-011` or `ID-0043`
///
/// One past the highest numeric suffix among ids sharing the prefix, so
/// deleting an item never causes its id to be reissued to a later one
/// unless it was the newest.
pub fn next_sequential_id<'a>(
    prefix: &str,
    width: usize,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.strip_prefix('-'))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    format!(
        "{}-{:0width$}",
        prefix,
        highest.saturating_add(1),
        width = width
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_sequential_id() {
        assert_eq!(next_sequential_id("CH", 3, ["CH-001", "CH-010", "CH-004"]), "CH-011");
        assert_eq!(next_sequential_id("ID", 4, ["ID-0042", "CH-999"]), "ID-0043");
        assert_eq!(next_sequential_id("USR", 3, std::iter::empty()), "USR-001");
        assert_eq!(next_sequential_id("CH", 3, ["CH-legacy"]), "CH-001");
        assert_eq!(next_sequential_id("ntf", 4, ["ntf-0001", "ntf-0002"]), "ntf-0003");
    }

    #[test]
    fn test_next_sequential_id_past_u32_range() {
        assert_eq!(
            next_sequential_id("CH", 3, ["CH-4294967295"]),
            "CH-4294967296"
        );
        let max = format!("CH-{}", u64::MAX);
        assert_eq!(
            next_sequential_id("CH", 3, [max.as_str()]),
            format!("CH-{}", u64::MAX)
        );
    }

    #[test]
    fn test_stage_labels_round_trip_through_serde() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
            assert_eq!(Stage::from_str(stage.as_str()).unwrap(), stage);
        }
    }

    #[test]
    fn test_stage_from_slug() {
        assert_eq!(Stage::from_str("poc").unwrap(), Stage::PocPilot);
        assert_eq!(Stage::from_str("parking-lot").unwrap(), Stage::ParkingLot);
        assert!(Stage::from_str("backlog").is_err());
    }

    #[test]
    fn test_item_kind_from_str() {
        assert_eq!(ItemKind::from_str("IDEA").unwrap(), ItemKind::Idea);
        assert_eq!(ItemKind::Registration.label(), "Registration");
        assert!(ItemKind::from_str("user").is_err());
    }

    #[test]
    fn test_legacy_challenge_without_approval_status_parses() {
        let json = r#"{
            "id": "CH-900",
            "title": "Legacy",
            "owner": "Someone",
            "stage": "Parking Lot",
            "createdAt": "2023-01-01T00:00:00Z",
            "updatedAt": "2023-01-01T00:00:00Z"
        }"#;
        let challenge: Challenge = serde_json::from_str(json).unwrap();
        assert_eq!(challenge.approval_status, None);
        assert_eq!(challenge.priority, Priority::Medium);
        assert_eq!(challenge.stage, Stage::ParkingLot);
    }

    #[test]
    fn test_notification_kind_serializes_as_type() {
        let notification = Notification {
            id: "n-1".to_string(),
            kind: "system".to_string(),
            title: "Hello".to_string(),
            text: "World".to_string(),
            time: Utc::now(),
            unread: true,
            link: "/".to_string(),
            action_needed: None,
        };
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "system");
        assert!(value.get("actionNeeded").is_none());
    }
}
