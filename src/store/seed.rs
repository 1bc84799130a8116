/// Compiled-in default data for every collection
///
/// Served whenever a collection is absent or fails to decode.
use crate::store::Collection;
use serde_json::{json, Value};

pub const SEED_CHALLENGE_COUNT: usize = 10;

/// Seed document for a collection
pub fn default_collection(collection: Collection) -> Value {
    match collection {
        Collection::Users => users(),
        Collection::Challenges => challenges(),
        Collection::ChallengeDetails => challenge_details(),
        Collection::Ideas => ideas(),
        Collection::KanbanCards => kanban_cards(),
        Collection::PendingRegistrations => pending_registrations(),
        Collection::RejectedRegistrations => json!([]),
        Collection::AdminLog => admin_log(),
        Collection::Notifications => notifications(),
        Collection::AcknowledgedActions => json!([]),
    }
}

fn users() -> Value {
    json!([
        {
            "id": "USR-001",
            "name": "Admin",
            "email": "admin@x.com",
            "role": "admin",
            "department": "Innovation Office",
            "joinedAt": "2023-09-01T09:00:00Z"
        },
        {
            "id": "USR-002",
            "name": "Rahul Mehta",
            "email": "rahul@x.com",
            "role": "member",
            "department": "Operations",
            "joinedAt": "2023-10-12T10:30:00Z"
        },
        {
            "id": "USR-003",
            "name": "Sara Lee",
            "email": "sara@x.com",
            "role": "member",
            "department": "Finance",
            "joinedAt": "2024-01-08T14:15:00Z"
        }
    ])
}

fn pending_registrations() -> Value {
    json!([
        {
            "email": "kavita@x.com",
            "name": "Kavita Rao",
            "department": "Human Resources",
            "requestedRole": "member",
            "submittedAt": "2024-05-02T08:45:00Z"
        },
        {
            "email": "arjun@x.com",
            "name": "Arjun Nair",
            "department": "Supply Chain",
            "requestedRole": "member",
            "submittedAt": "2024-05-03T11:20:00Z"
        }
    ])
}

fn challenges() -> Value {
    // (id, title, owner, priority, stage, approvalStatus)
    let rows: [(&str, &str, &str, &str, &str, Option<&str>); SEED_CHALLENGE_COUNT] = [
        ("CH-001", "Reduce new-hire onboarding time", "Rahul Mehta", "High", "Ideation & Evaluation", None),
        ("CH-002", "Cut warehouse energy use", "Sara Lee", "Medium", "POC & Pilot", Some("Approved")),
        ("CH-003", "Predict customer churn", "Rahul Mehta", "High", "Scaled & Deployed", Some("Approved")),
        ("CH-004", "Paperless invoicing", "Sara Lee", "Low", "POC & Pilot", None),
        ("CH-005", "Supplier risk scoring", "Rahul Mehta", "Medium", "Parking Lot", Some("Rejected")),
        ("CH-006", "Smarter field service scheduling", "Sara Lee", "High", "Ideation & Evaluation", Some("Approved")),
        ("CH-007", "Track scope 3 emissions", "Rahul Mehta", "Medium", "Challenge Submitted", Some("Approved")),
        ("CH-008", "Internal knowledge search", "Sara Lee", "Low", "Scaled & Deployed", Some("Approved")),
        ("CH-009", "Meeting room utilization", "Rahul Mehta", "Low", "Challenge Submitted", Some("Pending")),
        ("CH-010", "Predictive maintenance for conveyors", "Sara Lee", "High", "Challenge Submitted", Some("Approved")),
    ];

    Value::Array(
        rows.iter()
            .enumerate()
            .map(|(i, (id, title, owner, priority, stage, approval))| {
                let mut record = json!({
                    "id": id,
                    "title": title,
                    "description": format!("{} across the organization.", title),
                    "owner": owner,
                    "priority": priority,
                    "stage": stage,
                    "createdAt": format!("2024-02-{:02}T09:00:00Z", i + 1),
                    "updatedAt": format!("2024-03-{:02}T09:00:00Z", i + 1),
                });
                if let Some(approval) = approval {
                    record["approvalStatus"] = json!(approval);
                }
                if *approval == Some("Rejected") {
                    record["rejectionReason"] = json!("Overlaps with an existing vendor program");
                    record["reviewedBy"] = json!("Admin");
                }
                record
            })
            .collect(),
    )
}

/// Board order starts as challenge order
fn kanban_cards() -> Value {
    let Value::Array(challenges) = challenges() else {
        return json!([]);
    };

    Value::Array(
        challenges
            .iter()
            .map(|c| {
                json!({
                    "id": c["id"],
                    "title": c["title"],
                    "description": c["description"],
                    "owner": c["owner"],
                    "priority": c["priority"],
                    "stage": c["stage"],
                })
            })
            .collect(),
    )
}

fn challenge_details() -> Value {
    json!([
        {
            "id": "CH-001",
            "problemStatement": "New hires take six weeks to reach full productivity.",
            "expectedOutcome": "Halve ramp-up time within two quarters.",
            "ideas": [
                { "id": "ID-0001", "title": "Buddy program", "submittedBy": "Sara Lee", "status": "Accepted" },
                { "id": "ID-0002", "title": "Self-paced onboarding portal", "submittedBy": "Rahul Mehta", "status": "In Review" }
            ]
        },
        {
            "id": "CH-002",
            "problemStatement": "Warehouse lighting and HVAC run at full load overnight.",
            "ideas": [ { "id": "ID-0003" } ]
        },
        {
            "id": "CH-003",
            "problemStatement": "Churn is detected only after contracts lapse.",
            "ideas": [ { "id": "ID-0004" } ]
        },
        {
            "id": "CH-004",
            "problemStatement": "Invoices are still printed and scanned.",
            "ideas": [ { "id": "ID-0005" } ]
        },
        {
            "id": "CH-006",
            "problemStatement": "Technicians cross the city twice a day.",
            "ideas": [ { "id": "ID-0042" } ]
        }
    ])
}

fn ideas() -> Value {
    json!([
        {
            "id": "ID-0001",
            "challengeId": "CH-001",
            "title": "Buddy program",
            "description": "Pair every new hire with a tenured colleague.",
            "submittedBy": "Sara Lee",
            "status": "Accepted",
            "createdAt": "2024-02-10T10:00:00Z",
            "updatedAt": "2024-02-12T10:00:00Z"
        },
        {
            "id": "ID-0002",
            "challengeId": "CH-001",
            "title": "Self-paced onboarding portal",
            "description": "Bundle training material into a single portal.",
            "submittedBy": "Rahul Mehta",
            "status": "In Review",
            "createdAt": "2024-02-11T10:00:00Z",
            "updatedAt": "2024-02-11T10:00:00Z"
        },
        {
            "id": "ID-0003",
            "challengeId": "CH-002",
            "title": "Occupancy-driven lighting",
            "description": "Motion sensors per aisle.",
            "submittedBy": "Rahul Mehta",
            "approvalStatus": "Approved",
            "status": "Accepted",
            "createdAt": "2024-02-15T10:00:00Z",
            "updatedAt": "2024-02-18T10:00:00Z"
        },
        {
            "id": "ID-0004",
            "challengeId": "CH-003",
            "title": "Usage-decline early warning",
            "description": "Alert account managers when weekly usage drops.",
            "submittedBy": "Sara Lee",
            "status": "POC & Pilot",
            "createdAt": "2024-02-20T10:00:00Z",
            "updatedAt": "2024-02-20T10:00:00Z"
        },
        {
            "id": "ID-0005",
            "challengeId": "CH-004",
            "title": "Print everything twice",
            "description": "Keep a paper backup of each invoice.",
            "submittedBy": "Rahul Mehta",
            "status": "Declined",
            "createdAt": "2024-02-21T10:00:00Z",
            "updatedAt": "2024-02-22T10:00:00Z"
        },
        {
            "id": "ID-0042",
            "challengeId": "CH-006",
            "title": "Route batching by district",
            "description": "Group same-day jobs by district before dispatch.",
            "submittedBy": "Rahul Mehta",
            "approvalStatus": "Pending",
            "status": "Pending",
            "createdAt": "2024-04-01T10:00:00Z",
            "updatedAt": "2024-04-01T10:00:00Z"
        }
    ])
}

fn admin_log() -> Value {
    json!([
        {
            "id": "log-seed-0001",
            "action": "Rejected Challenge",
            "itemType": "Challenge",
            "itemName": "Supplier risk scoring",
            "adminName": "Admin",
            "status": "Rejected",
            "details": "Overlaps with an existing vendor program",
            "timestamp": "2024-03-05T16:00:00Z"
        }
    ])
}

fn notifications() -> Value {
    json!([
        {
            "id": "ntf-0001",
            "type": "stage",
            "title": "Challenge moved",
            "text": "Predict customer churn moved to Scaled & Deployed",
            "time": "2024-03-03T12:00:00Z",
            "unread": true,
            "link": "/challenges/CH-003"
        },
        {
            "id": "ntf-0002",
            "type": "system",
            "title": "Welcome",
            "text": "The innovation pipeline is live.",
            "time": "2023-09-01T09:00:00Z",
            "unread": false,
            "link": "/"
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AdminLogEntry, Challenge, ChallengeDetail, Idea, KanbanCard, Notification,
        RegistrationRequest, User,
    };

    #[test]
    fn test_every_seed_decodes_into_its_record_type() {
        let users: Vec<User> = serde_json::from_value(users()).unwrap();
        let challenges: Vec<Challenge> = serde_json::from_value(challenges()).unwrap();
        let details: Vec<ChallengeDetail> = serde_json::from_value(challenge_details()).unwrap();
        let ideas: Vec<Idea> = serde_json::from_value(ideas()).unwrap();
        let cards: Vec<KanbanCard> = serde_json::from_value(kanban_cards()).unwrap();
        let pending: Vec<RegistrationRequest> =
            serde_json::from_value(pending_registrations()).unwrap();
        let log: Vec<AdminLogEntry> = serde_json::from_value(admin_log()).unwrap();
        let notifications: Vec<Notification> = serde_json::from_value(notifications()).unwrap();

        assert_eq!(users.len(), 3);
        assert_eq!(challenges.len(), SEED_CHALLENGE_COUNT);
        assert_eq!(cards.len(), SEED_CHALLENGE_COUNT);
        assert!(!details.is_empty());
        assert!(!ideas.is_empty());
        assert_eq!(pending.len(), 2);
        assert_eq!(log.len(), 1);
        assert_eq!(notifications.len(), 2);
    }

    #[test]
    fn test_every_detail_idea_exists() {
        let details: Vec<ChallengeDetail> = serde_json::from_value(challenge_details()).unwrap();
        let ideas: Vec<Idea> = serde_json::from_value(ideas()).unwrap();
        for detail in details {
            for summary in detail.ideas {
                assert!(ideas.iter().any(|i| i.id == summary.id), "{}", summary.id);
            }
        }
    }
}
