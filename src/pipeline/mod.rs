/// Work item lifecycle outside of approval decisions
///
/// Submission of challenges, ideas and registrations, cascade deletion,
/// and read models (detail views, filtered lists, dashboard counts).
/// Multi-collection writes go through a single unit of work.

use crate::{
    auth::{Actor, Role},
    error::{PipelineError, PipelineResult},
    models::{
        next_sequential_id, ApprovalStatus, Challenge, ChallengeDetail, Idea, IdeaSummary,
        KanbanCard, Priority, RegistrationRequest, Stage,
    },
    status::{filter_challenges, filter_ideas, resolve_challenge_status, resolve_idea_status, StatusCounts},
    store::{tables, EntityStore},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Challenge submission form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChallenge {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub problem_statement: String,
    #[serde(default)]
    pub expected_outcome: Option<String>,
}

/// Idea submission form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIdea {
    pub challenge_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegistration {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub requested_role: Role,
}

/// Idea row of a detail view, built from the idea record itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaSummaryView {
    pub id: String,
    pub title: String,
    pub submitted_by: String,
    pub status: ApprovalStatus,
}

/// Challenge with its detail record and current idea summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDetailView {
    pub challenge: Challenge,
    pub status: ApprovalStatus,
    pub problem_statement: String,
    pub expected_outcome: Option<String>,
    pub ideas: Vec<IdeaSummaryView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneCount {
    pub stage: Stage,
    pub cards: usize,
}

/// Admin overview counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub challenges: StatusCounts,
    pub ideas: StatusCounts,
    pub pending_registrations: usize,
    pub users: usize,
    pub lanes: Vec<LaneCount>,
}

/// Pipeline service
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<EntityStore>,
}

impl Pipeline {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Submit a challenge
    ///
    /// Privileged submitters are approved immediately; nobody's submission
    /// is logged. The challenge, its board card (appended to the first lane)
    /// and its detail record are written together.
    pub async fn submit_challenge(
        &self,
        actor: &Actor,
        form: NewChallenge,
    ) -> PipelineResult<Challenge> {
        let title = form.title.trim();
        if title.is_empty() {
            return Err(PipelineError::Validation(
                "Challenge title cannot be empty".to_string(),
            ));
        }

        let mut challenges = self.store.get(tables::CHALLENGES).await?;
        let mut cards = self.store.get(tables::KANBAN_CARDS).await?;
        let mut details = self.store.get(tables::CHALLENGE_DETAILS).await?;

        let id = next_sequential_id("CH", 3, challenges.iter().map(|c| c.id.as_str()));
        let now = Utc::now();
        let challenge = Challenge {
            id: id.clone(),
            title: title.to_string(),
            description: form.description,
            owner: actor.name.clone(),
            owner_email: form.owner_email,
            department: form.department,
            priority: form.priority,
            stage: Stage::ChallengeSubmitted,
            approval_status: Some(submission_status(actor)),
            rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        challenges.push(challenge.clone());
        cards.push(KanbanCard::from_challenge(&challenge));
        details.retain(|d| d.id != id);
        details.push(ChallengeDetail {
            id: id.clone(),
            problem_statement: form.problem_statement,
            expected_outcome: form.expected_outcome,
            ideas: Vec::new(),
        });

        let mut uow = self.store.begin();
        uow.set(tables::CHALLENGES, &challenges)?;
        uow.set(tables::KANBAN_CARDS, &cards)?;
        uow.set(tables::CHALLENGE_DETAILS, &details)?;
        uow.commit().await?;

        info!(
            "{} submitted challenge {} ({})",
            actor.name,
            id,
            submission_status(actor).as_str()
        );
        Ok(challenge)
    }

    /// Submit an idea against an existing challenge
    pub async fn submit_idea(&self, actor: &Actor, form: NewIdea) -> PipelineResult<Option<Idea>> {
        let title = form.title.trim();
        if title.is_empty() {
            return Err(PipelineError::Validation(
                "Idea title cannot be empty".to_string(),
            ));
        }

        let challenges = self.store.get(tables::CHALLENGES).await?;
        if !challenges.iter().any(|c| c.id == form.challenge_id) {
            debug!("Idea submission ignored, no challenge {}", form.challenge_id);
            return Ok(None);
        }

        let mut ideas = self.store.get(tables::IDEAS).await?;
        let mut details = self.store.get(tables::CHALLENGE_DETAILS).await?;

        let id = next_sequential_id("ID", 4, ideas.iter().map(|i| i.id.as_str()));
        let status = submission_status(actor);
        let now = Utc::now();
        let idea = Idea {
            id: id.clone(),
            challenge_id: Some(form.challenge_id.clone()),
            title: title.to_string(),
            description: form.description,
            submitted_by: actor.name.clone(),
            approval_status: Some(status),
            status: Some(
                match status {
                    ApprovalStatus::Approved => "Accepted",
                    _ => "Pending",
                }
                .to_string(),
            ),
            rejection_reason: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        ideas.push(idea.clone());

        match details.iter_mut().find(|d| d.id == form.challenge_id) {
            Some(detail) => detail.ideas.push(IdeaSummary::link(id.clone())),
            None => details.push(ChallengeDetail {
                id: form.challenge_id.clone(),
                problem_statement: String::new(),
                expected_outcome: None,
                ideas: vec![IdeaSummary::link(id.clone())],
            }),
        }

        let mut uow = self.store.begin();
        uow.set(tables::IDEAS, &ideas)?;
        uow.set(tables::CHALLENGE_DETAILS, &details)?;
        uow.commit().await?;

        info!(
            "{} submitted idea {} for {} ({})",
            actor.name,
            id,
            form.challenge_id,
            status.as_str()
        );
        Ok(Some(idea))
    }

    /// Queue a registration request
    ///
    /// Refused when the email already belongs to a user or a pending
    /// request. Resubmitting after a rejection clears the old rejection.
    pub async fn submit_registration(&self, form: NewRegistration) -> PipelineResult<bool> {
        let email = form.email.trim().to_lowercase();
        if email.is_empty() || form.name.trim().is_empty() {
            return Err(PipelineError::Validation(
                "Registration needs an email and a name".to_string(),
            ));
        }

        let users = self.store.get(tables::USERS).await?;
        let mut pending = self.store.get(tables::PENDING_REGISTRATIONS).await?;
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&email))
            || pending.iter().any(|r| r.email.eq_ignore_ascii_case(&email))
        {
            debug!("Registration for {} already exists", email);
            return Ok(false);
        }

        let mut rejected = self.store.get(tables::REJECTED_REGISTRATIONS).await?;
        let resubmission = rejected.iter().any(|r| r.email.eq_ignore_ascii_case(&email));
        rejected.retain(|r| !r.email.eq_ignore_ascii_case(&email));

        pending.push(RegistrationRequest {
            email: email.clone(),
            name: form.name.trim().to_string(),
            department: form.department,
            requested_role: form.requested_role,
            submitted_at: Utc::now(),
            rejection_reason: None,
            rejected_by: None,
            rejected_at: None,
        });

        let mut uow = self.store.begin();
        uow.set(tables::PENDING_REGISTRATIONS, &pending)?;
        if resubmission {
            uow.set(tables::REJECTED_REGISTRATIONS, &rejected)?;
        }
        uow.commit().await?;

        info!("Registration request queued for {}", email);
        Ok(true)
    }

    /// Delete a challenge with its card, detail record and linked ideas
    pub async fn delete_challenge(&self, id: &str) -> PipelineResult<bool> {
        let mut challenges = self.store.get(tables::CHALLENGES).await?;
        let before = challenges.len();
        challenges.retain(|c| c.id != id);
        if challenges.len() == before {
            debug!("Delete ignored, no challenge {}", id);
            return Ok(false);
        }

        let mut cards = self.store.get(tables::KANBAN_CARDS).await?;
        let mut details = self.store.get(tables::CHALLENGE_DETAILS).await?;
        let mut ideas = self.store.get(tables::IDEAS).await?;

        let linked: HashSet<String> = details
            .iter()
            .filter(|d| d.id == id)
            .flat_map(|d| d.ideas.iter().map(|s| s.id.clone()))
            .collect();

        cards.retain(|c| c.id != id);
        details.retain(|d| d.id != id);
        let ideas_before = ideas.len();
        ideas.retain(|i| !linked.contains(&i.id) && i.challenge_id.as_deref() != Some(id));

        let mut uow = self.store.begin();
        uow.set(tables::CHALLENGES, &challenges)?;
        uow.set(tables::KANBAN_CARDS, &cards)?;
        uow.set(tables::CHALLENGE_DETAILS, &details)?;
        uow.set(tables::IDEAS, &ideas)?;
        uow.commit().await?;

        info!(
            "Deleted challenge {} and {} linked idea(s)",
            id,
            ideas_before - ideas.len()
        );
        Ok(true)
    }

    /// Delete an idea and unlink it from every detail record
    pub async fn delete_idea(&self, id: &str) -> PipelineResult<bool> {
        let mut ideas = self.store.get(tables::IDEAS).await?;
        let before = ideas.len();
        ideas.retain(|i| i.id != id);
        if ideas.len() == before {
            return Ok(false);
        }

        let mut details = self.store.get(tables::CHALLENGE_DETAILS).await?;
        for detail in details.iter_mut() {
            detail.ideas.retain(|s| s.id != id);
        }

        let mut uow = self.store.begin();
        uow.set(tables::IDEAS, &ideas)?;
        uow.set(tables::CHALLENGE_DETAILS, &details)?;
        uow.commit().await?;

        info!("Deleted idea {}", id);
        Ok(true)
    }

    /// Challenge detail with idea summaries computed from the idea records
    ///
    /// Ideas appear in detail-list order, followed by ideas that name the
    /// challenge but are missing from the list. Links to ideas that no
    /// longer exist are skipped.
    pub async fn challenge_detail(&self, id: &str) -> PipelineResult<Option<ChallengeDetailView>> {
        let challenges = self.store.get(tables::CHALLENGES).await?;
        let Some(challenge) = challenges.into_iter().find(|c| c.id == id) else {
            return Ok(None);
        };

        let details = self.store.get(tables::CHALLENGE_DETAILS).await?;
        let ideas = self.store.get(tables::IDEAS).await?;
        let detail = details.into_iter().find(|d| d.id == id);

        let mut ordered: Vec<&Idea> = Vec::new();
        let mut seen = HashSet::new();
        if let Some(detail) = &detail {
            for summary in &detail.ideas {
                if let Some(idea) = ideas.iter().find(|i| i.id == summary.id) {
                    if seen.insert(idea.id.as_str()) {
                        ordered.push(idea);
                    }
                }
            }
        }
        for idea in ideas.iter().filter(|i| i.challenge_id.as_deref() == Some(id)) {
            if seen.insert(idea.id.as_str()) {
                ordered.push(idea);
            }
        }

        let summaries = ordered
            .into_iter()
            .map(|idea| IdeaSummaryView {
                id: idea.id.clone(),
                title: idea.title.clone(),
                submitted_by: idea.submitted_by.clone(),
                status: resolve_idea_status(idea),
            })
            .collect();

        let (problem_statement, expected_outcome) = match detail {
            Some(detail) => (detail.problem_statement, detail.expected_outcome),
            None => (String::new(), None),
        };

        Ok(Some(ChallengeDetailView {
            status: resolve_challenge_status(&challenge),
            challenge,
            problem_statement,
            expected_outcome,
            ideas: summaries,
        }))
    }

    /// Challenges, optionally only those resolving to `status`
    pub async fn challenges(&self, status: Option<ApprovalStatus>) -> PipelineResult<Vec<Challenge>> {
        let challenges = self.store.get(tables::CHALLENGES).await?;
        Ok(match status {
            Some(status) => filter_challenges(&challenges, status).cloned().collect(),
            None => challenges,
        })
    }

    /// Ideas, optionally only those resolving to `status`
    pub async fn ideas(&self, status: Option<ApprovalStatus>) -> PipelineResult<Vec<Idea>> {
        let ideas = self.store.get(tables::IDEAS).await?;
        Ok(match status {
            Some(status) => filter_ideas(&ideas, status).cloned().collect(),
            None => ideas,
        })
    }

    pub async fn dashboard(&self) -> PipelineResult<Dashboard> {
        let challenges = self.store.get(tables::CHALLENGES).await?;
        let ideas = self.store.get(tables::IDEAS).await?;
        let pending = self.store.get(tables::PENDING_REGISTRATIONS).await?;
        let users = self.store.get(tables::USERS).await?;
        let cards = self.store.get(tables::KANBAN_CARDS).await?;

        let challenge_counts = StatusCounts::of_challenges(&challenges);
        let idea_counts = StatusCounts::of_ideas(&ideas);
        debug!(
            "Dashboard over {} challenges and {} ideas",
            challenge_counts.total(),
            idea_counts.total()
        );

        Ok(Dashboard {
            challenges: challenge_counts,
            ideas: idea_counts,
            pending_registrations: pending.len(),
            users: users.len(),
            lanes: Stage::ALL
                .iter()
                .map(|&stage| LaneCount {
                    stage,
                    cards: cards.iter().filter(|c| c.stage == stage).count(),
                })
                .collect(),
        })
    }
}

fn submission_status(actor: &Actor) -> ApprovalStatus {
    if actor.privileged {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Pending
    }
}
