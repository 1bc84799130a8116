/// Innovation Pipeline
///
/// Tracks challenges and ideas through submission, approval and staged
/// progress, and exposes the kanban board used to move challenges between
/// pipeline stages. This binary is the command surface over those engines.

mod admin;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod kanban;
mod models;
mod notifications;
mod pipeline;
mod status;
mod store;

use admin::{ApprovalAction, ApprovalCommand};
use auth::{Actor, Role};
use clap::{Parser, Subcommand};
use config::{PipelineConfig, StoreBackend};
use context::AppContext;
use error::PipelineError;
use kanban::MoveCard;
use models::{ApprovalStatus, ItemKind, Priority, Stage};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pipeline")]
#[command(about = "Challenge and idea approval workflow with a staged kanban board")]
struct Cli {
    /// Display name of the acting user
    #[arg(long = "as", env = "PIPELINE_ACTOR", default_value = "Admin")]
    actor: String,

    /// Act with elevated privilege
    #[arg(long, env = "PIPELINE_PRIVILEGED")]
    privileged: bool,

    /// SQLite database location (overrides PIPELINE_DB_LOCATION)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep collections in memory for this invocation only
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show every lane with its ordered cards
    Board,
    /// Show the ordered cards of one lane
    Lane { stage: String },
    /// Move a card to a lane by index or by pointer position; omitting
    /// both appends
    Move {
        card_id: String,
        lane: String,
        #[arg(conflicts_with = "pointer_y")]
        index: Option<usize>,
        /// Pointer offset from the top of the target lane
        #[arg(long, allow_negative_numbers = true)]
        pointer_y: Option<f64>,
        /// Rendered height of each card in the target lane
        #[arg(long, default_value_t = 100.0)]
        card_height: f64,
    },
    /// Approve a registration (by email), challenge or idea
    Approve {
        kind: String,
        id: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Reject a registration (by email), challenge or idea
    Reject {
        kind: String,
        id: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Show the notification feed for the acting user
    Feed,
    /// Publish a notification to every user
    Notify {
        title: String,
        text: String,
        #[arg(long, default_value = "system")]
        kind: String,
        #[arg(long, default_value = "/")]
        link: String,
    },
    /// Mark a notification read, or all of them with --all
    Ack {
        id: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Show recent admin log entries, newest first
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show status counts
    Dashboard,
    /// List challenges, optionally by resolved status
    Challenges {
        #[arg(long)]
        status: Option<String>,
    },
    /// List ideas, optionally by resolved status
    Ideas {
        #[arg(long)]
        status: Option<String>,
    },
    /// Show a challenge with its current idea summaries
    Detail { id: String },
    /// Submit a challenge as the acting user
    SubmitChallenge {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long, default_value = "")]
        problem: String,
    },
    /// Submit an idea against a challenge as the acting user
    SubmitIdea {
        challenge_id: String,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Request an account
    Register {
        email: String,
        name: String,
        #[arg(long)]
        department: Option<String>,
        #[arg(long, default_value = "member")]
        role: String,
    },
    /// Delete a challenge with its card, detail and linked ideas
    DeleteChallenge { id: String },
    /// Delete an idea
    DeleteIdea { id: String },
    /// Overwrite every collection with seed data
    Reset,
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = PipelineConfig::from_env()?;
    if cli.memory {
        config.storage.backend = StoreBackend::Memory;
    }
    if let Some(db) = cli.db.clone() {
        config.storage.database = db;
    }

    // Initialize logging; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("pipeline={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ctx = AppContext::new(config).await?;
    let actor = resolve_actor(&ctx, &cli.actor, cli.privileged).await?;
    info!("Acting as {} (privileged: {})", actor.name, actor.privileged);

    run(&ctx, &actor, cli.command).await
}

async fn run(ctx: &AppContext, actor: &Actor, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Board => print_json(&ctx.kanban.board().await?),
        Command::Lane { stage } => {
            let stage = Stage::from_str(&stage)?;
            print_json(&ctx.kanban.lane(stage).await?)
        }
        Command::Move {
            card_id,
            lane,
            index,
            pointer_y,
            card_height,
        } => {
            let target_lane = Stage::from_str(&lane)?;
            let outcome = match pointer_y {
                Some(pointer_y) => {
                    if card_height.is_nan() || card_height <= 0.0 {
                        return Err(PipelineError::Validation(
                            "Card height must be positive".to_string(),
                        )
                        .into());
                    }
                    ctx.kanban
                        .drop_card(&card_id, target_lane, pointer_y, card_height)
                        .await?
                }
                None => {
                    ctx.kanban
                        .apply(&MoveCard {
                            card_id: card_id.clone(),
                            target_lane,
                            target_index: index.unwrap_or(usize::MAX),
                        })
                        .await?
                }
            };
            if !outcome.success {
                return Err(PipelineError::NotFound(format!("Card {}", card_id)).into());
            }
            print_json(&outcome)
        }
        Command::Approve { kind, id, note } => {
            let command = ApprovalCommand {
                action: ApprovalAction::Approve,
                kind: ItemKind::from_str(&kind)?,
                id,
                admin_name: actor.name.clone(),
                reason: note,
            };
            apply_approval(ctx, actor, &command).await
        }
        Command::Reject { kind, id, reason } => {
            let command = ApprovalCommand {
                action: ApprovalAction::Reject,
                kind: ItemKind::from_str(&kind)?,
                id,
                admin_name: actor.name.clone(),
                reason: Some(reason),
            };
            apply_approval(ctx, actor, &command).await
        }
        Command::Feed => print_json(&ctx.notifications.feed(actor).await?),
        Command::Notify {
            title,
            text,
            kind,
            link,
        } => {
            if !actor.privileged {
                anyhow::bail!("{} is not allowed to publish notifications", actor.name);
            }
            print_json(&ctx.notifications.notify(&kind, &title, &text, &link).await?)
        }
        Command::Ack { id, all } => {
            match (id, all) {
                (_, true) => ctx.notifications.acknowledge_all(actor).await?,
                (Some(id), false) => ctx.notifications.acknowledge(&id).await?,
                (None, false) => {
                    return Err(
                        PipelineError::Validation("Pass a notification id or --all".to_string())
                            .into(),
                    )
                }
            }
            print_json(&ctx.notifications.feed(actor).await?)
        }
        Command::Log { limit } => print_json(&ctx.admin_log.recent(limit).await?),
        Command::Dashboard => print_json(&ctx.pipeline.dashboard().await?),
        Command::Challenges { status } => {
            let status = status.as_deref().map(ApprovalStatus::from_str).transpose()?;
            print_json(&ctx.pipeline.challenges(status).await?)
        }
        Command::Ideas { status } => {
            let status = status.as_deref().map(ApprovalStatus::from_str).transpose()?;
            print_json(&ctx.pipeline.ideas(status).await?)
        }
        Command::Detail { id } => match ctx.pipeline.challenge_detail(&id).await? {
            Some(view) => print_json(&view),
            None => Err(PipelineError::NotFound(format!("Challenge {}", id)).into()),
        },
        Command::SubmitChallenge {
            title,
            description,
            priority,
            problem,
        } => {
            let form = pipeline::NewChallenge {
                title,
                description,
                priority: Priority::from_str(&priority)?,
                problem_statement: problem,
                ..Default::default()
            };
            print_json(&ctx.pipeline.submit_challenge(actor, form).await?)
        }
        Command::SubmitIdea {
            challenge_id,
            title,
            description,
        } => {
            let form = pipeline::NewIdea {
                challenge_id: challenge_id.clone(),
                title,
                description,
            };
            match ctx.pipeline.submit_idea(actor, form).await? {
                Some(idea) => print_json(&idea),
                None => Err(PipelineError::NotFound(format!("Challenge {}", challenge_id)).into()),
            }
        }
        Command::Register {
            email,
            name,
            department,
            role,
        } => {
            let form = pipeline::NewRegistration {
                email: email.clone(),
                name,
                department,
                requested_role: Role::from_str(&role)?,
            };
            if ctx.pipeline.submit_registration(form).await? {
                print_json(&json!({ "success": true }))
            } else {
                Err(PipelineError::Conflict(format!("{} is already registered or pending", email))
                    .into())
            }
        }
        Command::DeleteChallenge { id } => {
            if !ctx.pipeline.delete_challenge(&id).await? {
                return Err(PipelineError::NotFound(format!("Challenge {}", id)).into());
            }
            print_json(&json!({ "success": true }))
        }
        Command::DeleteIdea { id } => {
            if !ctx.pipeline.delete_idea(&id).await? {
                return Err(PipelineError::NotFound(format!("Idea {}", id)).into());
            }
            print_json(&json!({ "success": true }))
        }
        Command::Reset => {
            ctx.store.reset_to_seed().await?;
            print_json(&json!({ "success": true }))
        }
        Command::Config => print_json(&*ctx.config),
    }
}

/// Known users take their privilege from their role; `--privileged` can
/// only raise it
async fn resolve_actor(ctx: &AppContext, name: &str, privileged: bool) -> anyhow::Result<Actor> {
    let users = ctx.store.get(store::tables::USERS).await?;
    Ok(match users.iter().find(|u| u.name == name) {
        Some(user) => {
            let mut actor = Actor::from_user(user);
            actor.privileged |= privileged;
            actor
        }
        None if privileged => Actor::admin(name),
        None => Actor::member(name),
    })
}

async fn apply_approval(
    ctx: &AppContext,
    actor: &Actor,
    command: &ApprovalCommand,
) -> anyhow::Result<()> {
    if !actor.privileged {
        anyhow::bail!("{} is not allowed to review submissions", actor.name);
    }

    if ctx.approvals.apply(command).await? {
        return print_json(&json!({ "success": true }));
    }

    let blank = command
        .reason
        .as_deref()
        .map_or(true, |r| r.trim().is_empty());
    if command.action == ApprovalAction::Reject && blank {
        return Err(PipelineError::Validation("A reason is required to reject".to_string()).into());
    }
    Err(PipelineError::NotFound(format!("{} {}", command.kind.label(), command.id)).into())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
