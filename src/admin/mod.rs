/// Admin and Approval System
///
/// Handles administrative decisions over registrations, challenges and
/// ideas, and the append-only history of those decisions.

pub mod approval;
pub mod audit;

pub use approval::{ApprovalAction, ApprovalCommand, ApprovalWorkflow};
pub use audit::{AdminLog, DEFAULT_LOG_CAPACITY};
