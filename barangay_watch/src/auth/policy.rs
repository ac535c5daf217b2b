//! Role policy shared by every administrative and record-mutating operation.

use super::errors::{AuthError, AuthResult};
use super::models::{Role, User, UserId};

/// An operation gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateAdmin,
    DeleteAdmin,
    ListAdmins,
    ToggleTwoFactor { target: UserId, enable: bool },
    MutateReport,
    ReadReports,
    ViewAuditLog,
    ReadTips,
    ManageSettings,
}

impl Action {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateAdmin => "create_admin",
            Action::DeleteAdmin => "delete_admin",
            Action::ListAdmins => "list_admins",
            Action::ToggleTwoFactor { .. } => "toggle_two_factor",
            Action::MutateReport => "mutate_report",
            Action::ReadReports => "read_reports",
            Action::ViewAuditLog => "view_audit_log",
            Action::ReadTips => "read_tips",
            Action::ManageSettings => "manage_settings",
        }
    }
}

/// Decide whether `user` may perform `action`.
pub fn can_perform(user: &User, action: Action) -> bool {
    match action {
        Action::CreateAdmin
        | Action::DeleteAdmin
        | Action::ListAdmins
        | Action::ViewAuditLog
        | Action::ManageSettings => user.role == Role::HeadAdmin,
        // Officials may opt in for themselves but never opt out
        Action::ToggleTwoFactor { target, enable } => {
            user.role == Role::HeadAdmin || (enable && user.id == target)
        }
        Action::MutateReport => user.role.is_official(),
        Action::ReadReports | Action::ReadTips => true,
    }
}

/// [`can_perform`] as a `Result`, for use with `?`.
pub fn authorize(user: &User, action: Action) -> AuthResult<()> {
    if can_perform(user, action) {
        Ok(())
    } else {
        log::warn!(
            "Denied {} for user {} ({})",
            action.name(),
            user.id,
            user.role
        );
        Err(AuthError::Forbidden(format!(
            "role '{}' may not {}",
            user.role,
            action.name()
        )))
    }
}
