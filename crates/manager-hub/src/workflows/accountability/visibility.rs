use serde::{Deserialize, Serialize};

use super::domain::{Employee, SystemRole};

/// Request-scoped identity of whoever is asking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: String,
    pub role: SystemRole,
    /// Only meaningful for directors.
    #[serde(default)]
    pub can_see_directors: bool,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>, role: SystemRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            can_see_directors: false,
        }
    }

    pub fn seeing_directors(mut self, allowed: bool) -> Self {
        self.can_see_directors = allowed;
        self
    }
}

/// Whether `ctx` may see an employee holding `target` system access.
///
/// Operators are never visible, whoever asks.
pub fn check_view_permission(ctx: &RequestContext, target: Option<SystemRole>) -> bool {
    match (ctx.role, target) {
        (_, Some(SystemRole::Operator)) => false,
        (_, None) => true,
        (SystemRole::Operator, Some(SystemRole::Manager | SystemRole::Director)) => true,
        (SystemRole::Director, Some(SystemRole::Manager)) => true,
        (SystemRole::Director, Some(SystemRole::Director)) => ctx.can_see_directors,
        (SystemRole::Manager, Some(SystemRole::Manager | SystemRole::Director)) => false,
    }
}

pub fn can_view_employee(ctx: &RequestContext, employee: &Employee) -> bool {
    check_view_permission(ctx, employee.system_role)
}

/// Same rule table as [`check_view_permission`], applied to a list.
pub fn filter_visible_employees(ctx: &RequestContext, employees: Vec<Employee>) -> Vec<Employee> {
    employees
        .into_iter()
        .filter(|employee| can_view_employee(ctx, employee))
        .collect()
}
