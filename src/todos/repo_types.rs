use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            other => Err(format!("unknown priority {other:?}")),
        }
    }
}

/// Todo record in the database. `priority` holds one of `Priority`'s names.
#[derive(Debug, Clone, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub due_date: OffsetDateTime,
    pub completed: bool,
    pub completed_at: Option<OffsetDateTime>,
    pub priority: String,
    pub user_email: String,
    pub created_at: OffsetDateTime,
}

impl Todo {
    pub fn priority(&self) -> Priority {
        self.priority.parse().unwrap_or_default()
    }

    pub fn is_overdue(&self, now: OffsetDateTime) -> bool {
        !self.completed && self.due_date < now
    }

    /// Completing stamps `completed_at` once; reopening clears it.
    pub fn set_completed(&mut self, completed: bool, now: OffsetDateTime) {
        self.completed = completed;
        if completed {
            self.completed_at.get_or_insert(now);
        } else {
            self.completed_at = None;
        }
    }
}

/// Insert payload, already validated.
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub user_id: Uuid,
    pub name: String,
    pub due_date: OffsetDateTime,
    pub priority: Priority,
    pub user_email: String,
}
