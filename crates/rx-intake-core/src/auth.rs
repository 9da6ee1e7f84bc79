//! Caller identity and role checks.
//!
//! Token plumbing lives outside this crate; operations receive an already
//! authenticated [`Caller`].

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Pharmacist,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Role::Patient),
            "pharmacist" => Some(Role::Pharmacist),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn patient(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: Role::Patient,
        }
    }

    pub fn pharmacist(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: Role::Pharmacist,
        }
    }

    pub fn admin(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: Role::Admin,
        }
    }

    /// Pharmacist or admin.
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Pharmacist | Role::Admin)
    }

    pub fn ensure_staff(&self) -> CoreResult<()> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "pharmacist or admin role required".into(),
            ))
        }
    }

    pub fn ensure_owner(&self, owner_id: &str) -> CoreResult<()> {
        if self.user_id == owner_id {
            Ok(())
        } else {
            Err(CoreError::Forbidden("not the owner of this record".into()))
        }
    }

    pub fn ensure_owner_or_staff(&self, owner_id: &str) -> CoreResult<()> {
        if self.is_staff() {
            return Ok(());
        }
        self.ensure_owner(owner_id)
    }
}
