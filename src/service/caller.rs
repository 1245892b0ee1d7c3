use crate::catalog_store::{Song, UserId};
use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Regular,
}

/// The authenticated user on whose behalf a mutation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Caller {
    pub fn admin(user_id: UserId) -> Self {
        Caller {
            user_id,
            role: UserRole::Admin,
        }
    }

    pub fn regular(user_id: UserId) -> Self {
        Caller {
            user_id,
            role: UserRole::Regular,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Artists are shared by every song, only admins may change them.
    pub fn ensure_admin(&self, action: &str) -> CatalogResult<()> {
        if self.is_admin() {
            return Ok(());
        }
        Err(CatalogError::Forbidden(format!(
            "User {} is not allowed to {}",
            self.user_id, action
        )))
    }

    /// A song may be edited by whoever uploaded it, or by an admin.
    pub fn ensure_can_edit(&self, song: &Song) -> CatalogResult<()> {
        if self.is_admin() || song.uploaded_by == self.user_id {
            return Ok(());
        }
        Err(CatalogError::Forbidden(format!(
            "User {} is not allowed to modify song {}",
            self.user_id, song.id
        )))
    }
}
