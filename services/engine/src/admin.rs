//! Administrator operations over all accounts

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::auth::{Plan, PublicUser, Role, User};
use crate::records::{Record, RecordError, RecordManager};
use crate::store::{StoreError, UserStore};

/// Most accounts returned by one listing
pub const USER_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("User not found")]
    UserNotFound,

    #[error("Cannot delete an admin user")]
    ProtectedUser,

    #[error(transparent)]
    Records(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub plan: Plan,
    pub role: Role,
    pub record_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_users: usize,
    pub total_records: usize,
    pub free_users: usize,
    pub premium_users: usize,
}

pub struct AdminService {
    users: Arc<dyn UserStore>,
    records: Arc<RecordManager>,
}

impl AdminService {
    pub fn new(users: Arc<dyn UserStore>, records: Arc<RecordManager>) -> Self {
        Self { users, records }
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, AdminError> {
        let users = self.users.list(USER_PAGE_LIMIT).await?;
        let mut summaries = Vec::with_capacity(users.len());
        for user in users {
            let usage = self.records.usage(&user).await?;
            summaries.push(UserSummary {
                id: user.id,
                email: user.email,
                plan: user.plan,
                role: user.role,
                record_count: usage.record_count,
                created_at: user.created_at,
            });
        }
        Ok(summaries)
    }

    pub async fn stats(&self) -> Result<Stats, AdminError> {
        Ok(Stats {
            total_users: self.users.count(None).await?,
            total_records: self.records.total_records().await?,
            free_users: self.users.count(Some(Plan::Free)).await?,
            premium_users: self.users.count(Some(Plan::Premium)).await?,
        })
    }

    pub async fn set_plan(&self, user_id: &str, plan: Plan) -> Result<PublicUser, AdminError> {
        let user = self
            .users
            .set_plan(user_id, plan)
            .await?
            .ok_or(AdminError::UserNotFound)?;

        info!(user_id, plan = %plan, "Changed plan");
        Ok(PublicUser::from(&user))
    }

    /// Remove an account and all of its records, each remote first.
    /// Admin accounts are refused. If a record cannot be removed the
    /// account is kept along with the records not yet deleted.
    pub async fn delete_user(&self, user_id: &str) -> Result<usize, AdminError> {
        let user = self.find_user(user_id).await?;
        if user.is_admin() {
            return Err(AdminError::ProtectedUser);
        }

        let removed = self.records.purge_owner(&user.id).await?;
        self.users.delete(&user.id).await?;

        info!(user_id, email = %user.email, records_removed = removed, "Deleted user");
        Ok(removed)
    }

    pub async fn user_records(&self, user_id: &str) -> Result<Vec<Record>, AdminError> {
        let user = self.find_user(user_id).await?;
        Ok(self.records.admin_list_records(&user.id).await?)
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<Record, AdminError> {
        let record = self.records.admin_delete_record(record_id).await?;
        info!(record_id, owner_id = %record.owner_id, fqdn = %record.fqdn, "Admin deleted record");
        Ok(record)
    }

    async fn find_user(&self, user_id: &str) -> Result<User, AdminError> {
        self.users
            .find(user_id)
            .await?
            .ok_or(AdminError::UserNotFound)
    }
}
