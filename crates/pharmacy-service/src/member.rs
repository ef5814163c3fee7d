//! # Member Service
//!
//! Loyalty members: registration, profile edits and point balances.
//!
//! ## Search
//! ```text
//! keyword ──► exact phone ──┐
//!         ──► name contains ├──► merge_unique (first hit wins) ──► results
//!         ──► exact card no ┘
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use pharmacy_core::member::{merge_unique, next_member_id, MemberFilter, MemberStats, MemberUpdate, NewMember};
use pharmacy_core::validation::{validate_page, validate_points, validate_search_query};
use pharmacy_core::{CoreError, Member, Page};
use pharmacy_db::Database;

use crate::error::{ServiceError, ServiceResult};

/// Window of the "new members" statistic.
const NEW_MEMBER_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct MemberService {
    db: Arc<Database>,
}

impl MemberService {
    pub fn new(db: Arc<Database>) -> Self {
        MemberService { db }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub async fn get(&self, member_id: &str) -> ServiceResult<Member> {
        Ok(self.db.members().require(member_id.trim()).await?)
    }

    pub async fn by_phone(&self, phone: &str) -> ServiceResult<Member> {
        let phone = phone.trim();
        self.db
            .members()
            .by_phone(phone)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member", phone))
    }

    /// Phone, name and card number matches, deduplicated. An empty keyword
    /// finds nothing.
    pub async fn search(&self, keyword: &str) -> ServiceResult<Vec<Member>> {
        let keyword = validate_search_query(keyword)?;
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        let members = self.db.members();
        let by_phone = members.by_phone(&keyword).await?;
        let by_name = members.name_contains(&keyword).await?;
        let by_card = members.by_card_no(&keyword).await?;

        Ok(merge_unique(by_phone.into_iter().chain(by_name).chain(by_card)))
    }

    pub async fn is_phone_exists(&self, phone: &str) -> ServiceResult<bool> {
        Ok(self.db.members().phone_taken(phone.trim(), None).await?)
    }

    /// The id [`create`](Self::create) would assign next.
    pub async fn next_id(&self) -> ServiceResult<String> {
        Ok(next_member_id(self.db.members().ids().await?))
    }

    pub async fn list(&self) -> ServiceResult<Vec<Member>> {
        self.filter(MemberFilter::default()).await
    }

    pub async fn filter(&self, filter: MemberFilter) -> ServiceResult<Vec<Member>> {
        Ok(self.db.members().filter(&filter).await?)
    }

    pub async fn page(&self, page: u32, size: u32) -> ServiceResult<Page<Member>> {
        let (page, size) = validate_page(page, size)?;
        let (rows, total) = self.db.members().page(page, size).await?;
        Ok(Page::new(rows, page, size, total))
    }

    /// Totals, VIPs and members registered in the last 30 days.
    pub async fn stats(&self) -> ServiceResult<MemberStats> {
        let since = Utc::now() - Duration::days(NEW_MEMBER_DAYS);
        Ok(self.db.members().stats(since).await?)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Registers a member.
    ///
    /// ## Errors
    /// - Validation: blank name, bad phone, bad level
    /// - Conflict: the phone or the supplied id is taken
    pub async fn create(&self, input: NewMember) -> ServiceResult<Member> {
        input.validate()?;

        let phone = input.phone.trim().to_string();
        if self.db.members().phone_taken(&phone, None).await? {
            return Err(ServiceError::Conflict(format!("phone {phone} is already registered")));
        }

        let member_id = match input.member_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.next_id().await?,
        };

        let member = Member {
            member_id,
            name: input.name.trim().to_string(),
            phone,
            card_no: input.card_no,
            points: input.points.unwrap_or(0),
            level: input.level.unwrap_or(1),
            create_time: Utc::now(),
            remark: input.remark,
        };
        self.db.members().insert(&member).await?;

        info!(member_id = %member.member_id, "Member registered");
        Ok(member)
    }

    /// Applies the present fields of `changes`.
    pub async fn update(&self, member_id: &str, changes: MemberUpdate) -> ServiceResult<Member> {
        changes.validate()?;
        let mut member = self.get(member_id).await?;

        if let Some(phone) = changes.phone.as_deref().map(str::trim) {
            if self.db.members().phone_taken(phone, Some(&member.member_id)).await? {
                return Err(ServiceError::Conflict(format!(
                    "phone {phone} belongs to another member"
                )));
            }
        }

        changes.apply(&mut member);
        if !self.db.members().update(&member).await? {
            return Err(ServiceError::not_found("Member", member_id));
        }

        info!(member_id = %member.member_id, "Member updated");
        Ok(member)
    }

    pub async fn delete(&self, member_id: &str) -> ServiceResult<bool> {
        let deleted = self.db.members().delete(member_id.trim()).await?;
        if deleted {
            info!(member_id = %member_id, "Member deleted");
        }
        Ok(deleted)
    }

    /// Deletes the listed members; returns how many existed.
    pub async fn batch_delete(&self, member_ids: &[String]) -> ServiceResult<u64> {
        let deleted = self.db.members().delete_many(member_ids).await?;
        info!(requested = member_ids.len(), deleted, "Members deleted");
        Ok(deleted)
    }

    // =========================================================================
    // Points
    // =========================================================================

    /// Credits `points`; returns the new balance.
    pub async fn add_points(&self, member_id: &str, points: i64) -> ServiceResult<i64> {
        validate_points(points)?;
        let balance = self
            .db
            .members()
            .add_points(member_id, points)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member", member_id))?;

        info!(member_id = %member_id, points, balance, "Points added");
        Ok(balance)
    }

    /// Debits `points` if the balance covers them; returns the new balance.
    ///
    /// ## Errors
    /// - NotFound: no such member
    /// - Validation: the balance is too small (left unchanged)
    pub async fn use_points(&self, member_id: &str, points: i64) -> ServiceResult<i64> {
        validate_points(points)?;
        match self.db.members().use_points(member_id, points).await? {
            Some(balance) => {
                info!(member_id = %member_id, points, balance, "Points used");
                Ok(balance)
            }
            None => {
                let member = self.get(member_id).await?;
                Err(CoreError::InsufficientPoints {
                    member_id: member.member_id,
                    balance: member.points,
                    requested: points,
                }
                .into())
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
