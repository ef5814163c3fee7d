//! # Member Rules
//!
//! Member id sequencing, input shapes and search result merging.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Member;
use crate::validation::{validate_level, validate_name, validate_phone, ValidationResult};

/// First id handed out when no sequential id exists yet.
pub const FIRST_MEMBER_ID: &str = "M00001";

/// Returns the numeric part of an `M%05d`-style id.
fn sequence_number(id: &str) -> Option<u64> {
    let digits = id.strip_prefix('M')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next sequential member id after the given existing ids.
///
/// Ids that are not `M` followed by digits are ignored.
///
/// ## Example
/// ```rust
/// use pharmacy_core::member::next_member_id;
///
/// assert_eq!(next_member_id(Vec::<&str>::new()), "M00001");
/// assert_eq!(next_member_id(["M00007", "M00012", "VIP-1"]), "M00013");
/// ```
pub fn next_member_id<I, S>(existing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let max = existing
        .into_iter()
        .filter_map(|id| sequence_number(id.as_ref()))
        .max()
        .unwrap_or(0);
    format!("M{:05}", max + 1)
}

/// Input for registering a member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMember {
    pub member_id: Option<String>,
    pub name: String,
    pub phone: String,
    pub card_no: Option<String>,
    pub points: Option<i64>,
    pub level: Option<i64>,
    pub remark: Option<String>,
}

impl NewMember {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_phone(&self.phone)?;
        if let Some(level) = self.level {
            validate_level(level)?;
        }
        if matches!(self.points, Some(p) if p < 0) {
            return Err(crate::ValidationError::MustNotBeNegative {
                field: "points".to_string(),
            });
        }
        Ok(())
    }
}

/// Changes to an existing member. Absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub card_no: Option<String>,
    pub level: Option<i64>,
    pub remark: Option<String>,
}

impl MemberUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(level) = self.level {
            validate_level(level)?;
        }
        Ok(())
    }

    pub fn apply(self, member: &mut Member) {
        if let Some(v) = self.name {
            member.name = v.trim().to_string();
        }
        if let Some(v) = self.phone {
            member.phone = v.trim().to_string();
        }
        if let Some(v) = self.card_no {
            member.card_no = Some(v);
        }
        if let Some(v) = self.level {
            member.level = v;
        }
        if let Some(v) = self.remark {
            member.remark = Some(v);
        }
    }
}

/// Criteria for filtering members. All present criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberFilter {
    /// Substring of the name.
    pub name: Option<String>,
    /// Exact phone.
    pub phone: Option<String>,
    pub level: Option<i64>,
    /// Registered at or after.
    pub start: Option<DateTime<Utc>>,
    /// Registered at or before.
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub total_members: i64,
    /// Level at or above [`crate::VIP_LEVEL`].
    pub vip_members: i64,
    /// Registered in the last 30 days.
    pub new_members: i64,
}

/// Concatenates search hits, keeping the first occurrence of each member.
pub fn merge_unique<I>(hits: I) -> Vec<Member>
where
    I: IntoIterator<Item = Member>,
{
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|m| seen.insert(m.member_id.clone()))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
