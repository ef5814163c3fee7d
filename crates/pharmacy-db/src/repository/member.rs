//! # Member Repository
//!
//! Loyalty members and their point balances.
//!
//! Point deductions are a single conditional update (`points >= ?`), so a
//! balance never goes negative even under concurrent use.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use pharmacy_core::member::{MemberFilter, MemberStats};
use pharmacy_core::{Member, VIP_LEVEL};

const COLUMNS: &str = "member_id, name, phone, card_no, points, level, create_time, remark";

#[derive(Debug, Clone)]
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MemberRepository { pool }
    }

    pub async fn get(&self, member_id: &str) -> DbResult<Option<Member>> {
        let sql = format!("SELECT {COLUMNS} FROM members WHERE member_id = ?1");
        Ok(sqlx::query_as::<_, Member>(&sql)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn require(&self, member_id: &str) -> DbResult<Member> {
        self.get(member_id)
            .await?
            .ok_or_else(|| DbError::not_found("Member", member_id))
    }

    pub async fn by_phone(&self, phone: &str) -> DbResult<Option<Member>> {
        let sql = format!("SELECT {COLUMNS} FROM members WHERE phone = ?1");
        Ok(sqlx::query_as::<_, Member>(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn by_card_no(&self, card_no: &str) -> DbResult<Vec<Member>> {
        let sql = format!("SELECT {COLUMNS} FROM members WHERE card_no = ?1 ORDER BY member_id");
        Ok(sqlx::query_as::<_, Member>(&sql)
            .bind(card_no)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn name_contains(&self, keyword: &str) -> DbResult<Vec<Member>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM members WHERE name LIKE ?1 ESCAPE '\\' ORDER BY member_id"
        );
        Ok(sqlx::query_as::<_, Member>(&sql)
            .bind(like_pattern(keyword))
            .fetch_all(&self.pool)
            .await?)
    }

    /// Whether another member already uses this phone.
    pub async fn phone_taken(&self, phone: &str, except: Option<&str>) -> DbResult<bool> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM members WHERE phone = ?1 AND (?2 IS NULL OR member_id <> ?2)",
        )
        .bind(phone)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken > 0)
    }

    /// Every member id, used to derive the next sequential id.
    pub async fn ids(&self) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar("SELECT member_id FROM members")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn insert(&self, member: &Member) -> DbResult<()> {
        debug!(member_id = %member.member_id, "Inserting member");

        sqlx::query(
            r#"
            INSERT INTO members (member_id, name, phone, card_no, points, level, create_time, remark)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&member.member_id)
        .bind(&member.name)
        .bind(&member.phone)
        .bind(&member.card_no)
        .bind(member.points)
        .bind(member.level)
        .bind(member.create_time)
        .bind(&member.remark)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes the profile fields. Points are changed only through
    /// [`add_points`](Self::add_points) and [`use_points`](Self::use_points).
    pub async fn update(&self, member: &Member) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET name = ?2, phone = ?3, card_no = ?4, level = ?5, remark = ?6
            WHERE member_id = ?1
            "#,
        )
        .bind(&member.member_id)
        .bind(&member.name)
        .bind(&member.phone)
        .bind(&member.card_no)
        .bind(member.level)
        .bind(&member.remark)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete(&self, member_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM members WHERE member_id = ?1")
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes the listed members. Returns how many existed.
    pub async fn delete_many(&self, member_ids: &[String]) -> DbResult<u64> {
        if member_ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM members WHERE member_id IN (");
        let mut separated = builder.separated(", ");
        for id in member_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Adds points. Returns the new balance, or None when the member is
    /// absent.
    pub async fn add_points(&self, member_id: &str, points: i64) -> DbResult<Option<i64>> {
        Ok(sqlx::query_scalar(
            "UPDATE members SET points = points + ?2 WHERE member_id = ?1 RETURNING points",
        )
        .bind(member_id)
        .bind(points)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Deducts points when the balance covers them. Returns the new
    /// balance, or None when the member is absent or the balance is short.
    pub async fn use_points(&self, member_id: &str, points: i64) -> DbResult<Option<i64>> {
        Ok(sqlx::query_scalar(
            "UPDATE members SET points = points - ?2 \
             WHERE member_id = ?1 AND points >= ?2 RETURNING points",
        )
        .bind(member_id)
        .bind(points)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Members matching every present criterion, ordered by id.
    pub async fn filter(&self, filter: &MemberFilter) -> DbResult<Vec<Member>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM members WHERE 1 = 1"));

        if let Some(name) = filter.name.as_deref().filter(|n| !n.trim().is_empty()) {
            builder
                .push(" AND name LIKE ")
                .push_bind(like_pattern(name.trim()))
                .push(" ESCAPE '\\'");
        }
        if let Some(phone) = filter.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            builder.push(" AND phone = ").push_bind(phone.trim().to_string());
        }
        if let Some(level) = filter.level {
            builder.push(" AND level = ").push_bind(level);
        }
        if let Some(start) = filter.start {
            builder.push(" AND create_time >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            builder.push(" AND create_time <= ").push_bind(end);
        }
        builder.push(" ORDER BY member_id");

        Ok(builder.build_query_as::<Member>().fetch_all(&self.pool).await?)
    }

    pub async fn page(&self, page: u32, size: u32) -> DbResult<(Vec<Member>, i64)> {
        let sql = format!("SELECT {COLUMNS} FROM members ORDER BY member_id LIMIT ?1 OFFSET ?2");
        let rows = sqlx::query_as::<_, Member>(&sql)
            .bind(i64::from(size))
            .bind(i64::from(page) * i64::from(size))
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok((rows, total))
    }

    /// Totals, VIP count and members registered at or after `since`.
    pub async fn stats(&self, since: DateTime<Utc>) -> DbResult<MemberStats> {
        let (total_members, vip_members, new_members): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN level >= ?1 THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN create_time >= ?2 THEN 1 ELSE 0 END), 0)
            FROM members
            "#,
        )
        .bind(VIP_LEVEL)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(MemberStats {
            total_members,
            vip_members,
            new_members,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
