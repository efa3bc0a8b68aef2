//! Monthly allowance derivation from capped weekly point history.
//!
//! The calculation is a pure, idempotent recomputation: running it twice for
//! the same month over unchanged ledger data yields the identical cached row.

use chrono::Utc;
use tracing::info;

use super::calendar::month_bounds;
use super::errors::ChoreError;
use super::ledger::WEEKLY_POINT_CAP;
use super::models::{AgeCategory, AllowanceCalculation};
use crate::storage::{AllowanceRepository, MemberRepository, WeeklyPointsRepository};

/// Most capped points a month can count (four full weeks).
const MONTHLY_POINT_CEILING: i64 = 120;

/// Dollar rate per possible point for child and preteen members.
const POINT_RATE_YOUNG: f64 = 0.50;

#[derive(Clone)]
pub struct AllowanceService {
    members: MemberRepository,
    weekly: WeeklyPointsRepository,
    allowances: AllowanceRepository,
}

impl AllowanceService {
    pub fn new(
        members: MemberRepository,
        weekly: WeeklyPointsRepository,
        allowances: AllowanceRepository,
    ) -> Self {
        Self {
            members,
            weekly,
            allowances,
        }
    }

    /// Aggregates a member's capped weekly points for `month_year`
    /// ("YYYY-MM") into a monetary figure and caches the result.
    ///
    /// Rate rule by age category on the last day of the month: adults get
    /// nothing, teenagers earn their age in dollars scaled by completion,
    /// children and preteens earn fifty cents per possible point scaled by
    /// completion.
    pub async fn calculate_monthly_allowance(
        &self,
        member_id: i64,
        month_year: &str,
    ) -> Result<AllowanceCalculation, ChoreError> {
        let (month_start, month_end) =
            month_bounds(month_year).map_err(|_| ChoreError::InvalidMonthYear {
                month_year: month_year.to_string(),
            })?;

        let member = self
            .members
            .find_by_id(member_id)
            .await?
            .ok_or(ChoreError::MemberNotFound { member_id })?;
        if !member.is_active {
            return Err(ChoreError::MemberInactive {
                member_name: member.name,
            });
        }

        let weeks = self
            .weekly
            .list_for_range(member_id, month_start, month_end)
            .await?;
        let total_earned: i64 = weeks.iter().map(|week| week.points_capped).sum();
        let total_possible =
            (weeks.len() as i64 * WEEKLY_POINT_CAP).min(MONTHLY_POINT_CEILING);
        let completion = if total_possible > 0 {
            total_earned as f64 / total_possible as f64
        } else {
            0.0
        };

        let age_category = member.age_category_on(month_end);
        let amount = match age_category {
            AgeCategory::Adult => 0.0,
            AgeCategory::Teenager => completion * member.age_on(month_end) as f64,
            AgeCategory::Preteen | AgeCategory::Child => {
                completion * total_possible as f64 * POINT_RATE_YOUNG
            }
        };

        let calculation = self
            .allowances
            .upsert(
                member_id,
                month_year,
                total_earned,
                total_possible,
                completion * 100.0,
                amount,
                age_category,
                Utc::now(),
            )
            .await?;
        info!(
            "allowance for {} in {}: ${:.2} ({}/{} points, {})",
            member.name,
            month_year,
            calculation.allowance_amount,
            total_earned,
            total_possible,
            age_category.as_str()
        );
        Ok(calculation)
    }

    /// The cached calculation for a month, if one has been run.
    pub async fn cached_allowance(
        &self,
        member_id: i64,
        month_year: &str,
    ) -> Result<Option<AllowanceCalculation>, ChoreError> {
        Ok(self.allowances.get_for_month(member_id, month_year).await?)
    }
}
