//! Refuses to write into a destination that already holds data.

use sea_orm::{ConnectionTrait, DbErr, EntityTrait, PaginatorTrait};
use tracing::warn;

use super::MigrateError;
use crate::entities::{admin, complaint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetCounts {
    pub complaints: u64,
    pub admins: u64,
}

impl TargetCounts {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.complaints == 0 && self.admins == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    /// `--force`: wipe both tables first.
    ClearThenProceed,
}

pub async fn count_rows<C>(conn: &C) -> Result<TargetCounts, DbErr>
where
    C: ConnectionTrait,
{
    Ok(TargetCounts {
        complaints: complaint::Entity::find().count(conn).await?,
        admins: admin::Entity::find().count(conn).await?,
    })
}

pub fn evaluate(counts: TargetCounts, force: bool) -> Result<GuardDecision, MigrateError> {
    if force {
        return Ok(GuardDecision::ClearThenProceed);
    }

    if counts.is_empty() {
        Ok(GuardDecision::Proceed)
    } else {
        Err(MigrateError::Conflict {
            complaints: counts.complaints,
            admins: counts.admins,
        })
    }
}

/// Deletes every row of both destination tables. No confirmation, no backup.
pub async fn clear<C>(conn: &C, counts: TargetCounts) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    warn!(
        complaints = counts.complaints,
        admins = counts.admins,
        "Clearing target tables (force mode)"
    );

    complaint::Entity::delete_many().exec(conn).await?;
    admin::Entity::delete_many().exec(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_target_proceeds() {
        let decision = evaluate(TargetCounts::default(), false).unwrap();
        assert_eq!(decision, GuardDecision::Proceed);
    }

    #[test]
    fn test_populated_target_conflicts_with_both_counts() {
        let counts = TargetCounts {
            complaints: 0,
            admins: 1,
        };

        let err = evaluate(counts, false).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(matches!(
            err,
            MigrateError::Conflict {
                complaints: 0,
                admins: 1
            }
        ));
        assert!(err.to_string().contains("complaint rows: 0, admin rows: 1"));
    }

    #[test]
    fn test_force_always_clears() {
        let populated = TargetCounts {
            complaints: 7,
            admins: 1,
        };
        assert_eq!(
            evaluate(populated, true).unwrap(),
            GuardDecision::ClearThenProceed
        );
        assert_eq!(
            evaluate(TargetCounts::default(), true).unwrap(),
            GuardDecision::ClearThenProceed
        );
    }
}
