//! Spaced-repetition review scheduling.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use wrongbook_schemas::Language;

/// Days until the next review for stages 0..=5. Later stages reuse the last entry.
pub const REVIEW_INTERVALS_DAYS: [i64; 6] = [1, 2, 4, 7, 15, 30];

pub fn interval_days(stage: u32) -> i64 {
    let last = REVIEW_INTERVALS_DAYS.len() - 1;
    REVIEW_INTERVALS_DAYS[(stage as usize).min(last)]
}

pub fn next_review_from(stage: u32, as_of: DateTime<Utc>) -> DateTime<Utc> {
    as_of + Duration::days(interval_days(stage))
}

pub fn next_review(stage: u32) -> DateTime<Utc> {
    next_review_from(stage, Utc::now())
}

/// Repetition stage of one reviewed item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    pub stage: u32,
}

impl ReviewState {
    pub fn new(stage: u32) -> Self {
        Self { stage }
    }

    /// Successful recall
    pub fn advance(&mut self) {
        self.stage = self.stage.saturating_add(1);
    }

    /// Failed recall: start over
    pub fn reset(&mut self) {
        self.stage = 0;
    }

    pub fn next_due_from(&self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        next_review_from(self.stage, as_of)
    }
}

pub fn stage_description(stage: u32, language: Language) -> String {
    let days = interval_days(stage);
    match language {
        Language::Native => {
            let ordinal = match stage {
                0 => "第一次複習",
                1 => "第二次複習",
                2 => "第三次複習",
                3 => "第四次複習",
                4 => "第五次複習",
                _ => "定期維護複習",
            };
            format!("{} ({} 天)", ordinal, days)
        }
        Language::Fallback => {
            let ordinal = match stage {
                0 => "1st review",
                1 => "2nd review",
                2 => "3rd review",
                3 => "4th review",
                4 => "5th review",
                _ => "Maintenance review",
            };
            let unit = if days == 1 { "day" } else { "days" };
            format!("{} ({} {})", ordinal, days, unit)
        }
    }
}
