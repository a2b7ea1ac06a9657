pub mod grade;
pub mod scheduler;

pub use grade::{calculate_grade, grade_number, GradeProgression};
pub use scheduler::{
    interval_days, next_review, next_review_from, stage_description, ReviewState,
    REVIEW_INTERVALS_DAYS,
};
