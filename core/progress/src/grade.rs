//! Grade/semester progression from an enrollment year.
//!
//! The academic year starts in September. The first semester runs from
//! September through January, the second from February through August.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wrongbook_schemas::{school_stage, EducationStage, Language, Semester};

pub const ACADEMIC_YEAR_START_MONTH: u32 = 9;
pub const SECOND_SEMESTER_START_MONTH: u32 = 2;

/// Position of a student within their stage on a given date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeProgression {
    /// 1-based year within the stage; zero or negative before enrollment
    pub grade_level: i32,
    pub semester: Semester,
}

impl GradeProgression {
    pub fn at(enrollment_year: i32, as_of: NaiveDate) -> Self {
        let month = as_of.month();
        let academic_year = if month >= ACADEMIC_YEAR_START_MONTH {
            as_of.year()
        } else {
            as_of.year() - 1
        };

        let first_semester =
            month >= ACADEMIC_YEAR_START_MONTH || month < SECOND_SEMESTER_START_MONTH;
        let semester = if first_semester {
            Semester::First
        } else {
            Semester::Second
        };

        // Saturates for enrollment years far outside the calendar
        Self {
            grade_level: academic_year
                .saturating_sub(enrollment_year)
                .saturating_add(1),
            semester,
        }
    }
}

fn ordinal_names(stage: EducationStage, language: Language) -> &'static [&'static str] {
    match (stage, language) {
        (EducationStage::Primary, Language::Native) => {
            &["一年級", "二年級", "三年級", "四年級", "五年級", "六年級"]
        }
        (EducationStage::JuniorHigh, Language::Native) => &["國一", "國二", "國三"],
        (EducationStage::SeniorHigh, Language::Native) => &["高一", "高二", "高三"],
        (EducationStage::University, Language::Native) => &["大一", "大二", "大三", "大四"],
        (EducationStage::Primary, Language::Fallback) => &[
            "Grade 1", "Grade 2", "Grade 3", "Grade 4", "Grade 5", "Grade 6",
        ],
        (EducationStage::JuniorHigh, Language::Fallback) => &[
            "Junior High Grade 1",
            "Junior High Grade 2",
            "Junior High Grade 3",
        ],
        (EducationStage::SeniorHigh, Language::Fallback) => &[
            "Senior High Grade 1",
            "Senior High Grade 2",
            "Senior High Grade 3",
        ],
        (EducationStage::University, Language::Fallback) => {
            &["Freshman", "Sophomore", "Junior", "Senior"]
        }
    }
}

fn with_semester(label: &str, semester: Semester, language: Language) -> String {
    match (language, semester) {
        (Language::Native, _) => format!("{}{}", label, semester.native_suffix()),
        (Language::Fallback, Semester::First) => format!("{}, 1st Semester", label),
        (Language::Fallback, Semester::Second) => format!("{}, 2nd Semester", label),
    }
}

/// Display label of a student's grade and semester on `as_of`.
///
/// Before enrollment the label is `學前` / `Pre-school` without a semester.
/// Past the last year of the stage, or for an unrecognised stage, it is
/// `已畢業` / `Graduated` followed by the semester.
pub fn calculate_grade(
    stage: &str,
    enrollment_year: i32,
    as_of: NaiveDate,
    language: Language,
) -> String {
    let progression = GradeProgression::at(enrollment_year, as_of);
    let graduated = match language {
        Language::Native => "已畢業",
        Language::Fallback => "Graduated",
    };

    let Some(stage) = EducationStage::from_key(stage) else {
        debug!("Unrecognised education stage '{}'", stage);
        return with_semester(graduated, progression.semester, language);
    };

    if progression.grade_level <= 0 {
        return match language {
            Language::Native => "學前".to_string(),
            Language::Fallback => "Pre-school".to_string(),
        };
    }

    let names = ordinal_names(stage, language);
    let label = names
        .get(progression.grade_level as usize - 1)
        .copied()
        .unwrap_or(graduated);
    with_semester(label, progression.semester, language)
}

/// Grade on the 1-12 scale: primary 1-6, junior high 7-9, senior high 10-12.
/// `None` before enrollment, after the stage, or for other stages.
pub fn grade_number(stage: &str, enrollment_year: i32, as_of: NaiveDate) -> Option<u8> {
    let school = EducationStage::from_key(stage).and_then(school_stage)?;
    let level = GradeProgression::at(enrollment_year, as_of).grade_level;

    if level < 1 || level as usize > school.tokens.len() {
        return None;
    }
    Some(school.first_grade + level as u8 - 1)
}
