use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ULID and ID Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagId(pub String);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Subjects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    Physics,
    Chemistry,
    Biology,
    English,
    Chinese,
    History,
    Geography,
    Politics,
    Other,
}

impl Subject {
    pub const ALL: [Subject; 10] = [
        Subject::Math,
        Subject::Physics,
        Subject::Chemistry,
        Subject::Biology,
        Subject::English,
        Subject::Chinese,
        Subject::History,
        Subject::Geography,
        Subject::Politics,
        Subject::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
            Subject::Biology => "biology",
            Subject::English => "english",
            Subject::Chinese => "chinese",
            Subject::History => "history",
            Subject::Geography => "geography",
            Subject::Politics => "politics",
            Subject::Other => "other",
        }
    }

    /// Parse a stored subject key. Unknown keys are not an error.
    pub fn from_key(raw: &str) -> Option<Subject> {
        let raw = raw.trim().to_lowercase();
        Subject::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Knowledge Tag Schema
// ============================================================================

/// One node of the curriculum taxonomy.
///
/// Roots (`parent_id == None`) are grade/semester nodes. System nodes are
/// identified by `(subject, parent_id, order)`; custom nodes by `(subject, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagNode {
    pub id: TagId,
    pub name: String,
    pub subject: Subject,
    pub parent_id: Option<TagId>,
    pub is_system: bool,
    pub order: i64,
    pub created_at: String, // RFC3339
    pub updated_at: String, // RFC3339
}

impl TagNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ============================================================================
// Curriculum Specification (import input)
// ============================================================================

/// Declarative curriculum for one subject.
///
/// `sectioned` curricula nest tags under sections (chapter → section → tag);
/// flat ones attach tags to the chapter directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumSpec {
    pub subject: Subject,
    #[serde(default)]
    pub sectioned: bool,
    pub grades: Vec<GradeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeSpec {
    pub name: String,
    /// Sibling order of the grade node among the subject's roots.
    pub rank: i64,
    #[serde(default)]
    pub chapters: Vec<ChapterSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSpec {
    pub chapter: String,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSpec {
    pub section: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ============================================================================
// School Stages and Grades
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationStage {
    Primary,
    JuniorHigh,
    SeniorHigh,
    University,
}

impl EducationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EducationStage::Primary => "primary",
            EducationStage::JuniorHigh => "junior_high",
            EducationStage::SeniorHigh => "senior_high",
            EducationStage::University => "university",
        }
    }

    pub fn from_key(raw: &str) -> Option<EducationStage> {
        match raw.trim() {
            "primary" => Some(EducationStage::Primary),
            "junior_high" => Some(EducationStage::JuniorHigh),
            "senior_high" => Some(EducationStage::SeniorHigh),
            "university" => Some(EducationStage::University),
            _ => None,
        }
    }
}

/// Label language: `Native` is traditional Chinese, `Fallback` is English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh")]
    Native,
    #[default]
    #[serde(rename = "en")]
    Fallback,
}

impl Language {
    pub fn from_key(raw: &str) -> Language {
        match raw.trim().to_lowercase().as_str() {
            "zh" | "zh-tw" | "zh-hant" | "native" => Language::Native,
            _ => Language::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    /// Suffix appended to a grade token in root node names ("國一上").
    pub fn native_suffix(&self) -> &'static str {
        match self {
            Semester::First => "上",
            Semester::Second => "下",
        }
    }
}

/// A schooling stage on the 1-12 grade scale, with the canonical grade tokens
/// used as root node names.
#[derive(Debug, Clone, Copy)]
pub struct SchoolStage {
    pub stage: EducationStage,
    pub first_grade: u8,
    pub tokens: &'static [&'static str],
    /// Older root names for the same years ("七年級" for "國一"), index-aligned
    /// with `tokens`. Empty when the stage has none.
    pub aliases: &'static [&'static str],
}

impl SchoolStage {
    pub fn last_grade(&self) -> u8 {
        self.first_grade + self.tokens.len() as u8 - 1
    }

    pub fn contains(&self, grade: u8) -> bool {
        grade >= self.first_grade && grade <= self.last_grade()
    }

    /// Canonical token and its alias, if any, for each year in order
    pub fn year_names(&self, year_index: usize) -> impl Iterator<Item = &'static str> {
        let tokens: &'static [&'static str] = self.tokens;
        let aliases: &'static [&'static str] = self.aliases;
        tokens
            .get(year_index)
            .into_iter()
            .chain(aliases.get(year_index))
            .copied()
    }
}

pub static SCHOOL_STAGES: [SchoolStage; 3] = [
    SchoolStage {
        stage: EducationStage::Primary,
        first_grade: 1,
        tokens: &["一年級", "二年級", "三年級", "四年級", "五年級", "六年級"],
        aliases: &[],
    },
    SchoolStage {
        stage: EducationStage::JuniorHigh,
        first_grade: 7,
        tokens: &["國一", "國二", "國三"],
        aliases: &["七年級", "八年級", "九年級"],
    },
    SchoolStage {
        stage: EducationStage::SeniorHigh,
        first_grade: 10,
        tokens: &["高一", "高二", "高三"],
        aliases: &[],
    },
];

/// The 1-12 scale stage of an education stage (none for university)
pub fn school_stage(stage: EducationStage) -> Option<&'static SchoolStage> {
    SCHOOL_STAGES.iter().find(|s| s.stage == stage)
}

pub fn stage_for_grade(grade: u8) -> Option<&'static SchoolStage> {
    SCHOOL_STAGES.iter().find(|s| s.contains(grade))
}

/// Canonical grade token for a grade on the 1-12 scale ("國一" for 7).
pub fn canonical_grade_token(grade: u8) -> Option<&'static str> {
    stage_for_grade(grade).map(|s| s.tokens[(grade - s.first_grade) as usize])
}

/// Older root name for a canonical grade token ("七年級" for "國一")
pub fn grade_token_alias(token: &str) -> Option<&'static str> {
    SCHOOL_STAGES.iter().find_map(|s| {
        let idx = s.tokens.iter().position(|t| *t == token)?;
        s.aliases.get(idx).copied()
    })
}

/// Upper bound on knowledge points attached to one analyzed question.
pub const MAX_TAGS_PER_QUESTION: usize = 5;

// ============================================================================
// Helper Functions
// ============================================================================

pub fn generate_tag_id() -> TagId {
    TagId(format!("tag_{}", ulid::Ulid::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let tag_id = generate_tag_id();
        assert!(tag_id.0.starts_with("tag_"));
        assert_eq!(tag_id.0.len(), 30); // "tag_" + 26 chars
        assert_ne!(generate_tag_id(), tag_id);
    }

    #[test]
    fn test_subject_keys() {
        assert_eq!(Subject::from_key("math"), Some(Subject::Math));
        assert_eq!(Subject::from_key(" Physics "), Some(Subject::Physics));
        assert_eq!(Subject::from_key("astrology"), None);
        for subject in Subject::ALL {
            assert_eq!(Subject::from_key(subject.as_str()), Some(subject));
        }
    }

    #[test]
    fn test_grade_tokens() {
        assert_eq!(canonical_grade_token(1), Some("一年級"));
        assert_eq!(canonical_grade_token(7), Some("國一"));
        assert_eq!(canonical_grade_token(9), Some("國三"));
        assert_eq!(canonical_grade_token(12), Some("高三"));
        assert_eq!(canonical_grade_token(0), None);
        assert_eq!(canonical_grade_token(13), None);
        assert_eq!(
            stage_for_grade(8).map(|s| s.stage),
            Some(EducationStage::JuniorHigh)
        );
    }

    #[test]
    fn test_grade_token_aliases() {
        assert_eq!(grade_token_alias("國一"), Some("七年級"));
        assert_eq!(grade_token_alias("國三"), Some("九年級"));
        assert_eq!(grade_token_alias("高一"), None);
        assert_eq!(grade_token_alias("一年級"), None);

        let junior = school_stage(EducationStage::JuniorHigh).unwrap();
        assert_eq!(junior.year_names(1).collect::<Vec<_>>(), vec!["國二", "八年級"]);
        assert!(junior.year_names(3).next().is_none());
        let senior = school_stage(EducationStage::SeniorHigh).unwrap();
        assert_eq!(senior.year_names(0).collect::<Vec<_>>(), vec!["高一"]);
    }

    #[test]
    fn test_curriculum_deserialization() {
        let json = r#"{
            "subject": "math",
            "sectioned": true,
            "grades": [
                {
                    "name": "國一上",
                    "rank": 1,
                    "chapters": [
                        {
                            "chapter": "整數的運算",
                            "sections": [
                                { "section": "負數與數線", "tags": ["負數", "數線"] }
                            ]
                        }
                    ]
                }
            ]
        }"#;

        let spec: CurriculumSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.subject, Subject::Math);
        assert!(spec.sectioned);
        assert_eq!(spec.grades[0].chapters[0].sections[0].tags.len(), 2);
        assert!(spec.grades[0].chapters[0].tags.is_empty());
    }

    #[test]
    fn test_language_keys() {
        assert_eq!(Language::from_key("zh"), Language::Native);
        assert_eq!(Language::from_key("en"), Language::Fallback);
        assert_eq!(Language::from_key("fr"), Language::Fallback);
        assert_eq!(Language::default(), Language::Fallback);
    }
}
