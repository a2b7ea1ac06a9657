use regex::Regex;
use tracing::debug;
use wrongbook_schemas::{
    canonical_grade_token, grade_token_alias, school_stage, EducationStage, Semester, Subject,
    TagId,
};

use crate::error::Result;
use crate::store::{TagFilter, TagStore};

/// Outcome of matching free text against a subject's grade/semester roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(TagId),
    /// Unknown or ambiguous grade; callers attach the tag without a parent
    Unresolved,
}

impl Resolution {
    pub fn id(&self) -> Option<&TagId> {
        match self {
            Resolution::Resolved(id) => Some(id),
            Resolution::Unresolved => None,
        }
    }

    pub fn into_parent(self) -> Option<TagId> {
        match self {
            Resolution::Resolved(id) => Some(id),
            Resolution::Unresolved => None,
        }
    }
}

/// Historical spellings mapped to canonical grade tokens. Matched by
/// substring in table order, so longer spellings must precede their suffixes
/// ("國中二年級" and "十二年級" before "二年級").
const NATIVE_GRADE_ALIASES: &[(&str, &str)] = &[
    ("國中一年級", "國一"),
    ("国中一年级", "國一"),
    ("初中一年級", "國一"),
    ("初中一年级", "國一"),
    ("國中二年級", "國二"),
    ("国中二年级", "國二"),
    ("初中二年級", "國二"),
    ("初中二年级", "國二"),
    ("國中三年級", "國三"),
    ("国中三年级", "國三"),
    ("初中三年級", "國三"),
    ("初中三年级", "國三"),
    ("高中一年級", "高一"),
    ("高中一年级", "高一"),
    ("高中二年級", "高二"),
    ("高中二年级", "高二"),
    ("高中三年級", "高三"),
    ("高中三年级", "高三"),
    ("十年級", "高一"),
    ("十年级", "高一"),
    ("十一年級", "高二"),
    ("十一年级", "高二"),
    ("十二年級", "高三"),
    ("十二年级", "高三"),
    ("一年級", "一年級"),
    ("一年级", "一年級"),
    ("小一", "一年級"),
    ("二年級", "二年級"),
    ("二年级", "二年級"),
    ("小二", "二年級"),
    ("三年級", "三年級"),
    ("三年级", "三年級"),
    ("小三", "三年級"),
    ("四年級", "四年級"),
    ("四年级", "四年級"),
    ("小四", "四年級"),
    ("五年級", "五年級"),
    ("五年级", "五年級"),
    ("小五", "五年級"),
    ("六年級", "六年級"),
    ("六年级", "六年級"),
    ("小六", "六年級"),
    ("國一", "國一"),
    ("国一", "國一"),
    ("初一", "國一"),
    ("七年級", "國一"),
    ("七年级", "國一"),
    ("國二", "國二"),
    ("国二", "國二"),
    ("初二", "國二"),
    ("八年級", "國二"),
    ("八年级", "國二"),
    ("國三", "國三"),
    ("国三", "國三"),
    ("初三", "國三"),
    ("九年級", "國三"),
    ("九年级", "國三"),
    ("高一", "高一"),
    ("高二", "高二"),
    ("高三", "高三"),
];

/// How the number captured by an English grade pattern is read
#[derive(Debug, Clone, Copy)]
enum GradeScale {
    /// Year within a stage ("Junior High Grade 2")
    Stage(EducationStage),
    /// Absolute grade on the 1-12 scale ("Grade 8")
    Absolute,
}

/// Best-effort classifier from legacy grade/semester text to a root node.
pub struct GradeResolver {
    grade_patterns: Vec<(Regex, GradeScale)>,
    first_semester: Regex,
    second_semester: Regex,
}

impl Default for GradeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GradeResolver {
    pub fn new() -> Self {
        Self {
            // Stage-qualified forms first: "Junior High Grade 1" also contains "Grade 1"
            grade_patterns: vec![
                (
                    Regex::new(r"(?i)junior\s+high\s+grade\s*(\d{1,2})(?:\D|$)").unwrap(),
                    GradeScale::Stage(EducationStage::JuniorHigh),
                ),
                (
                    Regex::new(r"(?i)senior\s+high\s+grade\s*(\d{1,2})(?:\D|$)").unwrap(),
                    GradeScale::Stage(EducationStage::SeniorHigh),
                ),
                (
                    Regex::new(r"(?i)junior\s*(\d)(?:\D|$)").unwrap(),
                    GradeScale::Stage(EducationStage::JuniorHigh),
                ),
                (
                    Regex::new(r"(?i)senior\s*(\d)(?:\D|$)").unwrap(),
                    GradeScale::Stage(EducationStage::SeniorHigh),
                ),
                (
                    Regex::new(r"(?i)grade\s*(\d{1,2})(?:\D|$)").unwrap(),
                    GradeScale::Absolute,
                ),
            ],
            first_semester: Regex::new(r"(?i)(?:^|[^a-z0-9])(?:1st|first)(?:[^a-z0-9]|$)")
                .unwrap(),
            second_semester: Regex::new(r"(?i)(?:^|[^a-z0-9])(?:2nd|second)(?:[^a-z0-9]|$)")
                .unwrap(),
        }
    }

    /// Canonical grade token named by the text, if any
    pub fn normalize_grade(&self, text: &str) -> Option<&'static str> {
        if let Some((_, token)) = NATIVE_GRADE_ALIASES
            .iter()
            .find(|(alias, _)| text.contains(alias))
        {
            return Some(token);
        }

        for (pattern, scale) in &self.grade_patterns {
            if let Some(caps) = pattern.captures(text) {
                let n: u8 = caps.get(1)?.as_str().parse().ok()?;
                return match scale {
                    GradeScale::Absolute => canonical_grade_token(n),
                    GradeScale::Stage(stage) => school_stage(*stage)
                        .and_then(|s| s.tokens.get((n as usize).checked_sub(1)?))
                        .copied(),
                };
            }
        }

        None
    }

    pub fn detect_semester(&self, text: &str) -> Option<Semester> {
        if text.contains('上') || self.first_semester.is_match(text) {
            Some(Semester::First)
        } else if text.contains('下') || self.second_semester.is_match(text) {
            Some(Semester::Second)
        } else {
            None
        }
    }

    /// Root names to try, most specific first: the canonical token, then its
    /// older root name. Empty when no grade is named.
    pub fn candidates(&self, text: &str) -> Vec<String> {
        let Some(token) = self.normalize_grade(text) else {
            return Vec::new();
        };
        let semester = self.detect_semester(text);

        let mut candidates = Vec::with_capacity(4);
        for name in std::iter::once(token).chain(grade_token_alias(token)) {
            if let Some(semester) = semester {
                candidates.push(format!("{}{}", name, semester.native_suffix()));
            }
            candidates.push(name.to_string());
        }
        candidates
    }

    /// Find the grade/semester root of `subject` that legacy text refers to.
    ///
    /// Unrecognised text is `Unresolved`, never an error; only store failures
    /// are returned as `Err`.
    pub fn resolve<S: TagStore + ?Sized>(
        &self,
        store: &S,
        grade_semester: Option<&str>,
        subject: Subject,
    ) -> Result<Resolution> {
        let Some(input) = grade_semester.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Resolution::Unresolved);
        };

        let roots = store.find_nodes(&TagFilter::system_roots(subject))?;
        if roots.is_empty() {
            return Ok(Resolution::Unresolved);
        }

        if let Some(exact) = roots.iter().find(|r| r.name == input) {
            return Ok(Resolution::Resolved(exact.id.clone()));
        }

        let candidates = self.candidates(input);
        if candidates.is_empty() {
            debug!("No grade level recognised in '{}'", input);
            return Ok(Resolution::Unresolved);
        }

        for candidate in &candidates {
            if let Some(root) = roots.iter().find(|r| &r.name == candidate) {
                debug!("Resolved '{}' to root '{}'", input, root.name);
                return Ok(Resolution::Resolved(root.id.clone()));
            }
        }

        debug!("No {} root matches {:?}", subject, candidates);
        Ok(Resolution::Unresolved)
    }
}
