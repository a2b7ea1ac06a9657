use chrono::{NaiveDate, TimeZone, Utc};
use wrongbook_progress::{
    calculate_grade, grade_number, next_review_from, GradeProgression, ReviewState,
};
use wrongbook_schemas::{Language, Semester};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_junior_high_year_boundaries() {
    let cases = [
        (date(2024, 9, 1), "國一上"),
        (date(2025, 1, 15), "國一上"),
        (date(2025, 3, 1), "國一下"),
        (date(2025, 9, 1), "國二上"),
    ];
    for (as_of, expected) in cases {
        assert_eq!(
            calculate_grade("junior_high", 2024, as_of, Language::Native),
            expected,
            "{}",
            as_of
        );
    }
    assert_eq!(
        calculate_grade("junior_high", 2026, date(2025, 5, 15), Language::Native),
        "學前"
    );
}

#[test]
fn test_label_and_grade_number_agree() {
    // Walk a junior high student through four academic years
    let mut as_of = date(2024, 9, 1);
    let mut seen = Vec::new();
    while as_of < date(2028, 9, 1) {
        let progression = GradeProgression::at(2024, as_of);
        let number = grade_number("junior_high", 2024, as_of);
        let label = calculate_grade("junior_high", 2024, as_of, Language::Fallback);

        match progression.grade_level {
            1..=3 => {
                assert_eq!(number, Some(6 + progression.grade_level as u8));
                assert!(label.starts_with("Junior High Grade"), "{}", label);
            }
            _ => {
                assert_eq!(number, None);
                assert!(label.starts_with("Graduated"), "{}", label);
            }
        }
        if progression.semester == Semester::First {
            assert!(label.ends_with("1st Semester"));
        }
        seen.push(number);
        as_of = as_of.succ_opt().unwrap();
    }

    assert!(seen.contains(&Some(7)));
    assert!(seen.contains(&Some(9)));
    assert!(seen.contains(&None));
}

#[test]
fn test_review_cycle() {
    let reviewed = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let mut state = ReviewState::default();
    let mut due = Vec::new();
    for _ in 0..7 {
        due.push((state.next_due_from(reviewed) - reviewed).num_days());
        state.advance();
    }
    assert_eq!(due, vec![1, 2, 4, 7, 15, 30, 30]);

    state.reset();
    assert_eq!(
        state.next_due_from(reviewed),
        next_review_from(0, reviewed)
    );
}
