use std::collections::BTreeMap;

use atec_core::models::package::{
    ImageResultAttributeKey, IndicationCategories, IndicationCategory, Package, Questionnaire,
};
use atec_core::models::result::{QuestionnaireResult, SubtestGrade};
use atec_export::card::{WRAP_AT, wrap};
use atec_export::{CardStyle, ExportError, ResultCard, render_png};
use uuid::Uuid;

fn category(min: i32, max: i32, detail: &str) -> IndicationCategory {
    IndicationCategory {
        minimum_score: min,
        maximum_score: max,
        name: detail.to_lowercase(),
        detail: detail.to_string(),
    }
}

fn package() -> Package {
    let at: jiff::Timestamp = "2024-05-01T08:00:00Z".parse().unwrap();
    Package {
        id: Uuid::new_v4(),
        created_by: Uuid::new_v4(),
        name: "ATEC".to_string(),
        questionnaire: Questionnaire::new(),
        indication_categories: IndicationCategories(vec![
            category(0, 30, "Mild"),
            category(31, 50, "Moderate"),
            category(51, 179, "Severe"),
        ]),
        image_result_attribute_key: ImageResultAttributeKey {
            title: "ATEC Score".to_string(),
            total: "Total Score".to_string(),
            indication: "Indication".to_string(),
            result_id: "Result ID".to_string(),
            submitted_at: "Submitted At".to_string(),
        },
        is_active: true,
        is_locked: true,
        created_at: at,
        updated_at: at,
    }
}

fn result(grades: &[(&str, i32)]) -> QuestionnaireResult {
    let at: jiff::Timestamp = "2024-05-02T10:11:12Z".parse().unwrap();
    let result: BTreeMap<i32, SubtestGrade> = grades
        .iter()
        .enumerate()
        .map(|(i, (name, grade))| {
            (
                i as i32,
                SubtestGrade {
                    name: name.to_string(),
                    grade: *grade,
                },
            )
        })
        .collect();
    QuestionnaireResult {
        id: Uuid::new_v4(),
        package_id: Uuid::new_v4(),
        child_id: None,
        created_by: None,
        answer: BTreeMap::new(),
        result,
        created_at: at,
        updated_at: at,
    }
}

#[test]
fn card_lists_subtests_then_summary_lines() {
    let r = result(&[("Speech", 10), ("Sociability", 12), ("Sensory", 8), ("Health", 5)]);
    let card = ResultCard::build(&r, &package());

    assert_eq!(card.title, "ATEC Score");
    assert_eq!(
        card.lines,
        vec![
            "Speech: 10".to_string(),
            "Sociability: 12".to_string(),
            "Sensory: 8".to_string(),
            "Health: 5".to_string(),
            "Total Score : 35".to_string(),
            "Indication : Moderate".to_string(),
            format!("Result ID : {}", r.id),
            "Submitted At : 2024-05-02 10:11:12".to_string(),
        ]
    );
}

#[test]
fn score_outside_categories_uses_fallback_indication() {
    let r = result(&[("Speech", 500)]);
    let card = ResultCard::build(&r, &package());
    assert!(card.lines.contains(&"Indication : invalid indication".to_string()));
}

#[test]
fn short_text_is_not_wrapped() {
    assert_eq!(wrap("Speech: 10"), vec!["Speech: 10".to_string()]);
}

#[test]
fn long_text_wraps_on_word_boundaries() {
    let text = "Indication : ".to_string() + &"severe symptoms observed ".repeat(8);
    let lines = wrap(text.trim());
    assert!(lines.len() > 1);
    assert!(lines.iter().all(|l| l.chars().count() <= WRAP_AT));
    assert_eq!(lines.join(" "), text.trim());
}

#[test]
fn rendered_png_is_readable_and_bounded() {
    let r = result(&[("Speech", 10), ("Sociability", 12)]);
    let card = ResultCard::build(&r, &package());
    let style = CardStyle::default();
    let bytes = render_png(&card, &style).unwrap();

    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let decoder = png::Decoder::new(bytes.as_slice());
    let reader = decoder.read_info().unwrap();
    let info = reader.info();
    assert!(info.width <= style.max_width);
    assert!(info.height > 0);
}

#[test]
fn empty_card_is_rejected() {
    let card = ResultCard {
        title: String::new(),
        lines: Vec::new(),
    };
    assert!(matches!(render_png(&card, &CardStyle::default()), Err(ExportError::Empty)));
}
