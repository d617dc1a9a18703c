//! Structural checks run before a package is persisted.

use std::collections::HashSet;

use atec_core::models::package::{
    ChecklistGroup, ImageResultAttributeKey, IndicationCategories, PackageContent, Questionnaire,
};

use crate::error::ValidationError;
use crate::template::{MAXIMUM_SCORE, MINIMUM_SCORE, SUBTESTS, Subtest};

pub const MIN_INDICATION_CATEGORIES: usize = 3;

/// Validate everything an author supplies for a package.
pub fn validate_content(content: &PackageContent) -> Result<(), ValidationError> {
    if content.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    validate_questionnaire(&content.questionnaire)?;
    validate_indication_categories(&content.indication_categories)?;
    validate_image_keys(&content.image_result_attribute_key)
}

/// The questionnaire must have exactly the template's subtests with matching
/// question and option counts.
pub fn validate_questionnaire(questionnaire: &Questionnaire) -> Result<(), ValidationError> {
    if let Some(unknown) = questionnaire
        .keys()
        .find(|id| !SUBTESTS.iter().any(|s| s.id == **id))
    {
        return Err(ValidationError::UnknownGroup(*unknown));
    }

    for subtest in &SUBTESTS {
        let group = questionnaire
            .get(&subtest.id)
            .ok_or(ValidationError::MissingGroup {
                number: subtest.id + 1,
                name: subtest.name,
            })?;
        validate_group(subtest, group)?;
    }

    Ok(())
}

fn validate_group(subtest: &Subtest, group: &ChecklistGroup) -> Result<(), ValidationError> {
    let number = subtest.id + 1;
    if group.custom_name.trim().is_empty() {
        return Err(ValidationError::MissingCustomName { number });
    }

    if group.options.len() != subtest.option_count {
        return Err(ValidationError::OptionCount {
            number,
            name: subtest.name,
            expected: subtest.option_count,
            actual: group.options.len(),
        });
    }

    if group.questions.len() != subtest.question_count {
        return Err(ValidationError::QuestionCount {
            number,
            name: subtest.name,
            expected: subtest.question_count,
            actual: group.questions.len(),
        });
    }

    if let Some(index) = group.questions.iter().position(|q| q.trim().is_empty()) {
        return Err(ValidationError::EmptyQuestion {
            group: group.custom_name.clone(),
            index,
        });
    }

    let mut ids = HashSet::new();
    let mut scores = HashSet::new();
    for option in &group.options {
        if option.description.trim().is_empty() {
            return Err(ValidationError::EmptyOptionDescription {
                group: group.custom_name.clone(),
                id: option.id,
            });
        }
        if option.score < 0 {
            return Err(ValidationError::NegativeOptionScore {
                group: group.custom_name.clone(),
                score: option.score,
            });
        }
        if !ids.insert(option.id) {
            return Err(ValidationError::DuplicateOptionId {
                group: group.custom_name.clone(),
                id: option.id,
            });
        }
        if !scores.insert(option.score) {
            return Err(ValidationError::DuplicateOptionScore {
                group: group.custom_name.clone(),
                score: option.score,
            });
        }
    }

    // Scores run 0..n so the subtest grade stays within the template range.
    for score in 0..group.options.len() as i32 {
        if !scores.contains(&score) {
            return Err(ValidationError::MissingOptionScore {
                group: group.custom_name.clone(),
                score,
            });
        }
    }

    Ok(())
}

/// Every achievable total must fall into exactly one category.
pub fn validate_indication_categories(
    categories: &IndicationCategories,
) -> Result<(), ValidationError> {
    if categories.len() < MIN_INDICATION_CATEGORIES {
        return Err(ValidationError::TooFewCategories {
            minimum: MIN_INDICATION_CATEGORIES,
            actual: categories.len(),
        });
    }

    for (index, category) in categories.iter().enumerate() {
        let reason = if category.minimum_score < MINIMUM_SCORE {
            Some("minimum_score must not be negative")
        } else if category.maximum_score < 1 {
            Some("maximum_score must be at least 1")
        } else if category.maximum_score > MAXIMUM_SCORE {
            Some("maximum_score is greater than the maximum possible score")
        } else if category.minimum_score > category.maximum_score {
            Some("minimum_score must not exceed maximum_score")
        } else if category.name.trim().is_empty() {
            Some("name is required")
        } else if category.detail.trim().is_empty() {
            Some("detail is required")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ValidationError::InvalidCategory { index, reason });
        }
    }

    for score in MINIMUM_SCORE..=MAXIMUM_SCORE {
        let matches = categories.iter().filter(|c| c.contains(score)).count();
        if matches != 1 {
            return Err(ValidationError::UncoveredScore(score));
        }
    }

    Ok(())
}

pub fn validate_image_keys(keys: &ImageResultAttributeKey) -> Result<(), ValidationError> {
    let slots = [
        ("title", &keys.title),
        ("total", &keys.total),
        ("indication", &keys.indication),
        ("result_id", &keys.result_id),
        ("submitted_at", &keys.submitted_at),
    ];
    for (slot, value) in slots {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingImageKey(slot));
        }
    }
    Ok(())
}
