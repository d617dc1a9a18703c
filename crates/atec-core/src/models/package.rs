use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subtest index within the ATEC template (0..=3).
pub type SubtestId = i32;

/// One selectable answer of a question group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i32,
    pub description: String,
    pub score: i32,
}

/// Per-subtest content: display name, questions, and the shared option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistGroup {
    pub custom_name: String,
    pub questions: Vec<String>,
    pub options: Vec<AnswerOption>,
}

impl ChecklistGroup {
    pub fn option(&self, id: i32) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// Ordered mapping of subtest id to its group.
pub type Questionnaire = BTreeMap<SubtestId, ChecklistGroup>;

/// A named score band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicationCategory {
    pub minimum_score: i32,
    pub maximum_score: i32,
    pub name: String,
    pub detail: String,
}

impl IndicationCategory {
    pub fn contains(&self, score: i32) -> bool {
        score >= self.minimum_score && score <= self.maximum_score
    }

    fn invalid() -> Self {
        Self {
            minimum_score: 0,
            maximum_score: 0,
            name: "invalid value".to_string(),
            detail: "invalid indication".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicationCategories(pub Vec<IndicationCategory>);

impl IndicationCategories {
    /// First category whose interval holds `score`. Validated packages always
    /// have exactly one; anything else yields a placeholder category.
    pub fn lookup(&self, score: i32) -> IndicationCategory {
        self.0
            .iter()
            .find(|c| c.contains(score))
            .cloned()
            .unwrap_or_else(IndicationCategory::invalid)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndicationCategory> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Labels printed on the rendered result card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResultAttributeKey {
    pub title: String,
    pub total: String,
    pub indication: String,
    pub result_id: String,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub questionnaire: Questionnaire,
    pub indication_categories: IndicationCategories,
    pub image_result_attribute_key: ImageResultAttributeKey,
    pub is_active: bool,
    pub is_locked: bool,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

/// Author-supplied content of a package. Shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageContent {
    pub name: String,
    pub questionnaire: Questionnaire,
    pub indication_categories: IndicationCategories,
    pub image_result_attribute_key: ImageResultAttributeKey,
}

impl Package {
    pub fn content(&self) -> PackageContent {
        PackageContent {
            name: self.name.clone(),
            questionnaire: self.questionnaire.clone(),
            indication_categories: self.indication_categories.clone(),
            image_result_attribute_key: self.image_result_attribute_key.clone(),
        }
    }
}
