use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::package::SubtestId;

/// subtest id -> (question index -> chosen option id).
pub type AnswerDetail = BTreeMap<SubtestId, BTreeMap<i32, i32>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtestGrade {
    pub name: String,
    pub grade: i32,
}

/// subtest id -> graded subtest.
pub type ResultDetail = BTreeMap<SubtestId, SubtestGrade>;

/// Sum of every subtest grade.
pub fn total_score(detail: &ResultDetail) -> i32 {
    detail.values().map(|g| g.grade).sum()
}

/// One scored answer sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionnaireResult {
    pub id: Uuid,
    pub package_id: Uuid,
    pub child_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub answer: AnswerDetail,
    pub result: ResultDetail,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}
