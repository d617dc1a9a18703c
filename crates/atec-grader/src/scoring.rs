//! Grading of answer sheets.

use atec_core::models::package::Questionnaire;
use atec_core::models::result::{AnswerDetail, ResultDetail, SubtestGrade};

use crate::error::GradeError;
use crate::template::SUBTESTS;

/// Check the answer sheet against the template shape: all four subtests,
/// each with exactly the template's number of answers.
pub fn ensure_all_questions_answered(answers: &AnswerDetail) -> Result<(), GradeError> {
    if let Some(unknown) = answers
        .keys()
        .find(|id| !SUBTESTS.iter().any(|s| s.id == **id))
    {
        return Err(GradeError::UnknownGroup(*unknown));
    }

    for subtest in &SUBTESTS {
        let group = answers.get(&subtest.id).ok_or(GradeError::MissingGroup {
            id: subtest.id,
            name: subtest.name,
        })?;

        if group.len() != subtest.question_count {
            return Err(GradeError::AnswerCount {
                id: subtest.id,
                name: subtest.name,
                expected: subtest.question_count,
                actual: group.len(),
            });
        }
    }

    Ok(())
}

/// Sum the chosen option scores per subtest.
///
/// Deterministic and side-effect free. Every subtest of the questionnaire must
/// have answers and every chosen option id must exist in that subtest.
pub fn grade(questionnaire: &Questionnaire, answers: &AnswerDetail) -> Result<ResultDetail, GradeError> {
    let mut detail = ResultDetail::new();

    for (id, group) in questionnaire {
        let chosen = answers.get(id).ok_or_else(|| GradeError::MissingAnswers {
            id: *id,
            name: group.custom_name.clone(),
        })?;

        let mut sum = 0;
        for option_id in chosen.values() {
            let option = group
                .option(*option_id)
                .ok_or(GradeError::InvalidOption(*option_id))?;
            sum += option.score;
        }

        detail.insert(
            *id,
            SubtestGrade {
                name: group.custom_name.clone(),
                grade: sum,
            },
        );
    }

    Ok(detail)
}
