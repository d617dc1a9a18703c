use atec_core::models::package::SubtestId;
use serde::Serialize;

/// Shape of one ATEC subtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Subtest {
    pub id: SubtestId,
    pub name: &'static str,
    pub question_count: usize,
    pub option_count: usize,
}

impl Subtest {
    /// Highest grade a subtest can reach when scores run 0..option_count.
    pub const fn max_grade(&self) -> i32 {
        (self.question_count * (self.option_count - 1)) as i32
    }
}

/// The four ATEC subtests. Packages may relabel questions and options but
/// must keep these counts.
pub const SUBTESTS: [Subtest; 4] = [
    Subtest {
        id: 0,
        name: "Speech/Language/Communication",
        question_count: 14,
        option_count: 3,
    },
    Subtest {
        id: 1,
        name: "Sociability",
        question_count: 20,
        option_count: 3,
    },
    Subtest {
        id: 2,
        name: "Sensory/Cognitive Awareness",
        question_count: 18,
        option_count: 3,
    },
    Subtest {
        id: 3,
        name: "Health/Physical/Behavior",
        question_count: 25,
        option_count: 4,
    },
];

pub const MINIMUM_SCORE: i32 = 0;

pub const MAXIMUM_SCORE: i32 = SUBTESTS[0].max_grade()
    + SUBTESTS[1].max_grade()
    + SUBTESTS[2].max_grade()
    + SUBTESTS[3].max_grade();

pub fn subtest(id: SubtestId) -> Option<&'static Subtest> {
    SUBTESTS.iter().find(|s| s.id == id)
}
