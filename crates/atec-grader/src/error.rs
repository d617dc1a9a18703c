use thiserror::Error;

/// Why an authored package was rejected. Messages are shown to the author.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("package name is required")]
    MissingName,

    #[error("questionnaire group number {number} for {name} not found")]
    MissingGroup { number: i32, name: &'static str },

    #[error("questionnaire group id {0} is not part of the ATEC template")]
    UnknownGroup(i32),

    #[error("questionnaire group number {number} requires a custom name")]
    MissingCustomName { number: i32 },

    #[error(
        "questionnaire group number {number} for {name} expecting {expected} number of options, but got {actual}"
    )]
    OptionCount {
        number: i32,
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(
        "questionnaire group number {number} for {name} expecting {expected} number of questions, but got {actual}"
    )]
    QuestionCount {
        number: i32,
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("question {index} of checklist group name {group} is empty")]
    EmptyQuestion { group: String, index: usize },

    #[error("option {id} of checklist group name {group} requires a description")]
    EmptyOptionDescription { group: String, id: i32 },

    #[error("duplicate option id {id} for checklist group name {group}")]
    DuplicateOptionId { group: String, id: i32 },

    #[error("duplicate option score {score} for checklist group name {group}")]
    DuplicateOptionScore { group: String, score: i32 },

    #[error("negative option score {score} for checklist group name {group}")]
    NegativeOptionScore { group: String, score: i32 },

    #[error("missing option score {score} for checklist group name {group}")]
    MissingOptionScore { group: String, score: i32 },

    #[error("expecting at least {minimum} indication categories, but got {actual}")]
    TooFewCategories { minimum: usize, actual: usize },

    #[error("indication category {index}: {reason}")]
    InvalidCategory { index: usize, reason: &'static str },

    #[error("score: {0} has no matching categories or overlapping on the defined categories")]
    UncoveredScore(i32),

    #[error("image result attribute key {0} is required")]
    MissingImageKey(&'static str),
}

/// Why an answer sheet could not be graded. Messages are shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    #[error("subtest id {id} {name} is missing answers")]
    MissingGroup { id: i32, name: &'static str },

    #[error("subtest id {id} {name} is expecting {expected} answers, but got {actual}")]
    AnswerCount {
        id: i32,
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("answers contain unknown subtest id {0}")]
    UnknownGroup(i32),

    #[error("missing answers for subtest id {id} {name}")]
    MissingAnswers { id: i32, name: String },

    #[error("answer with id: {0} is not a valid option")]
    InvalidOption(i32),
}
