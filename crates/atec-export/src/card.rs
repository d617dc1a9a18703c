use atec_core::models::package::Package;
use atec_core::models::result::{QuestionnaireResult, total_score};

/// Lines longer than this are word-wrapped.
pub const WRAP_AT: usize = 65;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The text content of a result card: a title and the body lines in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    pub title: String,
    pub lines: Vec<String>,
}

impl ResultCard {
    /// Labels come from the package's attribute keys, the indication from
    /// its categories.
    pub fn build(result: &QuestionnaireResult, package: &Package) -> Self {
        let keys = &package.image_result_attribute_key;
        let total = total_score(&result.result);
        let indication = package.indication_categories.lookup(total);

        let mut lines = Vec::new();
        for grade in result.result.values() {
            lines.extend(wrap(&format!("{}: {}", grade.name, grade.grade)));
        }
        lines.extend(wrap(&format!("{} : {}", keys.total, total)));
        lines.extend(wrap(&format!("{} : {}", keys.indication, indication.detail)));
        lines.extend(wrap(&format!("{} : {}", keys.result_id, result.id)));
        lines.extend(wrap(&format!(
            "{} : {}",
            keys.submitted_at,
            result.created_at.strftime(TIMESTAMP_FORMAT)
        )));

        Self {
            title: keys.title.clone(),
            lines,
        }
    }
}

/// Greedy word wrap at [`WRAP_AT`] characters. A single word longer than the
/// limit stays on its own line.
pub fn wrap(text: &str) -> Vec<String> {
    if text.chars().count() <= WRAP_AT {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > WRAP_AT && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
