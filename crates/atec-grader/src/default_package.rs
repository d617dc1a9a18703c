//! The stock English ATEC package seeded on first start.

use atec_core::models::package::{
    AnswerOption, ChecklistGroup, ImageResultAttributeKey, IndicationCategories,
    IndicationCategory, PackageContent, Questionnaire,
};

const SPEECH: [&str; 14] = [
    "Knows own name",
    "Responds to 'No' or 'Stop'",
    "Can follow some commands",
    "Can use one word at a time (No!, Eat, Water, etc.)",
    "Can use two words at a time (Don't want, Go home)",
    "Can use three words at a time (Want more milk)",
    "Knows 10 or more words",
    "Can use sentences with four or more words",
    "Explains what he/she wants",
    "Asks meaningful questions",
    "Speech tends to be meaningful/relevant",
    "Often uses several successive sentences",
    "Carries on fairly good conversation",
    "Has normal ability to communicate for his/her age",
];

const SOCIABILITY: [&str; 20] = [
    "Seems to be in a shell, you cannot reach him/her",
    "Ignores other people",
    "Pays little or no attention when addressed",
    "Uncooperative and resistant",
    "No eye contact",
    "Prefers to be left alone",
    "Shows no affection",
    "Fails to greet parents",
    "Avoids contact with others",
    "Does not imitate",
    "Dislikes being held or cuddled",
    "Does not share or show",
    "Does not wave 'bye bye'",
    "Disagreeable/not compliant",
    "Temper tantrums",
    "Lacks friends/companions",
    "Rarely smiles",
    "Insensitive to other's feelings",
    "Indifferent to being liked",
    "Indifferent if parent(s) leave",
];

const SENSORY: [&str; 18] = [
    "Responds to own name",
    "Responds to praise",
    "Looks at people and animals",
    "Looks at pictures (and T.V.)",
    "Does drawing, coloring, art",
    "Plays with toys appropriately",
    "Appropriate facial expression",
    "Understands stories on T.V.",
    "Understands explanations",
    "Aware of environment",
    "Aware of danger",
    "Shows imagination",
    "Initiates activities",
    "Dresses self",
    "Curious, interested",
    "Venturesome, explores",
    "Tuned in, not spacey",
    "Looks where others are looking",
];

const HEALTH: [&str; 25] = [
    "Bed-wetting",
    "Wets pants/diapers",
    "Soils pants/diapers",
    "Diarrhea",
    "Constipation",
    "Sleep problems",
    "Eats too much/too little",
    "Extremely limited diet",
    "Hyperactive",
    "Lethargic",
    "Hits or injures self",
    "Hits or injures others",
    "Destructive",
    "Sound-sensitive",
    "Anxious/fearful",
    "Unhappy/crying",
    "Seizures",
    "Obsessive speech",
    "Rigid routines",
    "Shouts or screams",
    "Demands sameness",
    "Often agitated",
    "Not sensitive to pain",
    "Hooked or fixated on certain objects/topics",
    "Repetitive movements (stimming, rocking, etc.)",
];

fn option(id: i32, description: &str, score: i32) -> AnswerOption {
    AnswerOption {
        id,
        description: description.to_string(),
        score,
    }
}

fn group(name: &str, questions: &[&str], options: Vec<AnswerOption>) -> ChecklistGroup {
    ChecklistGroup {
        custom_name: name.to_string(),
        questions: questions.iter().map(|q| q.to_string()).collect(),
        options,
    }
}

fn category(min: i32, max: i32, name: &str, detail: &str) -> IndicationCategory {
    IndicationCategory {
        minimum_score: min,
        maximum_score: max,
        name: name.to_string(),
        detail: detail.to_string(),
    }
}

pub fn default_content() -> PackageContent {
    let mut questionnaire = Questionnaire::new();
    questionnaire.insert(
        0,
        group(
            "Speech/Language/Communication",
            &SPEECH,
            vec![
                option(2, "Not true", 2),
                option(1, "Somewhat true", 1),
                option(0, "Very true", 0),
            ],
        ),
    );
    questionnaire.insert(
        1,
        group(
            "Sociability",
            &SOCIABILITY,
            vec![
                option(0, "Not descriptive", 0),
                option(1, "Somewhat descriptive", 1),
                option(2, "Very descriptive", 2),
            ],
        ),
    );
    questionnaire.insert(
        2,
        group(
            "Sensory/Cognitive Awareness",
            &SENSORY,
            vec![
                option(0, "Very descriptive", 0),
                option(1, "Somewhat descriptive", 1),
                option(2, "Not descriptive", 2),
            ],
        ),
    );
    questionnaire.insert(
        3,
        group(
            "Health/Physical/Behavior",
            &HEALTH,
            vec![
                option(3, "Serious problem", 3),
                option(2, "Moderate problem", 2),
                option(1, "Minor problem", 1),
                option(0, "Not a problem", 0),
            ],
        ),
    );

    PackageContent {
        name: "ATEC (English)".to_string(),
        questionnaire,
        indication_categories: IndicationCategories(vec![
            category(
                0,
                30,
                "mild",
                "Behaviour and communication are close to typical; a good chance of an independent adult life.",
            ),
            category(
                31,
                50,
                "moderate",
                "Likely able to live semi-independently without formal residential care.",
            ),
            category(
                51,
                179,
                "severe",
                "Around the 90th percentile of severity; ongoing support is likely to be needed.",
            ),
        ]),
        image_result_attribute_key: ImageResultAttributeKey {
            title: "ATEC Score".to_string(),
            total: "Total Score".to_string(),
            indication: "Indication".to_string(),
            result_id: "Result ID".to_string(),
            submitted_at: "Submitted At".to_string(),
        },
    }
}
