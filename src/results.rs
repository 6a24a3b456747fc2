use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single question the navigator should answer about the target site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    /// Identifier carried through to the matching answer
    pub id: String,

    /// Free-text question
    #[serde(rename = "question")]
    pub text: String,
}

impl Question {
    /// Create a new question
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// The answer produced for one question.
///
/// `answer: None` with `confidence: 0` means the search exhausted its budget
/// without finding anything. Serialized field names match the wire format the
/// completion prompts use (`questionId`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    /// Id of the question this answer belongs to
    pub question_id: String,

    /// The answer text, or None when nothing was found
    pub answer: Option<String>,

    /// Model-reported confidence, 0-100
    pub confidence: u8,
}

impl Answer {
    /// Answer found on some page
    pub fn found(question_id: impl Into<String>, answer: impl Into<String>, confidence: u8) -> Self {
        Self {
            question_id: question_id.into(),
            answer: Some(answer.into()),
            confidence,
        }
    }

    /// The designed terminal state for an exhausted search
    pub fn not_found(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: None,
            confidence: 0,
        }
    }
}

/// Terminal state of one question's search. Every search ends in exactly one
/// of these; the caller converts it into the single Answer for the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A page answered the question
    Answered {
        answer: Option<String>,
        confidence: u8,
    },

    /// Depth budget or candidate links ran out
    NotFound,
}

impl SearchOutcome {
    /// Convert the outcome into the Answer recorded for `question_id`
    pub fn into_answer(self, question_id: &str) -> Answer {
        match self {
            SearchOutcome::Answered { answer, confidence } => Answer {
                question_id: question_id.to_string(),
                answer,
                confidence,
            },
            SearchOutcome::NotFound => Answer::not_found(question_id),
        }
    }
}

/// Input accepted by `Navigator::find_answers`: either a bare question string
/// or an ordered id -> question mapping, mirroring what task payloads supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionInput {
    /// A single free-text question (an id gets assigned during formatting)
    Single(String),

    /// Questions keyed by caller-chosen ids
    Keyed(IndexMap<String, String>),
}

impl From<&str> for QuestionInput {
    fn from(question: &str) -> Self {
        QuestionInput::Single(question.to_string())
    }
}

impl From<String> for QuestionInput {
    fn from(question: String) -> Self {
        QuestionInput::Single(question)
    }
}

impl From<IndexMap<String, String>> for QuestionInput {
    fn from(questions: IndexMap<String, String>) -> Self {
        QuestionInput::Keyed(questions)
    }
}

/// Build the `{questionId: answer}` object a driver submits on the caller's
/// behalf. Not-found answers are kept as explicit nulls.
pub fn answer_map(answers: &[Answer]) -> serde_json::Map<String, serde_json::Value> {
    let mut map = serde_json::Map::new();
    for answer in answers {
        let value = match &answer.answer {
            Some(text) => serde_json::Value::String(text.clone()),
            None => serde_json::Value::Null,
        };
        map.insert(answer.question_id.clone(), value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_wire_format() {
        let answer = Answer::found("01", "blue", 85);
        let json = serde_json::to_string(&answer).unwrap();
        assert_eq!(
            json,
            r#"{"questionId":"01","answer":"blue","confidence":85}"#
        );

        let missing = Answer::not_found("02");
        let json = serde_json::to_string(&missing).unwrap();
        assert_eq!(json, r#"{"questionId":"02","answer":null,"confidence":0}"#);
    }

    #[test]
    fn test_outcome_into_answer() {
        let answered = SearchOutcome::Answered {
            answer: Some("42".to_string()),
            confidence: 0,
        };
        assert_eq!(answered.into_answer("q"), Answer::found("q", "42", 0));

        let exhausted = SearchOutcome::NotFound;
        assert_eq!(exhausted.into_answer("q"), Answer::not_found("q"));
    }

    #[test]
    fn test_question_input_deserializes_both_shapes() {
        let single: QuestionInput = serde_json::from_str(r#""What is this site about?""#).unwrap();
        assert!(matches!(single, QuestionInput::Single(_)));

        let keyed: QuestionInput =
            serde_json::from_str(r#"{"01":"First question","02":"Second question"}"#).unwrap();
        match keyed {
            QuestionInput::Keyed(map) => {
                // Insertion order preserved for deterministic formatting payloads
                let ids: Vec<&String> = map.keys().collect();
                assert_eq!(ids, ["01", "02"]);
            }
            QuestionInput::Single(_) => panic!("expected keyed input"),
        }
    }

    #[test]
    fn test_answer_map_keeps_nulls() {
        let answers = vec![Answer::found("01", "yes", 50), Answer::not_found("02")];
        let map = answer_map(&answers);
        assert_eq!(map.len(), 2);
        assert_eq!(map["01"], serde_json::json!("yes"));
        assert!(map["02"].is_null());
    }
}
