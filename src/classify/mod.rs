//! Dialogue-act classification of comment text.
//!
//! The classifier assigns each comment one label from a fixed, closed set of
//! discourse acts using a pre-trained naive-Bayes bag-of-words model. The
//! model is loaded once at startup, held immutable for the process lifetime,
//! and passed into the pipeline by reference, so concurrent classification is
//! a pure read of shared state.

mod model;

use std::fmt;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::comment::AggregationError;

use model::NaiveBayesModel;

/// Closed set of discourse-act labels.
///
/// The inventory matches the chat corpus the model was trained on, plus
/// [`DialogueAct::Unclassifiable`] for text the classifier refuses to label
/// (empty or whitespace-only input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DialogueAct {
    /// Agreement with a prior utterance.
    Accept,
    /// Closing an exchange.
    Bye,
    /// Request for clarification.
    Clarify,
    /// Continuation of the speaker's own prior utterance.
    Continuer,
    /// Emotional expression.
    Emotion,
    /// Emphatic statement.
    Emphasis,
    /// Opening an exchange.
    Greet,
    /// Negative answer to a question.
    #[serde(rename = "nAnswer")]
    NAnswer,
    /// Anything outside the other categories.
    Other,
    /// Disagreement with a prior utterance.
    Reject,
    /// Plain declarative statement.
    Statement,
    /// Automated or system-generated text.
    System,
    /// Open question (who/what/when/where/why/how).
    #[serde(rename = "whQuestion")]
    WhQuestion,
    /// Positive answer to a question.
    #[serde(rename = "yAnswer")]
    YAnswer,
    /// Yes/no question.
    #[serde(rename = "ynQuestion")]
    YnQuestion,
    /// Returned for input the classifier declines to label.
    Unclassifiable,
}

impl DialogueAct {
    /// Every label the classifier can return.
    pub const ALL: [Self; 16] = [
        Self::Accept,
        Self::Bye,
        Self::Clarify,
        Self::Continuer,
        Self::Emotion,
        Self::Emphasis,
        Self::Greet,
        Self::NAnswer,
        Self::Other,
        Self::Reject,
        Self::Statement,
        Self::System,
        Self::WhQuestion,
        Self::YAnswer,
        Self::YnQuestion,
        Self::Unclassifiable,
    ];

    /// Label name as it appears in model files and exported output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "Accept",
            Self::Bye => "Bye",
            Self::Clarify => "Clarify",
            Self::Continuer => "Continuer",
            Self::Emotion => "Emotion",
            Self::Emphasis => "Emphasis",
            Self::Greet => "Greet",
            Self::NAnswer => "nAnswer",
            Self::Other => "Other",
            Self::Reject => "Reject",
            Self::Statement => "Statement",
            Self::System => "System",
            Self::WhQuestion => "whQuestion",
            Self::YAnswer => "yAnswer",
            Self::YnQuestion => "ynQuestion",
            Self::Unclassifiable => "Unclassifiable",
        }
    }

    /// Resolves a model-file label name to its act.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|act| act.as_str() == label)
    }
}

impl fmt::Display for DialogueAct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The label chosen for one text plus the model's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    act: DialogueAct,
    confidence: f64,
}

impl Classification {
    pub(crate) const fn new(act: DialogueAct, confidence: f64) -> Self {
        Self { act, confidence }
    }

    /// The chosen dialogue act.
    #[must_use]
    pub const fn act(&self) -> DialogueAct {
        self.act
    }

    /// Posterior probability of the chosen act, in `[0.0, 1.0]`.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Dialogue-act classifier over an immutable pre-trained model.
#[derive(Debug)]
pub struct DialogueActClassifier {
    model: NaiveBayesModel,
}

impl DialogueActClassifier {
    /// Loads and validates the model file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::ClassifierLoadFailure`] when the file
    /// cannot be read, is not valid model JSON, names an unknown label, or
    /// carries no usable statistics. The pipeline treats this as fatal at
    /// startup: no partial run is attempted without a model.
    pub fn load(path: &Utf8Path) -> Result<Self, AggregationError> {
        let contents = std::fs::read_to_string(path).map_err(|error| {
            AggregationError::ClassifierLoadFailure {
                message: format!("cannot read model file {path}: {error}"),
            }
        })?;
        Self::from_json_str(&contents)
    }

    /// Builds a classifier from model JSON already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::ClassifierLoadFailure`] for malformed or
    /// empty model data.
    pub fn from_json_str(json: &str) -> Result<Self, AggregationError> {
        NaiveBayesModel::from_json_str(json).map(|model| Self { model })
    }

    /// Labels one comment body.
    ///
    /// Total over all inputs: empty or whitespace-only text maps to
    /// [`DialogueAct::Unclassifiable`] with confidence `0.0`; everything else
    /// gets exactly one model label with a posterior in `(0.0, 1.0]`.
    /// Stateless and side-effect-free, so calls may run concurrently.
    #[must_use]
    pub fn classify(&self, body_text: &str) -> Classification {
        if body_text.trim().is_empty() {
            return Classification::new(DialogueAct::Unclassifiable, 0.0);
        }
        self.model.classify(body_text)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::{Classification, DialogueAct, DialogueActClassifier};
    use crate::comment::AggregationError;

    fn model_json() -> String {
        json!({
            "labels": {
                "Statement": {
                    "documents": 60,
                    "tokens": {
                        "the": 40, "is": 30, "renamed": 10, "constant": 12,
                        "looks": 8, "this": 25
                    }
                },
                "whQuestion": {
                    "documents": 25,
                    "tokens": {
                        "why": 20, "what": 18, "how": 15, "is": 10, "this": 12
                    }
                },
                "Accept": {
                    "documents": 15,
                    "tokens": {
                        "agreed": 10, "lgtm": 12, "sounds": 6, "good": 9
                    }
                }
            }
        })
        .to_string()
    }

    #[fixture]
    fn classifier() -> DialogueActClassifier {
        DialogueActClassifier::from_json_str(&model_json()).expect("model should load")
    }

    fn assert_total(classification: Classification) {
        assert!(DialogueAct::ALL.contains(&classification.act()));
        assert!((0.0..=1.0).contains(&classification.confidence()));
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   \n\t  ")]
    fn blank_text_is_unclassifiable_with_zero_confidence(
        classifier: DialogueActClassifier,
        #[case] text: &str,
    ) {
        let classification = classifier.classify(text);
        assert_eq!(classification.act(), DialogueAct::Unclassifiable);
        assert!((classification.confidence() - 0.0).abs() < f64::EPSILON);
    }

    #[rstest]
    fn question_words_classify_as_question(classifier: DialogueActClassifier) {
        let classification = classifier.classify("why is this renamed?");
        assert_eq!(classification.act(), DialogueAct::WhQuestion);
        assert!(classification.confidence() > 0.5);
        assert_total(classification);
    }

    #[rstest]
    fn agreement_classifies_as_accept(classifier: DialogueActClassifier) {
        let classification = classifier.classify("lgtm, sounds good");
        assert_eq!(classification.act(), DialogueAct::Accept);
        assert_total(classification);
    }

    #[rstest]
    #[case::unknown_tokens("zxqv wvut polyglot")]
    #[case::punctuation_only("?!?! ... ---")]
    #[case::ordinary("the constant is renamed")]
    #[case::unicode("naïve façade rené")]
    fn every_input_gets_exactly_one_label_in_bounds(
        classifier: DialogueActClassifier,
        #[case] text: &str,
    ) {
        assert_total(classifier.classify(text));
    }

    #[rstest]
    fn classification_is_deterministic(classifier: DialogueActClassifier) {
        let first = classifier.classify("why is this renamed?");
        let second = classifier.classify("why is this renamed?");
        assert_eq!(first, second);
    }

    #[rstest]
    fn unknown_label_in_model_fails_load() {
        let bad = json!({
            "labels": { "Interrobang": { "documents": 5, "tokens": { "eh": 2 } } }
        })
        .to_string();

        let error = DialogueActClassifier::from_json_str(&bad).expect_err("should fail");
        assert!(matches!(
            error,
            AggregationError::ClassifierLoadFailure { .. }
        ));
    }

    #[rstest]
    #[case::empty_labels(json!({ "labels": {} }).to_string())]
    #[case::zero_documents(
        json!({ "labels": { "Statement": { "documents": 0, "tokens": { "the": 1 } } } }).to_string()
    )]
    #[case::no_tokens(
        json!({ "labels": { "Statement": { "documents": 5, "tokens": {} } } }).to_string()
    )]
    #[case::not_json("{ nope".to_owned())]
    fn degenerate_models_fail_load(#[case] bad: String) {
        assert!(DialogueActClassifier::from_json_str(&bad).is_err());
    }

    #[rstest]
    fn label_names_round_trip(#[values(DialogueAct::NAnswer, DialogueAct::YnQuestion, DialogueAct::Statement)] act: DialogueAct) {
        assert_eq!(DialogueAct::from_label(act.as_str()), Some(act));
    }
}
