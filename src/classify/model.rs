//! Naive-Bayes bag-of-words model storage and scoring.
//!
//! The model file is a JSON table of per-label document counts and token
//! counts, produced offline from a labelled chat corpus. Scoring happens in
//! log space with Laplace smoothing; the reported confidence is the posterior
//! of the winning label after log-sum-exp normalisation over the label set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;

use crate::comment::AggregationError;

use super::{Classification, DialogueAct};

#[derive(Debug, Deserialize)]
struct ModelFile {
    labels: BTreeMap<String, LabelCounts>,
}

#[derive(Debug, Deserialize)]
struct LabelCounts {
    documents: u32,
    tokens: BTreeMap<String, u32>,
}

#[derive(Debug)]
struct ClassTable {
    act: DialogueAct,
    log_prior: f64,
    token_counts: HashMap<String, u32>,
    total_tokens: u32,
}

/// Immutable trained model: one table per label, in deterministic order.
#[derive(Debug)]
pub(super) struct NaiveBayesModel {
    classes: Vec<ClassTable>,
    vocabulary_size: u32,
}

impl NaiveBayesModel {
    /// Parses and validates model JSON.
    pub(super) fn from_json_str(json: &str) -> Result<Self, AggregationError> {
        let file: ModelFile =
            serde_json::from_str(json).map_err(|error| load_failure(&error.to_string()))?;

        if file.labels.is_empty() {
            return Err(load_failure("model defines no labels"));
        }

        let mut vocabulary: BTreeSet<String> = BTreeSet::new();
        let mut total_documents: u64 = 0;
        for counts in file.labels.values() {
            total_documents += u64::from(counts.documents);
            vocabulary.extend(counts.tokens.keys().cloned());
        }
        if vocabulary.is_empty() {
            return Err(load_failure("model carries no token statistics"));
        }

        let classes = file
            .labels
            .into_iter()
            .map(|(label, counts)| build_class(&label, counts, total_documents))
            .collect::<Result<Vec<ClassTable>, AggregationError>>()?;

        let vocabulary_size = u32::try_from(vocabulary.len())
            .map_err(|_| load_failure("model vocabulary is implausibly large"))?;

        Ok(Self {
            classes,
            vocabulary_size,
        })
    }

    /// Scores `body_text` against every label and returns the winner.
    ///
    /// Text that yields no tokens (punctuation only) falls back to the label
    /// priors, which still produces a valid posterior.
    pub(super) fn classify(&self, body_text: &str) -> Classification {
        let tokens = tokenize(body_text);

        let scores: Vec<f64> = self
            .classes
            .iter()
            .map(|class| self.log_score(class, &tokens))
            .collect();

        let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let total: f64 = scores.iter().map(|score| (score - max_score).exp()).sum();

        let mut best_act = DialogueAct::Unclassifiable;
        let mut best_posterior = 0.0_f64;
        for (class, score) in self.classes.iter().zip(&scores) {
            let posterior = (score - max_score).exp() / total;
            if posterior > best_posterior {
                best_act = class.act;
                best_posterior = posterior;
            }
        }

        Classification::new(best_act, best_posterior.clamp(0.0, 1.0))
    }

    fn log_score(&self, class: &ClassTable, tokens: &[String]) -> f64 {
        let denominator = f64::from(class.total_tokens) + f64::from(self.vocabulary_size);
        tokens
            .iter()
            .map(|token| {
                let count = class.token_counts.get(token).copied().unwrap_or(0);
                ((f64::from(count) + 1.0) / denominator).ln()
            })
            .sum::<f64>()
            + class.log_prior
    }
}

fn build_class(
    label: &str,
    counts: LabelCounts,
    total_documents: u64,
) -> Result<ClassTable, AggregationError> {
    let act = DialogueAct::from_label(label)
        .ok_or_else(|| load_failure(&format!("unknown label `{label}`")))?;
    if act == DialogueAct::Unclassifiable {
        return Err(load_failure("`Unclassifiable` cannot be a trained label"));
    }
    if counts.documents == 0 {
        return Err(load_failure(&format!("label `{label}` has zero documents")));
    }

    let total_tokens: u32 = counts.tokens.values().sum();
    // total_documents >= counts.documents >= 1 here, so the ratio is finite.
    let prior = f64::from(counts.documents) / u64_to_f64(total_documents);

    Ok(ClassTable {
        act,
        log_prior: prior.ln(),
        token_counts: counts.tokens.into_iter().collect(),
        total_tokens,
    })
}

/// Lowercases and splits on non-alphanumeric boundaries.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

#[expect(
    clippy::cast_precision_loss,
    reason = "document totals are far below 2^52; the prior is approximate anyway"
)]
const fn u64_to_f64(value: u64) -> f64 {
    value as f64
}

fn load_failure(message: &str) -> AggregationError {
    AggregationError::ClassifierLoadFailure {
        message: message.to_owned(),
    }
}
