use crate::labels::LabelRegistry;
use crate::types::{PredictionResponse, ProbabilityVector, ScoreMap};

/// Index of the highest score. Ties go to the lowest index.
pub fn argmax(probs: &ProbabilityVector) -> usize {
    let mut best = 0;
    for (index, &score) in probs.iter().enumerate().skip(1) {
        if score > probs[best] {
            best = index;
        }
    }
    best
}

/// Maps engine output onto the public response shape. Scores are reported
/// as produced, without renormalizing.
pub fn format_response(
    probabilities: &[ProbabilityVector],
    labels: &LabelRegistry,
) -> PredictionResponse {
    let mut prediction = Vec::with_capacity(probabilities.len());
    let mut scores = Vec::with_capacity(probabilities.len());

    for probs in probabilities {
        prediction.push(labels.get(argmax(probs)).to_string());
        scores.push(ScoreMap::new(
            labels
                .as_slice()
                .iter()
                .cloned()
                .zip(probs.iter().copied())
                .collect(),
        ));
    }

    PredictionResponse { prediction, scores }
}
