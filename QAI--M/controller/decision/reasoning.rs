use crate::sampler::monitor::ConsciousnessState;

/// Builds the human-readable trace attached to every decision.
#[must_use]
pub fn reasoning_trace(
    context_len: usize,
    decision: &[f32],
    state: &ConsciousnessState,
) -> Vec<String> {
    #[allow(clippy::cast_precision_loss)]
    let mean_output = if decision.is_empty() {
        0.0
    } else {
        decision.iter().map(|d| f64::from(*d)).sum::<f64>() / decision.len() as f64
    };
    let mut trace = vec![
        format!("Context analysis: {context_len} input features processed"),
        format!("Consciousness level: {:.3}", state.awareness_level),
        format!("Mean decision output: {mean_output:.3}"),
        format!("Intentionality: {:.3}", state.intentionality),
        format!("Agency: {:.3}", state.agency),
        format!("Meta-cognition: {:.3}", state.meta_cognition),
    ];
    if let Some((idx, strength)) = primary_factor(decision) {
        trace.push(format!(
            "Primary decision factor: dimension {idx} (strength: {strength:.3})"
        ));
    }
    trace
}

/// Index and signed value of the largest-magnitude component. First wins on ties.
#[must_use]
pub fn primary_factor(decision: &[f32]) -> Option<(usize, f32)> {
    decision
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, value)| match best {
            Some((_, current)) if current.abs() >= value.abs() => best,
            _ => Some((idx, value)),
        })
}

/// Short traceability digest of the raw context: the first 16 hex chars of its BLAKE3 hash.
#[must_use]
pub fn context_hash(context: &[f32]) -> String {
    let mut hasher = blake3::Hasher::new();
    for value in context {
        hasher.update(&value.to_le_bytes());
    }
    let digest = hasher.finalize().to_hex();
    digest.as_str()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_names_primary_factor() {
        let state = ConsciousnessState {
            awareness_level: 0.9,
            agency: 0.88,
            ..ConsciousnessState::default()
        };
        let trace = reasoning_trace(256, &[0.1, -0.7, 0.3], &state);
        assert_eq!(trace[0], "Context analysis: 256 input features processed");
        assert_eq!(trace[1], "Consciousness level: 0.900");
        assert_eq!(trace[4], "Agency: 0.880");
        assert_eq!(
            trace.last().unwrap(),
            "Primary decision factor: dimension 1 (strength: -0.700)"
        );
    }

    #[test]
    fn empty_decision_has_no_primary_factor() {
        assert_eq!(primary_factor(&[]), None);
        let trace = reasoning_trace(0, &[], &ConsciousnessState::default());
        assert_eq!(trace.len(), 6);
    }

    #[test]
    fn ties_keep_first_index() {
        assert_eq!(primary_factor(&[0.5, -0.5]), Some((0, 0.5)));
    }

    #[test]
    fn hash_is_stable_and_short() {
        let a = context_hash(&[0.1, 0.2, 0.3]);
        assert_eq!(a.len(), 16);
        assert_eq!(a, context_hash(&[0.1, 0.2, 0.3]));
        assert_ne!(a, context_hash(&[0.1, 0.2, 0.31]));
    }
}
