// Cross-feature disambiguation guards
//
// These rules fire after the per-feature passes so their penalties can
// correct scores the independent passes already accumulated. They are
// mutually exclusive by construction: each predicate excludes the others'
// trigger region (the tempo boundary at 75 BPM separates the slow guards
// from the reggae window, and the polyrhythm flag separates raga ornament
// from indigenous material). The list order below is load-bearing all the
// same - indigenous-strong must be evaluated before reggae-groove so that,
// should the predicates ever be retuned into overlap, the suppression of
// Reggae for slow polyrhythmic pentatonic material wins.

use super::genre::{Genre, GenreScores};
use super::ClassifierInputs;

/// One ordered (predicate, effect) disambiguation rule
pub struct GuardRule {
    pub name: &'static str,
    pub trigger: fn(&ClassifierInputs) -> bool,
    pub apply: fn(&ClassifierInputs, &mut GenreScores),
}

/// Guards in evaluation order; do not reorder without retuning
pub static GUARD_RULES: [GuardRule; 3] = [
    GuardRule {
        name: "raga-ornament",
        trigger: raga_ornament_trigger,
        apply: raga_ornament_apply,
    },
    GuardRule {
        name: "indigenous-strong",
        trigger: indigenous_strong_trigger,
        apply: indigenous_strong_apply,
    },
    GuardRule {
        name: "reggae-groove",
        trigger: reggae_groove_trigger,
        apply: reggae_groove_apply,
    },
];

/// Free-time ornamental playing: almost no pulse, slow, and not the dense
/// interlocking texture the indigenous guard looks for
fn raga_ornament_trigger(inputs: &ClassifierInputs) -> bool {
    inputs.regularity < 0.12 && inputs.tempo < 70.0 && !inputs.polyrhythmic
}

fn raga_ornament_apply(inputs: &ClassifierInputs, scores: &mut GenreScores) {
    scores.add(Genre::IndianClassical, 1.5);
    // A blues-scale hint strengthens the ornamental reading (bent thirds)
    if inputs.scale_label.contains("Blues") {
        scores.add(Genre::IndianClassical, 0.5);
    }
    scores.add(Genre::Classical, 0.4);
    scores.add(Genre::Reggae, -1.0);
    scores.add(Genre::Electronic, -0.8);
}

/// Slow interlocking pentatonic percussion: polyrhythmic, pentatonic, and
/// either rhythmically dense or bright (rattles, bells, shakers)
fn indigenous_strong_trigger(inputs: &ClassifierInputs) -> bool {
    inputs.polyrhythmic
        && inputs.tempo < 75.0
        && (inputs.scale_label.contains("Pentatonic") || inputs.scale_label.contains("Hirajoshi"))
        && (inputs.complexity > 0.55 || inputs.centroid > 3000.0)
}

fn indigenous_strong_apply(_inputs: &ClassifierInputs, scores: &mut GenreScores) {
    scores.add(Genre::Indigenous, 1.8);
    scores.add(Genre::Folk, 0.8);
    scores.add(Genre::Reggae, -1.2);
    scores.add(Genre::Electronic, -0.5);
}

/// Off-beat skank: moderate tempo, unsteady pulse, percussion light but
/// clearly present. The tempo floor keeps this clear of both slow guards.
fn reggae_groove_trigger(inputs: &ClassifierInputs) -> bool {
    inputs.tempo >= 75.0
        && inputs.tempo <= 115.0
        && inputs.regularity < 0.55
        && inputs.percussiveness >= 0.15
        && inputs.percussiveness <= 0.6
}

fn reggae_groove_apply(_inputs: &ClassifierInputs, scores: &mut GenreScores) {
    scores.add(Genre::Reggae, 1.6);
    scores.add(Genre::Indigenous, -1.0);
    scores.add(Genre::Folk, -0.6);
    scores.add(Genre::IndianClassical, -0.6);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(tempo: f32, regularity: f32, polyrhythmic: bool) -> ClassifierInputs {
        ClassifierInputs {
            tempo,
            regularity,
            complexity: 0.6,
            polyrhythmic,
            percussiveness: 0.4,
            brightness: 0.55,
            centroid: 3500.0,
            scale_label: "A Minor Pentatonic (West African)".to_string(),
            scale_confidence: 0.7,
        }
    }

    fn fired(inputs: &ClassifierInputs) -> Vec<&'static str> {
        GUARD_RULES
            .iter()
            .filter(|rule| (rule.trigger)(inputs))
            .map(|rule| rule.name)
            .collect()
    }

    #[test]
    fn test_guards_mutually_exclusive_on_shared_inputs() {
        // The same feature vector at 95 vs 55 BPM must fire different guards
        assert_eq!(fired(&inputs(95.0, 0.3, true)), vec!["reggae-groove"]);
        assert_eq!(fired(&inputs(55.0, 0.3, true)), vec!["indigenous-strong"]);
    }

    #[test]
    fn test_raga_requires_no_polyrhythm() {
        let mut free_time = inputs(50.0, 0.05, false);
        free_time.scale_label = "C Blues (African-American)".to_string();
        free_time.complexity = 0.4;
        free_time.centroid = 1500.0;
        assert_eq!(fired(&free_time), vec!["raga-ornament"]);

        // Same vector with polyrhythm cannot be raga ornament
        let mut interlocking = free_time.clone();
        interlocking.polyrhythmic = true;
        assert!(!fired(&interlocking).contains(&"raga-ornament"));
    }

    #[test]
    fn test_reggae_guard_needs_present_percussion() {
        let mut silent_groove = inputs(95.0, 0.3, false);
        silent_groove.percussiveness = 0.05;
        assert!(fired(&silent_groove).is_empty());
    }

    #[test]
    fn test_guard_effects_push_opposite_directions() {
        let mut scores = GenreScores::new();
        let groove = inputs(95.0, 0.3, true);
        reggae_groove_apply(&groove, &mut scores);
        assert!(scores.get(Genre::Reggae) > 0.0);
        assert!(scores.get(Genre::Indigenous) < 0.0);

        let mut scores = GenreScores::new();
        let slow = inputs(55.0, 0.3, true);
        indigenous_strong_apply(&slow, &mut scores);
        assert!(scores.get(Genre::Indigenous) > 0.0);
        assert!(scores.get(Genre::Reggae) < 0.0);
    }
}
