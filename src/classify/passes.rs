// Independent per-feature scoring passes
//
// Each pass is a pure additive function over the score table: it reads only
// the sanitized inputs, never another genre's score. Band boundaries are
// half-open [lo, hi). The deltas were tuned against sample recordings;
// changing one band shifts rankings globally, so adjust with the
// classification tests watching.

use super::genre::{Genre, GenreScores};
use super::ClassifierInputs;

/// Tempo-band scoring across six BPM bands
pub fn tempo_pass(inputs: &ClassifierInputs, scores: &mut GenreScores) {
    let tempo = inputs.tempo;
    if tempo < 60.0 {
        scores.add(Genre::Ambient, 2.0);
        scores.add(Genre::Classical, 1.5);
        scores.add(Genre::IndianClassical, 1.2);
        scores.add(Genre::Indigenous, 1.0);
        scores.add(Genre::Electronic, -1.0);
        scores.add(Genre::Metal, -1.0);
        scores.add(Genre::HipHop, -0.5);
    } else if tempo < 90.0 {
        scores.add(Genre::Blues, 1.5);
        scores.add(Genre::Reggae, 1.2);
        scores.add(Genre::HipHop, 1.0);
        scores.add(Genre::Folk, 1.0);
        scores.add(Genre::Indigenous, 0.8);
        scores.add(Genre::Metal, -0.8);
        scores.add(Genre::Electronic, -0.5);
    } else if tempo < 110.0 {
        scores.add(Genre::Reggae, 1.3);
        scores.add(Genre::HipHop, 1.2);
        scores.add(Genre::Pop, 1.0);
        scores.add(Genre::Country, 1.0);
        scores.add(Genre::Latin, 0.8);
        scores.add(Genre::Rock, 0.6);
    } else if tempo < 130.0 {
        scores.add(Genre::Rock, 1.4);
        scores.add(Genre::Pop, 1.3);
        scores.add(Genre::Country, 1.0);
        scores.add(Genre::Latin, 1.0);
        scores.add(Genre::Electronic, 0.8);
        scores.add(Genre::Ambient, -1.0);
        scores.add(Genre::IndianClassical, -0.6);
    } else if tempo < 160.0 {
        scores.add(Genre::Electronic, 1.5);
        scores.add(Genre::Metal, 1.2);
        scores.add(Genre::Rock, 1.0);
        scores.add(Genre::Latin, 0.6);
        scores.add(Genre::Ambient, -1.2);
        scores.add(Genre::Blues, -0.6);
        scores.add(Genre::Reggae, -0.8);
    } else {
        scores.add(Genre::Metal, 1.6);
        scores.add(Genre::Electronic, 1.2);
        scores.add(Genre::Jazz, 0.5);
        scores.add(Genre::Ambient, -1.5);
        scores.add(Genre::Reggae, -1.0);
        scores.add(Genre::Blues, -0.8);
    }
}

/// Regularity-band scoring across five bands
///
/// The lowest band carries the reggae-vs-world split: an unsteady pulse
/// with light-but-present percussion in a moderate tempo window reads as a
/// skank groove, the same pulse outside that window as world/folk material.
pub fn regularity_pass(inputs: &ClassifierInputs, scores: &mut GenreScores) {
    let regularity = inputs.regularity;
    if regularity >= 0.9 {
        scores.add(Genre::Electronic, 1.5);
        scores.add(Genre::Pop, 0.8);
        scores.add(Genre::HipHop, 0.6);
        scores.add(Genre::Metal, 0.5);
        scores.add(Genre::Jazz, -0.5);
        scores.add(Genre::IndianClassical, -0.8);
    } else if regularity >= 0.7 {
        scores.add(Genre::Rock, 1.0);
        scores.add(Genre::Pop, 1.0);
        scores.add(Genre::Country, 0.8);
        scores.add(Genre::Latin, 0.6);
    } else if regularity >= 0.5 {
        scores.add(Genre::Jazz, 0.8);
        scores.add(Genre::Blues, 0.8);
        scores.add(Genre::Folk, 0.6);
        scores.add(Genre::Reggae, 0.5);
    } else if regularity >= 0.35 {
        scores.add(Genre::Jazz, 1.0);
        scores.add(Genre::IndianClassical, 0.6);
        scores.add(Genre::Indigenous, 0.6);
        scores.add(Genre::Electronic, -1.0);
        scores.add(Genre::Pop, -0.5);
    } else if inputs.tempo >= 70.0
        && inputs.tempo <= 110.0
        && inputs.percussiveness > 0.15
        && inputs.percussiveness < 0.55
    {
        scores.add(Genre::Reggae, 1.4);
        scores.add(Genre::Jazz, 0.5);
        scores.add(Genre::Folk, -0.4);
        scores.add(Genre::Indigenous, -0.4);
    } else {
        scores.add(Genre::Folk, 1.0);
        scores.add(Genre::Indigenous, 0.9);
        scores.add(Genre::IndianClassical, 0.8);
        scores.add(Genre::Classical, 0.5);
        scores.add(Genre::Electronic, -1.2);
        scores.add(Genre::Metal, -0.8);
    }
}

/// Percussiveness-band scoring
pub fn percussiveness_pass(inputs: &ClassifierInputs, scores: &mut GenreScores) {
    let percussiveness = inputs.percussiveness;
    if percussiveness >= 0.7 {
        scores.add(Genre::Metal, 1.2);
        scores.add(Genre::Electronic, 1.2);
        scores.add(Genre::Rock, 1.0);
        scores.add(Genre::HipHop, 0.8);
        scores.add(Genre::Indigenous, 0.6);
        scores.add(Genre::Classical, -1.0);
        scores.add(Genre::Ambient, -1.2);
        scores.add(Genre::Folk, -0.4);
    } else if percussiveness >= 0.4 {
        scores.add(Genre::Rock, 0.8);
        scores.add(Genre::Pop, 0.8);
        scores.add(Genre::Latin, 0.8);
        scores.add(Genre::Reggae, 0.6);
        scores.add(Genre::Country, 0.6);
    } else if percussiveness >= 0.15 {
        scores.add(Genre::Reggae, 0.7);
        scores.add(Genre::Folk, 0.6);
        scores.add(Genre::Jazz, 0.5);
        scores.add(Genre::Blues, 0.5);
        scores.add(Genre::Country, 0.4);
    } else {
        scores.add(Genre::Classical, 1.2);
        scores.add(Genre::Ambient, 1.2);
        scores.add(Genre::IndianClassical, 0.6);
        scores.add(Genre::Folk, 0.5);
        scores.add(Genre::Metal, -1.2);
        scores.add(Genre::Electronic, -0.8);
        scores.add(Genre::Rock, -0.6);
        scores.add(Genre::HipHop, -0.6);
    }
}

/// Brightness-band scoring (spectral centroid mapped to [0, 1])
pub fn brightness_pass(inputs: &ClassifierInputs, scores: &mut GenreScores) {
    let brightness = inputs.brightness;
    if brightness >= 0.65 {
        scores.add(Genre::Electronic, 1.0);
        scores.add(Genre::Metal, 1.0);
        scores.add(Genre::Pop, 0.6);
        scores.add(Genre::Indigenous, 0.4);
        scores.add(Genre::Blues, -0.5);
        scores.add(Genre::Ambient, -0.4);
    } else if brightness >= 0.35 {
        scores.add(Genre::Rock, 0.6);
        scores.add(Genre::Jazz, 0.5);
        scores.add(Genre::Country, 0.5);
        scores.add(Genre::Latin, 0.5);
    } else {
        scores.add(Genre::Blues, 0.8);
        scores.add(Genre::Classical, 0.7);
        scores.add(Genre::Ambient, 0.8);
        scores.add(Genre::HipHop, 0.6);
        scores.add(Genre::Reggae, 0.4);
        scores.add(Genre::Metal, -0.5);
    }
}

/// Scale-keyword scoring; the first matching family wins
pub fn scale_pass(inputs: &ClassifierInputs, scores: &mut GenreScores) {
    let label = inputs.scale_label.as_str();

    if label.contains("Blues") {
        scores.add(Genre::Blues, 1.5);
        scores.add(Genre::Jazz, 0.8);
        scores.add(Genre::Rock, 0.5);
    } else if label.contains("Pentatonic") || label.contains("Hirajoshi") {
        scores.add(Genre::Indigenous, 1.0);
        scores.add(Genre::Folk, 0.8);
        scores.add(Genre::Blues, 0.5);
        scores.add(Genre::IndianClassical, 0.4);
    } else if label.contains("Double Harmonic") {
        scores.add(Genre::IndianClassical, 1.2);
        scores.add(Genre::Indigenous, 0.6);
    } else if label.contains("Chromatic") || label.contains("Whole Tone") {
        scores.add(Genre::Jazz, 1.0);
        scores.add(Genre::Classical, 0.8);
        scores.add(Genre::Metal, 0.4);
    } else if label.contains("Dorian")
        || label.contains("Phrygian")
        || label.contains("Lydian")
        || label.contains("Mixolydian")
    {
        scores.add(Genre::Jazz, 0.7);
        scores.add(Genre::Folk, 0.6);
        scores.add(Genre::Rock, 0.3);
    } else if label.contains("Minor") {
        scores.add(Genre::Metal, 0.5);
        scores.add(Genre::Classical, 0.4);
        scores.add(Genre::Ambient, 0.3);
    } else if label.contains("Major") {
        scores.add(Genre::Pop, 0.6);
        scores.add(Genre::Country, 0.6);
        scores.add(Genre::Folk, 0.4);
    }
    // "Unknown" matches nothing on purpose
}

/// Temporal-complexity scoring
pub fn complexity_pass(inputs: &ClassifierInputs, scores: &mut GenreScores) {
    let complexity = inputs.complexity;
    if complexity >= 0.75 {
        scores.add(Genre::Jazz, 1.2);
        scores.add(Genre::IndianClassical, 0.8);
        scores.add(Genre::Indigenous, 0.8);
        scores.add(Genre::Classical, 0.5);
        scores.add(Genre::Pop, -0.8);
        scores.add(Genre::Country, -0.5);
    } else if complexity >= 0.5 {
        scores.add(Genre::Latin, 0.6);
        scores.add(Genre::Rock, 0.5);
        scores.add(Genre::Jazz, 0.5);
        scores.add(Genre::Blues, 0.4);
    } else if complexity >= 0.25 {
        scores.add(Genre::Pop, 0.6);
        scores.add(Genre::Country, 0.5);
        scores.add(Genre::Reggae, 0.5);
        scores.add(Genre::Folk, 0.4);
    } else {
        scores.add(Genre::Electronic, 0.8);
        scores.add(Genre::Pop, 0.6);
        scores.add(Genre::HipHop, 0.5);
        scores.add(Genre::Ambient, 0.5);
        scores.add(Genre::Jazz, -0.8);
    }
}

/// Polyrhythm flag scoring
pub fn polyrhythm_pass(inputs: &ClassifierInputs, scores: &mut GenreScores) {
    if inputs.polyrhythmic {
        scores.add(Genre::Indigenous, 1.2);
        scores.add(Genre::Latin, 0.8);
        scores.add(Genre::Jazz, 0.6);
        scores.add(Genre::IndianClassical, 0.6);
        scores.add(Genre::Pop, -0.6);
        scores.add(Genre::Country, -0.4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ClassifierInputs {
        ClassifierInputs {
            tempo: 120.0,
            regularity: 0.8,
            complexity: 0.4,
            polyrhythmic: false,
            percussiveness: 0.5,
            brightness: 0.5,
            centroid: 2000.0,
            scale_label: "C Major (Western)".to_string(),
            scale_confidence: 0.8,
        }
    }

    #[test]
    fn test_tempo_band_rewards_rock_at_120() {
        let mut scores = GenreScores::new();
        tempo_pass(&inputs(), &mut scores);
        assert!(scores.get(Genre::Rock) > 0.0);
        assert!(scores.get(Genre::Ambient) < 0.0);
    }

    #[test]
    fn test_slow_tempo_rewards_ambient() {
        let mut scores = GenreScores::new();
        let mut slow = inputs();
        slow.tempo = 45.0;
        tempo_pass(&slow, &mut scores);
        assert!(scores.get(Genre::Ambient) > scores.get(Genre::Rock));
    }

    #[test]
    fn test_low_regularity_moderate_tempo_is_reggae_branch() {
        let mut scores = GenreScores::new();
        let mut groove = inputs();
        groove.regularity = 0.2;
        groove.tempo = 90.0;
        groove.percussiveness = 0.3;
        regularity_pass(&groove, &mut scores);
        assert!(scores.get(Genre::Reggae) > 0.0);
        assert!(scores.get(Genre::Folk) < 0.0);
    }

    #[test]
    fn test_low_regularity_slow_tempo_is_world_branch() {
        let mut scores = GenreScores::new();
        let mut loose = inputs();
        loose.regularity = 0.2;
        loose.tempo = 55.0;
        loose.percussiveness = 0.3;
        regularity_pass(&loose, &mut scores);
        assert!(scores.get(Genre::Folk) > 0.0);
        assert!(scores.get(Genre::Indigenous) > 0.0);
        assert_eq!(scores.get(Genre::Reggae), 0.0);
    }

    #[test]
    fn test_scale_pass_keyword_priority() {
        // "Minor Pentatonic" must score as pentatonic, not as minor
        let mut scores = GenreScores::new();
        let mut pentatonic = inputs();
        pentatonic.scale_label = "A Minor Pentatonic (West African)".to_string();
        scale_pass(&pentatonic, &mut scores);
        assert!(scores.get(Genre::Indigenous) > 0.0);
        assert_eq!(scores.get(Genre::Metal), 0.0);
    }

    #[test]
    fn test_unknown_scale_scores_nothing() {
        let mut scores = GenreScores::new();
        let mut unknown = inputs();
        unknown.scale_label = "Unknown".to_string();
        scale_pass(&unknown, &mut scores);
        assert_eq!(scores, GenreScores::new());
    }

    #[test]
    fn test_polyrhythm_pass_is_conditional() {
        let mut scores = GenreScores::new();
        polyrhythm_pass(&inputs(), &mut scores);
        assert_eq!(scores, GenreScores::new());

        let mut poly = inputs();
        poly.polyrhythmic = true;
        polyrhythm_pass(&poly, &mut scores);
        assert!(scores.get(Genre::Indigenous) > 0.0);
    }
}
