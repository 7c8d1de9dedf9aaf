// ScaleIdentifier - pitch-class histogram matching against scale templates
//
// Builds a 12-bin pitch-class histogram from a detected pitch contour and
// scores it against a fixed library of scale templates rotated through all
// 12 roots. Size-aware priors and two hard override rules keep 5-note
// templates from swallowing rich diatonic material. Candidate iteration
// order (template library order, roots C through B) doubles as the
// deterministic tie-break, so equal-scoring modes of one pitch-class set
// always resolve the same way.

use serde::{Deserialize, Serialize};

use crate::config::ScaleConfig;
use crate::features::PITCH_CLASS_NAMES;

/// One scale template: interval set from the root plus a display region
#[derive(Debug, Clone, Copy)]
pub struct ScaleTemplate {
    pub name: &'static str,
    pub region: &'static str,
    pub intervals: &'static [usize],
}

impl ScaleTemplate {
    fn is_pentatonic(&self) -> bool {
        self.intervals.len() == 5
    }

    fn is_diatonic(&self) -> bool {
        self.intervals.len() == 7
    }
}

/// Template library; ordering matters for tie-breaks (Major is checked first)
pub static SCALE_TEMPLATES: [ScaleTemplate; 13] = [
    ScaleTemplate {
        name: "Major",
        region: "Western",
        intervals: &[0, 2, 4, 5, 7, 9, 11],
    },
    ScaleTemplate {
        name: "Natural Minor",
        region: "Western",
        intervals: &[0, 2, 3, 5, 7, 8, 10],
    },
    ScaleTemplate {
        name: "Harmonic Minor",
        region: "Western",
        intervals: &[0, 2, 3, 5, 7, 8, 11],
    },
    ScaleTemplate {
        name: "Dorian",
        region: "Western Modal",
        intervals: &[0, 2, 3, 5, 7, 9, 10],
    },
    ScaleTemplate {
        name: "Phrygian",
        region: "Western Modal",
        intervals: &[0, 1, 3, 5, 7, 8, 10],
    },
    ScaleTemplate {
        name: "Lydian",
        region: "Western Modal",
        intervals: &[0, 2, 4, 6, 7, 9, 11],
    },
    ScaleTemplate {
        name: "Mixolydian",
        region: "Western Modal",
        intervals: &[0, 2, 4, 5, 7, 9, 10],
    },
    ScaleTemplate {
        name: "Major Pentatonic",
        region: "East Asian",
        intervals: &[0, 2, 4, 7, 9],
    },
    ScaleTemplate {
        name: "Minor Pentatonic",
        region: "West African",
        intervals: &[0, 3, 5, 7, 10],
    },
    ScaleTemplate {
        name: "Blues",
        region: "African-American",
        intervals: &[0, 3, 5, 6, 7, 10],
    },
    ScaleTemplate {
        name: "Hirajoshi",
        region: "Japanese",
        intervals: &[0, 2, 3, 7, 8],
    },
    ScaleTemplate {
        name: "Double Harmonic",
        region: "Middle Eastern",
        intervals: &[0, 1, 4, 5, 7, 8, 11],
    },
    ScaleTemplate {
        name: "Whole Tone",
        region: "Impressionist",
        intervals: &[0, 2, 4, 6, 8, 10],
    },
];

/// Best-fit scale for one pitch contour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleAnalysis {
    /// Label of the form "<Root> <Name> (<Region>)", or "Chromatic"/"Unknown"
    pub scale: String,
    /// Raw candidate score of the winner
    pub score: f32,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl ScaleAnalysis {
    /// Result for a contour with no usable pitches
    pub fn unknown() -> Self {
        Self {
            scale: "Unknown".to_string(),
            score: 0.0,
            confidence: 0.0,
        }
    }
}

/// Pitch class of a frequency: round(12*log2(f/440) + 69) mod 12
pub fn pitch_class(frequency: f32) -> usize {
    let midi = 12.0 * (frequency / 440.0).log2() + 69.0;
    (midi.round() as i32).rem_euclid(12) as usize
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    template: usize,
    root: usize,
    score: f32,
    in_energy: f32,
    out_energy: f32,
    coverage: f32,
    explained: f32,
    adjacency: f32,
}

/// Template-matching scale identifier
pub struct ScaleIdentifier {
    config: ScaleConfig,
}

impl ScaleIdentifier {
    /// Create an identifier with default parameters
    pub fn new() -> Self {
        Self::with_config(ScaleConfig::default())
    }

    /// Create an identifier with explicit configuration parameters
    pub fn with_config(config: ScaleConfig) -> Self {
        Self { config }
    }

    /// Identify the best-fit scale for a pitch contour
    ///
    /// # Arguments
    /// * `pitches` - Detected fundamentals in Hz; non-positive entries are skipped
    pub fn identify(&self, pitches: &[f32]) -> ScaleAnalysis {
        let mut histogram = [0.0f32; 12];
        let mut counted = 0usize;
        for &pitch in pitches {
            if pitch > 0.0 && pitch.is_finite() {
                histogram[pitch_class(pitch)] += 1.0;
                counted += 1;
            }
        }
        if counted == 0 {
            return ScaleAnalysis::unknown();
        }
        for bin in histogram.iter_mut() {
            *bin /= counted as f32;
        }

        let present: Vec<bool> = histogram
            .iter()
            .map(|&f| f > self.config.presence_threshold)
            .collect();
        let unique = present.iter().filter(|&&p| p).count();

        // Ten or more active classes is chromatic material; template
        // matching would only pick an arbitrary superset.
        if unique >= 10 {
            let confidence = (0.6 + 0.2 * (unique as f32 - 10.0)).clamp(0.0, 1.0);
            return ScaleAnalysis {
                scale: "Chromatic".to_string(),
                score: 1.0,
                confidence,
            };
        }

        let (winner, margin, penta_overridden) = self.pick_candidate(&histogram, &present, unique);
        let template = &SCALE_TEMPLATES[winner.template];

        let mut confidence = (0.5 * winner.in_energy
            + 0.2 * winner.coverage
            + 0.15 * winner.explained
            + 0.1 * (margin / 0.3).clamp(0.0, 1.0)
            + winner.adjacency)
            * (1.0 - 0.9 * winner.out_energy).clamp(0.0, 1.0);

        // A pentatonic that survived despite rich pitch-class evidence is
        // suspect even after the priors; damp it rather than trust it.
        if template.is_pentatonic() && unique >= 6 {
            confidence *= 0.7;
        }
        if penta_overridden {
            log::debug!(
                "[Scale] Pentatonic winner replaced by diatonic candidate ({} classes present)",
                unique
            );
        }

        ScaleAnalysis {
            scale: format!(
                "{} {} ({})",
                PITCH_CLASS_NAMES[winner.root], template.name, template.region
            ),
            score: winner.score,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Score all template/root pairs, apply size priors and overrides
    fn pick_candidate(
        &self,
        histogram: &[f32; 12],
        present: &[bool],
        unique: usize,
    ) -> (Candidate, f32, bool) {
        let mut best: Option<Candidate> = None;
        let mut second_score = f32::NEG_INFINITY;
        let mut best_diatonic: Option<Candidate> = None;

        for (template_idx, template) in SCALE_TEMPLATES.iter().enumerate() {
            for root in 0..12 {
                let candidate =
                    self.score_candidate(template_idx, template, root, histogram, present, unique);

                match best {
                    Some(current) if candidate.score <= current.score => {
                        if candidate.score > second_score {
                            second_score = candidate.score;
                        }
                    }
                    _ => {
                        if let Some(current) = best {
                            second_score = current.score;
                        }
                        best = Some(candidate);
                    }
                }

                if template.is_diatonic() {
                    let better = best_diatonic
                        .map(|d| candidate.score > d.score)
                        .unwrap_or(true);
                    if better {
                        best_diatonic = Some(candidate);
                    }
                }
            }
        }

        // The library is non-empty, so a best candidate always exists
        let best = best.expect("scale template library is empty");
        let margin = if second_score.is_finite() {
            (best.score - second_score).max(0.0)
        } else {
            0.0
        };

        let best_template = &SCALE_TEMPLATES[best.template];
        if best_template.is_pentatonic() {
            if let Some(diatonic) = best_diatonic {
                // Rich material must not report pentatonic at all; with
                // exactly five classes a narrow win still defers to the
                // diatonic reading.
                if unique >= 6 {
                    return (diatonic, (diatonic.score - best.score).max(0.0), true);
                }
                if unique == 5 && best.score - diatonic.score <= self.config.pentatonic_margin {
                    return (diatonic, (diatonic.score - best.score).max(0.0), true);
                }
            }
        }

        (best, margin, false)
    }

    fn score_candidate(
        &self,
        template_idx: usize,
        template: &ScaleTemplate,
        root: usize,
        histogram: &[f32; 12],
        present: &[bool],
        unique: usize,
    ) -> Candidate {
        let mut in_template = [false; 12];
        for &interval in template.intervals {
            in_template[(root + interval) % 12] = true;
        }

        let mut in_energy = 0.0f32;
        let mut out_energy = 0.0f32;
        let mut tones_observed = 0usize;
        let mut explained_classes = 0usize;
        for class in 0..12 {
            if in_template[class] {
                in_energy += histogram[class];
                if present[class] {
                    tones_observed += 1;
                    explained_classes += 1;
                }
            } else {
                out_energy += histogram[class];
            }
        }

        let coverage = tones_observed as f32 / template.intervals.len() as f32;
        let explained = if unique > 0 {
            explained_classes as f32 / unique as f32
        } else {
            0.0
        };

        // Chromatically consecutive observed template tones hint at scales
        // that genuinely use semitone motion (blues, phrygian, chromatic runs)
        let mut adjacent_pairs = 0usize;
        for class in 0..12 {
            let next = (class + 1) % 12;
            if in_template[class] && in_template[next] && present[class] && present[next] {
                adjacent_pairs += 1;
            }
        }
        let adjacency = (self.config.adjacency_bonus * adjacent_pairs as f32)
            .min(self.config.adjacency_cap);

        // Rich material penalizes 5-note templates and favors 7-note ones
        let size_prior = if unique >= 6 {
            match template.intervals.len() {
                5 => 0.6,
                7 => 1.15,
                _ => 1.0,
            }
        } else {
            1.0
        };

        let score = (in_energy - self.config.out_energy_penalty * out_energy
            + self.config.coverage_weight * coverage
            + self.config.explained_weight * explained
            + adjacency)
            * size_prior;

        Candidate {
            template: template_idx,
            root,
            score,
            in_energy,
            out_energy,
            coverage,
            explained,
            adjacency,
        }
    }
}

impl Default for ScaleIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Equal-tempered frequency of a pitch class in octave 4
    fn class_frequency(class: usize) -> f32 {
        let midi = 60 + class as i32;
        440.0 * 2.0f32.powf((midi - 69) as f32 / 12.0)
    }

    /// One pitch per listed class, repeated `repeats` times
    fn pitches_for(classes: &[usize], repeats: usize) -> Vec<f32> {
        let mut pitches = Vec::new();
        for _ in 0..repeats {
            for &class in classes {
                pitches.push(class_frequency(class));
            }
        }
        pitches
    }

    #[test]
    fn test_pitch_class_mapping() {
        assert_eq!(pitch_class(440.0), 9); // A
        assert_eq!(pitch_class(261.63), 0); // C
        assert_eq!(pitch_class(880.0), 9); // A, octave up
        assert_eq!(pitch_class(277.18), 1); // C#
    }

    #[test]
    fn test_c_major_round_trip() {
        let identifier = ScaleIdentifier::new();
        let pitches = pitches_for(&[0, 2, 4, 5, 7, 9, 11], 4);

        let analysis = identifier.identify(&pitches);
        assert_eq!(analysis.scale, "C Major (Western)");
        assert!(
            analysis.confidence > 0.7,
            "confidence {} too low",
            analysis.confidence
        );
    }

    #[test]
    fn test_single_foreign_semitone_does_not_flip() {
        let identifier = ScaleIdentifier::new();
        // Four passes of C major plus a single stray C#
        let mut pitches = pitches_for(&[0, 2, 4, 5, 7, 9, 11], 4);
        pitches.push(class_frequency(1));

        let analysis = identifier.identify(&pitches);
        assert_eq!(analysis.scale, "C Major (Western)");
        assert!(analysis.confidence > 0.7);
    }

    #[test]
    fn test_rich_material_never_reports_pentatonic() {
        let identifier = ScaleIdentifier::new();
        // Six classes that include the full C major pentatonic
        let pitches = pitches_for(&[0, 2, 4, 7, 9, 11], 6);

        let analysis = identifier.identify(&pitches);
        assert!(
            !analysis.scale.contains("Pentatonic"),
            "rich material reported {}",
            analysis.scale
        );
        // The override lands on a 7-note template
        let template = SCALE_TEMPLATES
            .iter()
            .find(|t| analysis.scale.contains(t.name))
            .expect("label should name a template");
        assert_eq!(template.intervals.len(), 7);
    }

    #[test]
    fn test_five_class_narrow_margin_prefers_diatonic() {
        let identifier = ScaleIdentifier::new();
        // Exact C major pentatonic: subset of C major, margin is narrow
        let pitches = pitches_for(&[0, 2, 4, 7, 9], 5);

        let analysis = identifier.identify(&pitches);
        assert!(
            !analysis.scale.contains("Pentatonic"),
            "narrow-margin pentatonic survived as {}",
            analysis.scale
        );
    }

    #[test]
    fn test_chromatic_short_circuit() {
        let identifier = ScaleIdentifier::new();
        let pitches = pitches_for(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11], 2);

        let analysis = identifier.identify(&pitches);
        assert_eq!(analysis.scale, "Chromatic");
        assert!((analysis.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ten_classes_chromatic_confidence_scaled() {
        let identifier = ScaleIdentifier::new();
        let pitches = pitches_for(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9], 2);

        let analysis = identifier.identify(&pitches);
        assert_eq!(analysis.scale, "Chromatic");
        assert!((analysis.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_empty_contour_is_unknown() {
        let identifier = ScaleIdentifier::new();
        assert_eq!(identifier.identify(&[]), ScaleAnalysis::unknown());
        assert_eq!(
            identifier.identify(&[-1.0, 0.0, f32::NAN]),
            ScaleAnalysis::unknown()
        );
    }

    #[test]
    fn test_minor_material_lands_on_minor_family() {
        let identifier = ScaleIdentifier::new();
        // A natural minor, tonic emphasized
        let mut pitches = pitches_for(&[9, 11, 0, 2, 4, 5, 7], 3);
        pitches.extend(pitches_for(&[9], 3));

        let analysis = identifier.identify(&pitches);
        // A minor shares its pitch-class set with C major; either reading
        // is acceptable, but the label must be a 7-note western template.
        let template = SCALE_TEMPLATES
            .iter()
            .find(|t| analysis.scale.contains(t.name))
            .expect("label should name a template");
        assert_eq!(template.intervals.len(), 7);
        assert!(analysis.confidence > 0.5);
    }

    #[test]
    fn test_identification_is_deterministic() {
        let identifier = ScaleIdentifier::new();
        let pitches = pitches_for(&[0, 2, 4, 5, 7, 9, 11], 3);

        let a = identifier.identify(&pitches);
        let b = identifier.identify(&pitches);
        assert_eq!(a, b);
    }
}
