//! Verdicts des étapes de validation de l'intake.
//!
//! Les étapes facultatives (classifieur, légende) renvoient un résultat à
//! trois états: seul un rejet explicite interrompt le pipeline, un verdict
//! `Inconclusive` laisse passer la requête.

use serde::Serialize;

/// Mots-clés qui identifient une légende comme liée à la bijouterie
pub const JEWELRY_KEYWORDS: [&str; 10] = [
    "jewelry",
    "ring",
    "necklace",
    "chain",
    "bracelet",
    "earring",
    "gold",
    "jewellery",
    "pendant",
    "ornament",
];

/// Résultat du classifieur de croquis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SketchVerdict {
    Sketch(f32),
    NotSketch(f32),
    /// Aucune classification réelle (modèle absent, échec, score nul)
    Inconclusive,
}

impl SketchVerdict {
    /// Interprète le score brut du classifieur. Un rejet n'est retenu que
    /// pour un score strictement positif.
    pub fn from_score(score: f32, threshold: f32) -> Self {
        if score.is_nan() || score <= 0.0 {
            SketchVerdict::Inconclusive
        } else if score > threshold {
            SketchVerdict::Sketch(score)
        } else {
            SketchVerdict::NotSketch(score)
        }
    }
}

/// Résultat du validateur de légende
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionVerdict {
    Jewelry(String),
    NotJewelry(String),
    /// Service indisponible ou non configuré, avec la raison
    Inconclusive(String),
}

impl CaptionVerdict {
    pub fn from_caption(caption: String) -> Self {
        if is_jewelry_caption(&caption) {
            CaptionVerdict::Jewelry(caption)
        } else {
            CaptionVerdict::NotJewelry(caption)
        }
    }
}

/// Vrai si au moins un mot de la légende appartient aux mots-clés bijouterie
pub fn is_jewelry_caption(caption: &str) -> bool {
    caption
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .any(|word| JEWELRY_KEYWORDS.contains(&word.as_str()))
}

/// Issue globale de la validation d'une soumission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Accepted,
    RejectedNotSketch { confidence: f32 },
    RejectedNotJewelry { caption: String },
    /// Au moins un validateur n'a pas pu se prononcer; on continue
    Inconclusive,
}

impl ValidationOutcome {
    /// Combine les deux verdicts dans l'ordre de précédence du pipeline
    pub fn combine(sketch: SketchVerdict, caption: Option<&CaptionVerdict>) -> Self {
        if let SketchVerdict::NotSketch(confidence) = sketch {
            return ValidationOutcome::RejectedNotSketch { confidence };
        }
        match (sketch, caption) {
            (_, Some(CaptionVerdict::NotJewelry(caption))) => ValidationOutcome::RejectedNotJewelry {
                caption: caption.clone(),
            },
            (SketchVerdict::Sketch(_), Some(CaptionVerdict::Jewelry(_))) => {
                ValidationOutcome::Accepted
            }
            _ => ValidationOutcome::Inconclusive,
        }
    }

    /// Valeur de l'en-tête `X-Validation-Outcome`
    pub fn as_header(&self) -> &'static str {
        match self {
            ValidationOutcome::Accepted => "accepted",
            ValidationOutcome::RejectedNotSketch { .. } => "rejected-not-sketch",
            ValidationOutcome::RejectedNotJewelry { .. } => "rejected-not-jewelry",
            ValidationOutcome::Inconclusive => "inconclusive",
        }
    }
}
