mod normalize;

pub use normalize::{
    extract_json_object_from_text, normalize_critique, normalize_gallery_critique,
    normalize_theme_suggestions, RawReply,
};

use serde::{Deserialize, Serialize};

/// Fixed field set every backend reply is normalized into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CritiqueFields {
    pub critique: String,
    pub is_ai_used: bool,
    pub ai_usage_feedback: String,
    pub art_type: String,
    pub theme_relevance: String,
    pub intention_respect_feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Critique {
    pub image_id: String,
    pub artistic_intention: String,
    pub critique: String,
    pub is_ai_used: bool,
    pub ai_usage_feedback: String,
    pub art_type: String,
    pub theme_relevance: String,
    pub intention_respect_feedback: String,
}

impl Critique {
    pub fn from_fields(
        image_id: impl Into<String>,
        artistic_intention: impl Into<String>,
        fields: CritiqueFields,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            artistic_intention: artistic_intention.into(),
            critique: fields.critique,
            is_ai_used: fields.is_ai_used,
            ai_usage_feedback: fields.ai_usage_feedback,
            art_type: fields.art_type,
            theme_relevance: fields.theme_relevance,
            intention_respect_feedback: fields.intention_respect_feedback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueStatement {
    pub critic: String,
    pub statement: String,
}

/// Council critique of a whole gallery, one list of viewpoints per section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryCritiqueResult {
    pub overall_assessment: Vec<CritiqueStatement>,
    pub curation_and_coherence: Vec<CritiqueStatement>,
    pub emerging_threads: Vec<CritiqueStatement>,
    pub future_development: Vec<CritiqueStatement>,
}

impl GalleryCritiqueResult {
    pub const SECTION_TITLES: [&'static str; 4] = [
        "Overall Assessment",
        "Curation & Coherence",
        "Emerging Threads",
        "Future Development",
    ];

    pub fn sections(&self) -> [(&'static str, &[CritiqueStatement]); 4] {
        [
            (Self::SECTION_TITLES[0], self.overall_assessment.as_slice()),
            (Self::SECTION_TITLES[1], self.curation_and_coherence.as_slice()),
            (Self::SECTION_TITLES[2], self.emerging_threads.as_slice()),
            (Self::SECTION_TITLES[3], self.future_development.as_slice()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.sections()
            .iter()
            .all(|(_, statements)| statements.is_empty())
    }
}
