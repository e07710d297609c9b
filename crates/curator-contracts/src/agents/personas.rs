use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CritiqueError;

/// The closed set of critic personas a critique can be voiced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Critic {
    #[serde(rename = "Default AI")]
    DefaultAi,
    #[serde(rename = "Pretentious Art Critic")]
    PretentiousArtCritic,
    #[serde(rename = "Supportive Photographer")]
    SupportivePhotographer,
    #[serde(rename = "Ansel Adams")]
    AnselAdams,
    #[serde(rename = "Henri Cartier-Bresson")]
    HenriCartierBresson,
}

impl Critic {
    pub const ALL: [Critic; 5] = [
        Critic::DefaultAi,
        Critic::PretentiousArtCritic,
        Critic::SupportivePhotographer,
        Critic::AnselAdams,
        Critic::HenriCartierBresson,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Critic::DefaultAi => "Default AI",
            Critic::PretentiousArtCritic => "Pretentious Art Critic",
            Critic::SupportivePhotographer => "Supportive Photographer",
            Critic::AnselAdams => "Ansel Adams",
            Critic::HenriCartierBresson => "Henri Cartier-Bresson",
        }
    }

    /// Voice description interpolated into prompts.
    pub fn description(self) -> &'static str {
        match self {
            Critic::DefaultAi => "A balanced, objective, and helpful AI critic.",
            Critic::PretentiousArtCritic => {
                "Overly academic, slightly dismissive, and uses complex, esoteric language. \
Focuses on conceptual depth and historical art references."
            }
            Critic::SupportivePhotographer => {
                "Encouraging, practical, and constructive. Focuses on composition, lighting, \
and technical aspects, offering actionable advice."
            }
            Critic::AnselAdams => {
                "Master of landscape photography. Focuses on tonal range, composition, and the \
emotional impact of the natural world."
            }
            Critic::HenriCartierBresson => {
                "Pioneer of street photography and the \"decisive moment\". Looks for geometry, \
timing, and the human element in candid shots."
            }
        }
    }

    pub fn avatar(self) -> &'static str {
        match self {
            Critic::DefaultAi => "https://picsum.photos/seed/ai/100/100",
            Critic::PretentiousArtCritic => "https://picsum.photos/seed/critic1/100/100",
            Critic::SupportivePhotographer => "https://picsum.photos/seed/critic2/100/100",
            Critic::AnselAdams => "https://picsum.photos/seed/ansel/100/100",
            Critic::HenriCartierBresson => "https://picsum.photos/seed/henri/100/100",
        }
    }

    pub fn is_pro(self) -> bool {
        matches!(self, Critic::AnselAdams | Critic::HenriCartierBresson)
    }
}

impl fmt::Display for Critic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Critic {
    type Err = CritiqueError;

    /// Accepts the display name in any case, with `-`/`_` treated as spaces.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = fold_name(raw);
        Critic::ALL
            .into_iter()
            .find(|critic| fold_name(critic.name()) == wanted)
            .ok_or_else(|| {
                CritiqueError::validation("critic", format!("Unknown critic '{}'.", raw.trim()))
            })
    }
}

fn fold_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| if ch == '-' || ch == '_' { ' ' } else { ch })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_ascii_lowercase()
}
