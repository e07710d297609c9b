use curator_contracts::agents::Critic;
use curator_contracts::models::BackendKind;
use serde_json::{json, Value};

/// Shape the backend is asked to reply in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    Critique,
    GalleryCritique,
    ThemeSuggestions,
}

impl OutputSchema {
    /// Response schema in the subset accepted by `generationConfig.responseSchema`.
    pub fn json_schema(self) -> Value {
        match self {
            OutputSchema::Critique => json!({
                "type": "OBJECT",
                "properties": {
                    "critique": {"type": "STRING"},
                    "isAiUsed": {"type": "BOOLEAN"},
                    "aiUsageFeedback": {"type": "STRING"},
                    "artType": {"type": "STRING"},
                    "themeRelevance": {"type": "STRING"},
                    "intentionRespectFeedback": {"type": "STRING"}
                },
                "required": [
                    "critique", "isAiUsed", "aiUsageFeedback",
                    "artType", "themeRelevance", "intentionRespectFeedback"
                ]
            }),
            OutputSchema::GalleryCritique => {
                let section = json!({
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "critic": {"type": "STRING"},
                            "statement": {"type": "STRING"}
                        },
                        "required": ["critic", "statement"]
                    }
                });
                json!({
                    "type": "OBJECT",
                    "properties": {
                        "overallAssessment": section,
                        "curationAndCoherence": section,
                        "emergingThreads": section,
                        "futureDevelopment": section
                    },
                    "required": [
                        "overallAssessment", "curationAndCoherence",
                        "emergingThreads", "futureDevelopment"
                    ]
                })
            }
            OutputSchema::ThemeSuggestions => json!({
                "type": "OBJECT",
                "properties": {
                    "themes": {"type": "ARRAY", "items": {"type": "STRING"}}
                },
                "required": ["themes"]
            }),
        }
    }
}

const CRITIQUE_JSON_EXAMPLE: &str = r#"{"critique": "...", "isAiUsed": false, "aiUsageFeedback": "...", "artType": "...", "themeRelevance": "...", "intentionRespectFeedback": "..."}"#;

/// Instruction for a single-image critique voiced by `critic`.
pub fn critique_prompt(
    critic: Critic,
    theme: &str,
    artistic_intention: &str,
    backend: BackendKind,
) -> String {
    let mut prompt = format!(
        "You are \"{name}\", an art critic reviewing one image from a themed gallery.\n\
Adopt this voice throughout: {voice}\n\n\
The gallery theme is: \"{theme}\".\n\
The artist's stated intention is: \"{intention}\".\n\
The image to critique is attached.\n\n\
Provide a detailed critique of the image that considers the artistic intention, \
how well it aligns with the theme, and any use of AI in its creation or editing.\n\n\
Reply with a JSON object containing exactly these fields:\n\
- critique (string): your detailed critique, in your voice\n\
- isAiUsed (boolean): whether AI was used to create or edit the image\n\
- aiUsageFeedback (string): feedback on how AI was used, if at all\n\
- artType (string): the type of art, e.g. photography, painting, plastic art\n\
- themeRelevance (string): how relevant the image is to the theme\n\
- intentionRespectFeedback (string): whether the work, and any AI usage, respects the stated intention\n",
        name = critic.name(),
        voice = critic.description(),
        theme = theme.trim(),
        intention = artistic_intention.trim(),
    );
    if backend == BackendKind::Local {
        prompt.push_str(&format!(
            "\nRespond with the JSON object only, no markdown and no commentary. Example shape:\n{CRITIQUE_JSON_EXAMPLE}\n"
        ));
    }
    prompt
}

/// Instruction for a council critique of a whole gallery.
pub fn gallery_critique_prompt(
    council: &[Critic],
    theme: &str,
    image_ids: &[&str],
    backend: BackendKind,
) -> String {
    let members = council
        .iter()
        .map(|critic| format!("- \"{}\": {}", critic.name(), critic.description()))
        .collect::<Vec<String>>()
        .join("\n");
    let names = council
        .iter()
        .map(|critic| format!("\"{}\"", critic.name()))
        .collect::<Vec<String>>()
        .join(", ");
    let images = image_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| format!("- attachment {} is image {id}", idx + 1))
        .collect::<Vec<String>>()
        .join("\n");

    let mut prompt = format!(
        "You are a council of art critics reviewing a gallery of images. The council members are:\n\
{members}\n\n\
The theme of this gallery is: \"{theme}\".\n\
The images are attached in this order:\n{images}\n\n\
Critique the gallery as a whole. Every point below must contain statements from each of {names}:\n\
1. overallAssessment: the general impression of the gallery, its strengths and weaknesses.\n\
2. curationAndCoherence: how well the images work together and explore the theme.\n\
3. emergingThreads: visual or conceptual threads running through several images.\n\
4. futureDevelopment: advice for the artist's future work based on this gallery.\n\n\
Reply with a JSON object with exactly those four keys. Each value is an array of \
objects with \"critic\" (the council member's name) and \"statement\" (their feedback). \
Be thoughtful and constructive.\n",
        theme = theme.trim(),
    );
    if backend == BackendKind::Local {
        prompt.push_str(
            "\nRespond with the JSON object only, no markdown and no commentary.\n",
        );
    }
    prompt
}

pub fn theme_suggestions_prompt(posting_history: &str, count: usize) -> String {
    format!(
        "You are a gallery curator who suggests themes for art galleries.\n\n\
Given the following Instagram posting history, suggest {count} gallery themes that would be \
relevant and engaging for the user.\n\n\
Posting history: {history}\n\n\
Reply with a JSON object containing an array of themes, for example: \
{{\"themes\": [\"Theme 1\", \"Theme 2\", \"Theme 3\"]}}\n",
        history = posting_history.trim(),
    )
}

#[cfg(test)]
mod tests {
    use curator_contracts::agents::Critic;
    use curator_contracts::models::BackendKind;

    use super::{critique_prompt, gallery_critique_prompt, OutputSchema};

    #[test]
    fn critique_prompt_embeds_persona_theme_and_intention() {
        let prompt = critique_prompt(
            Critic::PretentiousArtCritic,
            "Urban Noir",
            "isolation after rain",
            BackendKind::Hosted,
        );
        assert!(prompt.contains("\"Pretentious Art Critic\""));
        assert!(prompt.contains(Critic::PretentiousArtCritic.description()));
        assert!(prompt.contains("\"Urban Noir\""));
        assert!(prompt.contains("\"isolation after rain\""));
        for field in [
            "critique",
            "isAiUsed",
            "aiUsageFeedback",
            "artType",
            "themeRelevance",
            "intentionRespectFeedback",
        ] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(!prompt.contains("no markdown"));
    }

    #[test]
    fn local_prompt_asks_for_bare_json() {
        let prompt = critique_prompt(Critic::DefaultAi, "t", "i", BackendKind::Local);
        assert!(prompt.contains("no markdown"));
    }

    #[test]
    fn gallery_prompt_names_every_council_member() {
        let prompt = gallery_critique_prompt(
            &[Critic::PretentiousArtCritic, Critic::SupportivePhotographer],
            "Coastlines",
            &["a", "b"],
            BackendKind::Hosted,
        );
        assert!(prompt.contains("\"Pretentious Art Critic\", \"Supportive Photographer\""));
        assert!(prompt.contains("attachment 2 is image b"));
    }

    #[test]
    fn schemas_require_all_fields() {
        let schema = OutputSchema::Critique.json_schema();
        assert_eq!(schema["required"].as_array().map(Vec::len), Some(6));
        let gallery = OutputSchema::GalleryCritique.json_schema();
        assert_eq!(
            gallery["properties"]["emergingThreads"]["type"],
            serde_json::json!("ARRAY")
        );
    }
}
