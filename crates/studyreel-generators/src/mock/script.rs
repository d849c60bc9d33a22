use async_trait::async_trait;

use studyreel_models::{Outline, Script, ScriptScene};

use crate::error::GeneratorResult;
use crate::traits::ScriptGenerator;

/// One templated scene per outline section.
#[derive(Debug, Clone, Default)]
pub struct MockScriptGenerator;

impl MockScriptGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptGenerator for MockScriptGenerator {
    async fn generate(&self, outline: &Outline) -> GeneratorResult<Script> {
        let scenes = outline
            .sections
            .iter()
            .map(|section| {
                let narration = format!(
                    "In this section, we'll cover {}. {}. These are important concepts to understand as we continue our study.",
                    section.title,
                    section.key_points.join(". ")
                );
                let highlights: Vec<&str> = section
                    .key_points
                    .iter()
                    .take(2)
                    .map(String::as_str)
                    .collect();
                let visual = format!(
                    "Educational slide showing '{}' as the heading with key points listed below: {}.",
                    section.title,
                    highlights.join(", ")
                );
                ScriptScene::new(&section.title, narration, visual)
            })
            .collect();

        Ok(Script { scenes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyreel_models::OutlineSection;

    #[tokio::test]
    async fn test_scene_per_section() {
        let outline = Outline {
            sections: vec![
                OutlineSection::new("Cells", ["Smallest unit", "Divide", "Grow"]),
                OutlineSection::new("Energy", ["Mitochondria"]),
            ],
        };
        let script = MockScriptGenerator::new().generate(&outline).await.unwrap();

        assert_eq!(script.len(), 2);
        assert_eq!(script.scenes[0].title, "Cells");
        assert!(script.scenes[0]
            .narration
            .starts_with("In this section, we'll cover Cells. Smallest unit. Divide. Grow."));
        assert!(script.scenes[0]
            .visual_description
            .ends_with("listed below: Smallest unit, Divide."));
        assert!(script.scenes[1].visual_description.contains("'Energy'"));
    }
}
