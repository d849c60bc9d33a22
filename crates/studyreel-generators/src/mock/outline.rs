use async_trait::async_trait;

use studyreel_models::{Outline, OutlineSection};

use crate::error::GeneratorResult;
use crate::traits::OutlineGenerator;

const MAX_SECTIONS: usize = 6;
const TITLE_WORDS: usize = 5;
const MAX_KEY_POINTS: usize = 3;

/// One section per paragraph of the input.
#[derive(Debug, Clone, Default)]
pub struct MockOutlineGenerator;

impl MockOutlineGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutlineGenerator for MockOutlineGenerator {
    async fn generate(&self, content: &str) -> GeneratorResult<Outline> {
        Ok(outline_from_text(content))
    }
}

pub(crate) fn outline_from_text(content: &str) -> Outline {
    let sections: Vec<OutlineSection> = paragraphs(content)
        .iter()
        .take(MAX_SECTIONS)
        .enumerate()
        .map(|(i, para)| section_from_paragraph(i, para))
        .collect();

    if sections.is_empty() {
        return Outline {
            sections: vec![
                OutlineSection::new("Introduction", ["Overview of the topic"]),
                OutlineSection::new("Key Concepts", ["Main ideas and themes"]),
                OutlineSection::new("Summary", ["Review of main points"]),
            ],
        };
    }
    Outline { sections }
}

/// Blank-line separated blocks, whitespace collapsed.
fn paragraphs(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line.trim());
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}

fn section_from_paragraph(index: usize, para: &str) -> OutlineSection {
    let title = para
        .split_whitespace()
        .take(TITLE_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    let title = title.trim_end_matches(['.', ',', ';', ':']).to_string();
    let title = if title.is_empty() {
        format!("Section {}", index + 1)
    } else {
        title
    };

    let mut key_points: Vec<String> = para
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_KEY_POINTS)
        .map(String::from)
        .collect();
    if key_points.is_empty() {
        key_points.push(para.chars().take(100).collect());
    }

    OutlineSection { title, key_points }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_section_per_paragraph() {
        let text = "Cells are the basic unit of life. They divide! Some move?\n\n\
                    Mitochondria produce energy for the cell.\n  \nRibosomes build proteins.";
        let outline = outline_from_text(text);
        assert_eq!(outline.sections.len(), 3);
        assert_eq!(outline.sections[0].title, "Cells are the basic unit");
        assert_eq!(
            outline.sections[0].key_points,
            vec!["Cells are the basic unit of life", "They divide", "Some move"]
        );
        assert_eq!(outline.sections[2].title, "Ribosomes build proteins");
    }

    #[test]
    fn test_caps_sections_and_points() {
        let text = (0..10)
            .map(|i| format!("Para {i}. One. Two. Three. Four."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let outline = outline_from_text(&text);
        assert_eq!(outline.sections.len(), MAX_SECTIONS);
        assert!(outline.sections.iter().all(|s| s.key_points.len() == MAX_KEY_POINTS));
    }

    #[test]
    fn test_title_trailing_punctuation_trimmed() {
        let outline = outline_from_text("Cells divide quickly, often daily, in tissue.");
        assert_eq!(outline.sections[0].title, "Cells divide quickly, often daily");
        let outline = outline_from_text("Photosynthesis.");
        assert_eq!(outline.sections[0].title, "Photosynthesis");
    }

    #[test]
    fn test_blank_content_falls_back() {
        let outline = outline_from_text("   \n\n  ");
        assert_eq!(outline.sections.len(), 3);
        assert_eq!(outline.sections[0].title, "Introduction");
        assert!(outline.validate().is_ok());
    }
}
