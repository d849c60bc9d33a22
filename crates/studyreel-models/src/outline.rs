//! Outline derived from raw study content.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One titled section of an outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutlineSection {
    pub title: String,
    /// Ordered key points; downstream stages expect at least one.
    pub key_points: Vec<String>,
}

impl OutlineSection {
    pub fn new<I, S>(title: impl Into<String>, key_points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            key_points: key_points.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered outline sections. Section `i` corresponds to script scene `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Outline {
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// Key points of the section at `index`, matched positionally.
    pub fn key_points(&self, index: usize) -> Option<&[String]> {
        self.sections.get(index).map(|s| s.key_points.as_slice())
    }

    /// Validate the outline.
    pub fn validate(&self) -> Result<(), String> {
        if self.sections.is_empty() {
            return Err("outline has no sections".to_string());
        }
        for (i, section) in self.sections.iter().enumerate() {
            if section.title.trim().is_empty() {
                return Err(format!("section {} has an empty title", i));
            }
            if section.key_points.is_empty() {
                return Err(format!("section {} has no key points", i));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_points_by_position() {
        let outline = Outline {
            sections: vec![
                OutlineSection::new("Intro", ["a", "b"]),
                OutlineSection::new("Body", ["c"]),
            ],
        };
        assert_eq!(outline.key_points(1), Some(&["c".to_string()][..]));
        assert_eq!(outline.key_points(2), None);
    }

    #[test]
    fn test_validate() {
        assert!(Outline::default().validate().is_err());

        let empty_points = Outline {
            sections: vec![OutlineSection::new("Intro", Vec::<String>::new())],
        };
        assert!(empty_points.validate().is_err());

        let ok = Outline {
            sections: vec![OutlineSection::new("Intro", ["overview"])],
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_generator_json() {
        let json = r#"{"sections":[{"title":"Cells","key_points":["membrane","nucleus"]}]}"#;
        let outline: Outline = serde_json::from_str(json).unwrap();
        assert_eq!(outline.sections[0].key_points.len(), 2);
    }
}
