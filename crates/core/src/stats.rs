//! Summary statistics over a segmentation result.

use crate::types::ElementSet;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SegmentationStats {
    pub total_text_elements: usize,
    pub total_icons: usize,
    pub total_charts: usize,
    pub total_elements: usize,
    /// Text elements whose text is not empty.
    pub text_elements_with_content: usize,
    /// Mean text length in characters, 0 when there is no text element.
    pub average_text_length: f64,
}

impl From<&ElementSet> for SegmentationStats {
    fn from(set: &ElementSet) -> Self {
        let lengths: Vec<usize> = set
            .text_elements
            .iter()
            .map(|e| e.text.chars().count())
            .collect();

        let average_text_length = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
        };

        Self {
            total_text_elements: set.text_elements.len(),
            total_icons: set.icons.len(),
            total_charts: set.charts.len(),
            total_elements: set.len(),
            text_elements_with_content: lengths.iter().filter(|len| **len > 0).count(),
            average_text_length,
        }
    }
}

impl std::ops::AddAssign for SegmentationStats {
    /// Accumulate another slide's statistics; the average is re-weighted by
    /// text element count.
    fn add_assign(&mut self, other: Self) {
        let texts = self.total_text_elements + other.total_text_elements;
        self.average_text_length = if texts == 0 {
            0.0
        } else {
            (self.average_text_length * self.total_text_elements as f64
                + other.average_text_length * other.total_text_elements as f64)
                / texts as f64
        };
        self.total_text_elements = texts;
        self.total_icons += other.total_icons;
        self.total_charts += other.total_charts;
        self.total_elements += other.total_elements;
        self.text_elements_with_content += other.text_elements_with_content;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, FontWeight, IconElement, TextElement};

    fn text(content: &str) -> TextElement {
        TextElement {
            text: content.to_string(),
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            font_size: 18.0,
            font_weight: FontWeight::Normal,
        }
    }

    #[test]
    fn test_empty_set() {
        let stats = SegmentationStats::from(&ElementSet::new());
        assert_eq!(stats, SegmentationStats::default());
    }

    #[test]
    fn test_counts_and_average() {
        let mut set = ElementSet::new();
        set.text_elements = vec![text("Hello"), text(""), text("Ünï")];
        set.icons.push(IconElement {
            kind: "icon".into(),
            bbox: BoundingBox::new(0.0, 0.0, 20.0, 20.0),
            description: String::new(),
        });

        let stats = SegmentationStats::from(&set);
        assert_eq!(stats.total_text_elements, 3);
        assert_eq!(stats.total_icons, 1);
        assert_eq!(stats.total_elements, 4);
        assert_eq!(stats.text_elements_with_content, 2);
        assert!((stats.average_text_length - 8.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_accumulate() {
        let mut a = ElementSet::new();
        a.text_elements = vec![text("abcd")];
        let mut b = ElementSet::new();
        b.text_elements = vec![text("ab"), text("ab"), text("ab")];

        let mut total = SegmentationStats::from(&a);
        total += SegmentationStats::from(&b);
        assert_eq!(total.total_text_elements, 4);
        assert!((total.average_text_length - 2.5).abs() < 1e-9);
    }
}
