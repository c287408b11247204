//! Instructions sent to the vision service.

use crate::background::BackgroundLabel;

const RESPONSE_SHAPE: &str = r#"{
    "text_elements": [
        {"text": "the text", "bbox": [x, y, width, height], "font_size": 24, "font_weight": "bold"}
    ],
    "icons": [
        {"type": "icon", "bbox": [x, y, width, height], "description": "what the icon shows"}
    ],
    "charts": [
        {"type": "chart", "bbox": [x, y, width, height], "description": "kind of chart"}
    ],
    "background_info": {"has_gradient": false, "main_color": "white", "has_texture": false}
}"#;

const COORDINATE_RULES: &str = "\
Coordinates:
- bbox is [x, y, width, height] in pixels, origin at the top-left corner of the image.
- Every box must lie inside the image.
- Use an empty list [] for a category with no elements.
- font_size is your estimate of the glyph height in pixels.";

const DEFAULT_TASK: &str = "\
Analyze this presentation slide image and identify every element on it.

1. Text: the exact content, its bounding box, the estimated font size in pixels \
and the weight (bold or normal).
2. Icons and pictures: bounding box and a short description.
3. Charts and diagrams: bounding box and the kind of graphic (bar chart, pie chart, flow chart, ...).
4. Background: whether it has a gradient and its main color.";

const BUSY_BACKGROUND_TASK: &str = "\
Analyze this presentation slide image and identify every editable content element on it.

The slide has a busy background (texture, decorative patterns or gradients). \
Background decoration such as borders, ornaments, patterns and decorative glyphs \
is NOT content and must not be reported. Bounding boxes must be tight around the \
content with as little background as possible.

1. Text that belongs to the slide content (ignore decorative lettering): the exact \
content, a tight bounding box, the estimated font size in pixels and the weight \
(bold or normal).
2. Meaningful icons and pictures only (ignore small decorative elements): a tight \
bounding box and a short description.
3. Charts and diagrams: bounding box and the kind of graphic.
4. Background: whether it has a gradient, its main color and whether it is textured.";

/// Build the prompt for a slide whose background carries `label`.
///
/// Textured and complex backgrounds get the stricter prompt that discourages
/// reporting decoration as content.
pub fn prompt_for(label: BackgroundLabel) -> String {
    let task = if label.is_busy() {
        BUSY_BACKGROUND_TASK
    } else {
        DEFAULT_TASK
    };

    format!(
        "{task}\n\nReturn ONLY a JSON object with exactly this shape and no other text:\n\n\
         {RESPONSE_SHAPE}\n\n{COORDINATE_RULES}"
    )
}
