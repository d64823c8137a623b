//! Prompt construction for each view.
//!
//! Color and material constraints always come from the approved front view's
//! extracted features. A structural reference only ever steers pose and
//! camera angle.

use crate::features::ExtractedFeatures;
use crate::views::ViewType;

/// Camera instructions for each view.
pub fn angle_description(view: ViewType) -> &'static str {
    match view {
        ViewType::Front => "straight-on front view, camera at product mid-height",
        ViewType::Back => {
            "rear view rotated 180 degrees from the front view, same camera height and distance"
        }
        ViewType::Side => "left side profile rotated 90 degrees from the front view",
        ViewType::Top => "top-down view looking straight down at the product",
        ViewType::Bottom => "bottom view looking straight up at the underside of the product",
    }
}

const STUDIO_SUFFIX: &str =
    "Isolated on a clean white studio background, soft even lighting, no props, no text.";

/// Prompt for an initial front view.
pub fn build_front_view_prompt(user_prompt: &str) -> String {
    format!(
        "Professional product photograph, {}. {}\n\nProduct: {}",
        angle_description(ViewType::Front),
        STUDIO_SUFFIX,
        user_prompt.trim()
    )
}

/// Prompt for a regenerated front view: the prior prompt with the user's
/// feedback appended.
pub fn build_edit_prompt(previous_prompt: &str, feedback: &str) -> String {
    format!(
        "{}\n\nRequested changes: {}. Keep everything else identical to the reference image.",
        previous_prompt.trim(),
        feedback.trim()
    )
}

/// Prompt for one of the remaining views.
pub fn build_view_prompt(
    view: ViewType,
    product_prompt: &str,
    features: &ExtractedFeatures,
    has_structural_reference: bool,
) -> String {
    let mut prompt = format!(
        "Professional product photograph, {}. {}\n\nProduct: {}\n\n\
         The first reference image is the approved front view: match its exact colors, \
         materials, proportions and details.",
        angle_description(view),
        STUDIO_SUFFIX,
        product_prompt.trim()
    );

    if view != ViewType::Back {
        prompt.push_str(
            " The second reference image is the approved back view: stay consistent with it.",
        );
    }

    let constraints = feature_constraints(features);
    if !constraints.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&constraints);
    }

    if has_structural_reference {
        prompt.push_str(
            "\n\nA prior revision of this view is provided for pose and camera angle only. \
             Do not copy its colors or materials.",
        );
    }

    prompt
}

/// Render feature constraints as prompt text. Empty when nothing is known.
pub fn feature_constraints(features: &ExtractedFeatures) -> String {
    if features.is_empty() {
        return String::new();
    }

    let mut lines = Vec::new();
    if !features.colors.is_empty() {
        lines.push(format!("Colors: {}.", features.colors.join(", ")));
    }
    if !features.materials.is_empty() {
        lines.push(format!("Materials: {}.", features.materials.join(", ")));
    }
    if !features.key_elements.is_empty() {
        lines.push(format!("Key elements: {}.", features.key_elements.join(", ")));
    }
    let dims = &features.estimated_dimensions;
    if let (Some(w), Some(h)) = (dims.width_cm, dims.height_cm) {
        match dims.depth_cm {
            Some(d) => lines.push(format!("Approximate size: {w} x {h} x {d} cm.")),
            None => lines.push(format!("Approximate size: {w} x {h} cm.")),
        }
    }
    format!("Product features:\n{}", lines.join("\n"))
}
