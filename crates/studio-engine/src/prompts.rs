//! Fixed instructions sent at each step.

pub const SKETCH_PREAMBLE: &str = "Create a pure black-and-white architectural sketch. \
Use only black pencil lines on white background. No colors, no gray shades. \
Emphasize contour lines, perspective depth, and object boundaries.";

pub const RENDER_INSTRUCTION: &str = "Transform this into a high-end 3D render. \
Style: photorealistic architectural visualization (archviz). \
Ultra-high resolution textures, ray-traced lighting, soft shadows, volumetric light, \
realistic reflections, micro-surface details, natural color grading, and lens effects.";

pub const SKETCHIFY_INSTRUCTION: &str =
    "Create a loose sketch version of this picture with black and white pencil lines.";

pub fn enhance_prompt(description: &str) -> String {
    format!(
        "
Expand this description into a detailed architectural and interior-design prompt.

Include:
- spatial layout
- object placements
- textures and materials
- lighting style
- color palette
- rough dimensions
- artistic direction suitable for image generation

Base description: \"{description}\"
"
    )
}

pub fn sketch_prompt(enhanced_prompt: &str) -> String {
    format!("{SKETCH_PREAMBLE}\n\n{enhanced_prompt}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhance_prompt_quotes_description() {
        let prompt = enhance_prompt("modern living room");
        assert!(prompt.contains("Base description: \"modern living room\""));
        assert!(prompt.contains("- rough dimensions"));
    }

    #[test]
    fn sketch_prompt_appends_enhanced_text_after_blank_line() {
        let prompt = sketch_prompt("A modern living room with...");
        assert!(prompt.starts_with("Create a pure black-and-white architectural sketch. Use only"));
        assert!(prompt.ends_with("object boundaries.\n\nA modern living room with..."));
    }

    #[test]
    fn render_instruction_is_single_paragraph() {
        assert!(!RENDER_INSTRUCTION.contains('\n'));
        assert!(RENDER_INSTRUCTION.contains("(archviz). Ultra-high"));
    }
}
