//! Prompt composition shared by every backend.

const STYLE_PREAMBLE: &str = "Best quality, masterpiece, 8k, photorealistic, cyberpunk style.";
const SUBJECT: &str = "A beautiful young female cyberpunk character with long colorful hair.";
const SCENE: &str = "Background: Neon lit cyberpunk city street, dark atmosphere, volumetric lighting. \
Cybernetic implants, glowing skin lines, futuristic fashion. \
(vertical aspect ratio), detailed face, cinematic shot.";
const EDIT_INSTRUCTION: &str = "Edit the reference image. Keep exactly the same character: \
same face, hair, body, pose, framing and background. Change only the clothing.";

/// Wraps a garment description into the full generator prompt. Edit prompts
/// pin the subject to the reference image instead of describing it anew.
pub fn compose_prompt(outfit_description: &str, edit: bool) -> String {
    let outfit = outfit_description.trim();
    if edit {
        format!("{EDIT_INSTRUCTION}\nNew outfit: {outfit}.\nStyle: {STYLE_PREAMBLE}")
    } else {
        format!("{STYLE_PREAMBLE}\n{SUBJECT}\nWearing: {outfit}.\n{SCENE}")
    }
}

#[cfg(test)]
#[path = "tests/prompt_tests.rs"]
mod tests;
