//! Motion prompts for clip generation and the voiceover script prompt.
//!
//! Prompts vary by position in the reel (opening, middle, closing) while
//! segment durations stay uniform.

use serde::{Deserialize, Serialize};

/// Spoken words per second assumed when budgeting a script.
pub const WORDS_PER_SECOND: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotPosition {
    Opening,
    Middle,
    Closing,
}

impl ShotPosition {
    pub fn for_segment(order: usize, count: usize) -> Self {
        if order == 0 {
            ShotPosition::Opening
        } else if order + 1 >= count {
            ShotPosition::Closing
        } else {
            ShotPosition::Middle
        }
    }
}

/// What the reel is advertising.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductBrief {
    pub product_name: String,
    pub description: Option<String>,
    pub audience: Option<String>,
}

impl ProductBrief {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// Camera and motion prompt for one segment's image.
pub fn motion_prompt(brief: &ProductBrief, order: usize, count: usize) -> String {
    // A single image is both the opening and the closing shot.
    let direction = if count <= 1 {
        "Slow cinematic push-in on the product with gentle parallax, ending on a clean hero frame"
    } else {
        match ShotPosition::for_segment(order, count) {
            ShotPosition::Opening => {
                "Attention-grabbing opening shot: dynamic camera move revealing the product, energetic motion"
            }
            ShotPosition::Middle => {
                "Smooth tracking shot highlighting product details, steady natural motion"
            }
            ShotPosition::Closing => {
                "Closing hero shot: slow dolly out settling on the product, calm and confident"
            }
        }
    };

    format!(
        "{}. Product: {}. Vertical social video ad, photorealistic, no text overlays.",
        direction,
        brief.product_name.trim()
    )
}

/// Spoken word budget for a voiceover of `duration_secs`.
pub fn word_budget(duration_secs: f64) -> usize {
    (duration_secs.max(0.0) * WORDS_PER_SECOND).floor() as usize
}

/// Prompt for the voiceover script.
pub fn script_prompt(brief: &ProductBrief, duration_secs: f64) -> String {
    let mut prompt = format!(
        "Write a voiceover script for a {:.0}-second vertical video ad for \"{}\".\n",
        duration_secs,
        brief.product_name.trim()
    );
    if let Some(description) = brief.description.as_deref().filter(|d| !d.trim().is_empty()) {
        prompt.push_str(&format!("Product description: {}\n", description.trim()));
    }
    if let Some(audience) = brief.audience.as_deref().filter(|a| !a.trim().is_empty()) {
        prompt.push_str(&format!("Target audience: {}\n", audience.trim()));
    }
    prompt.push_str(&format!(
        "\nRules:\n\
         - At most {} spoken words so it fits in {:.0} seconds.\n\
         - Open with a hook, close with a call to action.\n\
         - Return ONLY a JSON object: {{\"script\": \"...\"}}\n",
        word_budget(duration_secs),
        duration_secs
    ));
    prompt
}
