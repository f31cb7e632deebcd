//! Model names and prompt tag registries used by the auto-model router.

/// Sentinel model name that delegates the choice to the router.
pub const AUTO_MODEL: &str = "Auto Model";

/// Native multi-image model. Also the fallback for characters without a profile.
pub const SEEDREAM: &str = "Seedream 4.5";
/// High-fidelity model reserved for the large grid layouts.
pub const GEMINI_PRO: &str = "Gemini Pro";
/// General-purpose / compositing model.
pub const GEMINI: &str = "Gemini";
/// Default anime-stylized model.
pub const ART_PRO: &str = "Art Pro";

/// Grid tags that need the high-fidelity model.
pub const GRID_TAGS: &[&str] = &["<3x3-grid>", "<4x4-grid>", "<5x5-grid>", "<6x6-grid>"];

/// Grid and strip tags handled by the multi-image model.
pub const MULTI_IMAGE_GRID_TAGS: &[&str] =
    &["<2x2-grid>", "<three-panel-strip>", "<four-panel-strip>"];

/// Style presets the general-purpose model renders well.
pub const GENERAL_STYLES: &[&str] = &[
    "[pop-anime-style]",
    "[retro-anime-style]",
    "[semi-realistic-portrait-style]",
    "[soft-pastel-style]",
    "[watercolor-illustration-style]",
    "[iridescent-style]",
    "[flat-illustration-style]",
    "[doodle-style]",
    "[chibi-sticker-style]",
    "[glossy-chibi-style]",
    "[muscular-manhwa-style]",
    "[manhwa-style]",
    "[action-manga-style]",
    "[grayscale-manga-style]",
    "[3d-anime-style]",
    "[minimalist-style]",
    "[soft-pixel-art-style]",
    "[digital-painterly-style]",
    "[gothic-oil-painting-style]",
    "[pop-sketch-style]",
    "[ukiyo-e-style]",
    "[retro-comic-dots-style]",
    "[cyberpunk-style]",
];

/// UI label for a model name. Names without a special label are returned as-is.
pub fn display_label(model: &str) -> &str {
    match model {
        GEMINI_PRO => "Nano Banana Pro",
        GEMINI => "Gemini (Nano Banana)",
        other => other,
    }
}
