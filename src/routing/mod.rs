//! "Auto Model" resolution: picks a concrete backend model from the prompt and
//! reference images when the caller chose `Auto Model`.

pub mod prompt;
pub mod styles;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::config::RouterOverrides;
use prompt::{contains_any, extract_mentions, has_directive, has_style_preset, looks_user_created};
use styles::{
    ART_PRO, AUTO_MODEL, GEMINI, GEMINI_PRO, GENERAL_STYLES, GRID_TAGS, MULTI_IMAGE_GRID_TAGS,
    SEEDREAM,
};

/// The caller's model selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelChoice {
    Auto,
    Explicit(String),
}

impl ModelChoice {
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

impl From<&str> for ModelChoice {
    fn from(s: &str) -> Self {
        if s == AUTO_MODEL {
            Self::Auto
        } else {
            Self::Explicit(s.to_string())
        }
    }
}

impl From<String> for ModelChoice {
    fn from(s: String) -> Self {
        if s == AUTO_MODEL {
            Self::Auto
        } else {
            Self::Explicit(s)
        }
    }
}

impl FromStr for ModelChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str(AUTO_MODEL),
            Self::Explicit(m) => f.write_str(m),
        }
    }
}

/// Catalog entry for a mentionable character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    /// `Some(false)`: confirmed to lack an alt-prompt profile.
    /// `None`: profile state not loaded.
    #[serde(default)]
    pub has_rich_profile: Option<bool>,
}

impl Character {
    pub fn new(id: impl Into<String>, has_rich_profile: Option<bool>) -> Self {
        Self {
            id: id.into(),
            has_rich_profile,
        }
    }

    /// Build from the catalog's raw alt-prompt field: absent → unknown,
    /// empty → confirmed missing. Whitespace counts as a profile.
    pub fn from_alt_prompt(id: impl Into<String>, alt_prompt: Option<&str>) -> Self {
        Self::new(id, alt_prompt.map(|p| !p.is_empty()))
    }
}

/// Everything the router looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingInput {
    pub mode: ModelChoice,
    pub prompt: String,
    pub reference_images: Vec<String>,
    pub available_characters: Option<Vec<Character>>,
}

/// Which rule produced a decision. Useful for logging why a request moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteReason {
    Explicit,
    MultipleReferences,
    GridTag,
    MultiImageGridTag,
    BareMention,
    CharacterWithoutProfile,
    CharacterMention,
    NoCatalog,
    GeneralStylePreset,
    StylePreset,
    SingleReference,
    PlainPrompt,
    Directive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub model: String,
    pub reason: RouteReason,
}

/// Rule-ordered model router. First matching rule wins.
#[derive(Debug, Clone)]
pub struct AutoModelRouter {
    multi_image_model: String,
    high_fidelity_model: String,
    stylized_model: String,
    general_model: String,
    grid_model: String,
    grid_tags: Vec<String>,
    multi_image_grid_tags: Vec<String>,
    general_styles: Vec<String>,
}

impl Default for AutoModelRouter {
    fn default() -> Self {
        let owned = |tags: &[&str]| -> Vec<String> { tags.iter().map(|t| t.to_string()).collect() };
        Self {
            multi_image_model: SEEDREAM.to_string(),
            high_fidelity_model: SEEDREAM.to_string(),
            stylized_model: ART_PRO.to_string(),
            general_model: GEMINI.to_string(),
            grid_model: GEMINI_PRO.to_string(),
            grid_tags: owned(GRID_TAGS),
            multi_image_grid_tags: owned(MULTI_IMAGE_GRID_TAGS),
            general_styles: owned(GENERAL_STYLES),
        }
    }
}

impl AutoModelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: &RouterOverrides) -> Self {
        let mut router = Self::default();
        let o = overrides.clone();
        if let Some(m) = o.multi_image_model {
            router.multi_image_model = m;
        }
        if let Some(m) = o.high_fidelity_model {
            router.high_fidelity_model = m;
        }
        if let Some(m) = o.stylized_model {
            router.stylized_model = m;
        }
        if let Some(m) = o.general_model {
            router.general_model = m;
        }
        if let Some(m) = o.grid_model {
            router.grid_model = m;
        }
        if let Some(t) = o.grid_tags {
            router.grid_tags = t;
        }
        if let Some(t) = o.multi_image_grid_tags {
            router.multi_image_grid_tags = t;
        }
        if let Some(t) = o.general_styles {
            router.general_styles = t;
        }
        router
    }

    /// True if any registered general-purpose style tag occurs in the prompt.
    pub fn has_general_style(&self, prompt: &str) -> bool {
        contains_any(prompt, &self.general_styles)
    }

    pub fn resolve(&self, input: &RoutingInput) -> String {
        self.decide(input).model
    }

    /// Resolve and report which rule matched.
    pub fn decide(&self, input: &RoutingInput) -> RouteDecision {
        let decision = self.decide_inner(input);
        if input.mode.is_auto() {
            tracing::debug!(
                model = decision.model,
                reason = ?decision.reason,
                references = input.reference_images.len(),
                "auto model resolved"
            );
        }
        decision
    }

    fn decide_inner(&self, input: &RoutingInput) -> RouteDecision {
        match &input.mode {
            ModelChoice::Explicit(model) => RouteDecision {
                model: model.clone(),
                reason: RouteReason::Explicit,
            },
            ModelChoice::Auto => self.decide_auto(input),
        }
    }

    fn decide_auto(&self, input: &RoutingInput) -> RouteDecision {
        let route = |model: &str, reason: RouteReason| RouteDecision {
            model: model.to_string(),
            reason,
        };
        let prompt = input.prompt.as_str();
        let references = input.reference_images.len();

        if references > 1 {
            return route(&self.multi_image_model, RouteReason::MultipleReferences);
        }

        if contains_any(prompt, &self.grid_tags) {
            return route(&self.grid_model, RouteReason::GridTag);
        }
        if contains_any(prompt, &self.multi_image_grid_tags) {
            return route(&self.multi_image_model, RouteReason::MultiImageGridTag);
        }

        if prompt.contains('@') {
            let mentions = extract_mentions(prompt);
            if mentions.is_empty() {
                return route(&self.stylized_model, RouteReason::BareMention);
            }
            return match input.available_characters.as_deref() {
                Some(catalog) if !catalog.is_empty() => {
                    if mentions.iter().any(|id| confirmed_without_profile(id, catalog)) {
                        route(&self.high_fidelity_model, RouteReason::CharacterWithoutProfile)
                    } else {
                        route(&self.stylized_model, RouteReason::CharacterMention)
                    }
                }
                // Never switch away without positive confirmation.
                _ => route(&self.stylized_model, RouteReason::NoCatalog),
            };
        }

        if has_style_preset(prompt) {
            if self.has_general_style(prompt) {
                return route(&self.general_model, RouteReason::GeneralStylePreset);
            }
            return route(&self.stylized_model, RouteReason::StylePreset);
        }

        if references == 1 {
            return route(&self.multi_image_model, RouteReason::SingleReference);
        }

        if has_directive(prompt) {
            route(&self.general_model, RouteReason::Directive)
        } else {
            route(&self.stylized_model, RouteReason::PlainPrompt)
        }
    }
}

fn confirmed_without_profile(id: &str, catalog: &[Character]) -> bool {
    match catalog.iter().find(|c| c.id == id) {
        Some(character) => character.has_rich_profile == Some(false),
        None => looks_user_created(id),
    }
}

static DEFAULT_ROUTER: LazyLock<AutoModelRouter> = LazyLock::new(AutoModelRouter::default);

/// Resolve with the default router.
pub fn resolve_model<S: AsRef<str>>(
    mode: impl Into<ModelChoice>,
    prompt: &str,
    reference_images: &[S],
    available_characters: Option<&[Character]>,
) -> String {
    let input = RoutingInput {
        mode: mode.into(),
        prompt: prompt.to_string(),
        reference_images: reference_images.iter().map(|r| r.as_ref().to_string()).collect(),
        available_characters: available_characters.map(<[Character]>::to_vec),
    };
    DEFAULT_ROUTER.resolve(&input)
}
