//! Static capability records for the video generation models, and the
//! selection filter the model picker runs against them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::Serialize;

use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageToVideoModel {
    Veo,
    Minimax,
    Ray,
    Kling,
    Pixverse,
    RayFlashV2,
    Wan,
    WanPro,
    KlingV2,
    FramePack,
    Vidu,
    #[serde(rename = "magi_1")]
    Magi1,
    Anisora,
    Hedra,
    ViduQ2,
    MjVideo,
    Seedance,
    Sora,
    SoraPro,
    ViduQ2Multi,
    SoraStable,
    SoraProStable,
    ViduQ2Pro,
    #[serde(rename = "wan_22_turbo")]
    Wan22Turbo,
}

impl ImageToVideoModel {
    pub const ALL: [ImageToVideoModel; 24] = [
        Self::Veo,
        Self::Minimax,
        Self::Ray,
        Self::Kling,
        Self::Pixverse,
        Self::RayFlashV2,
        Self::Wan,
        Self::WanPro,
        Self::KlingV2,
        Self::FramePack,
        Self::Vidu,
        Self::Magi1,
        Self::Anisora,
        Self::Hedra,
        Self::ViduQ2,
        Self::MjVideo,
        Self::Seedance,
        Self::Sora,
        Self::SoraPro,
        Self::ViduQ2Multi,
        Self::SoraStable,
        Self::SoraProStable,
        Self::ViduQ2Pro,
        Self::Wan22Turbo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Veo => "veo",
            Self::Minimax => "minimax",
            Self::Ray => "ray",
            Self::Kling => "kling",
            Self::Pixverse => "pixverse",
            Self::RayFlashV2 => "ray_flash_v2",
            Self::Wan => "wan",
            Self::WanPro => "wan_pro",
            Self::KlingV2 => "kling_v2",
            Self::FramePack => "frame_pack",
            Self::Vidu => "vidu",
            Self::Magi1 => "magi_1",
            Self::Anisora => "anisora",
            Self::Hedra => "hedra",
            Self::ViduQ2 => "vidu_q2",
            Self::MjVideo => "mj_video",
            Self::Seedance => "seedance",
            Self::Sora => "sora",
            Self::SoraPro => "sora_pro",
            Self::ViduQ2Multi => "vidu_q2_multi",
            Self::SoraStable => "sora_stable",
            Self::SoraProStable => "sora_pro_stable",
            Self::ViduQ2Pro => "vidu_q2_pro",
            Self::Wan22Turbo => "wan_22_turbo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextToVideoModel {
    Minimax,
    Ray,
    KlingV2,
    Wan,
    Vidu,
    Seedance,
    ViduQ2,
    Veo,
    Sora,
    SoraPro,
    SoraStable,
    SoraProStable,
    #[serde(rename = "wan_22_turbo")]
    Wan22Turbo,
}

impl TextToVideoModel {
    pub const ALL: [TextToVideoModel; 13] = [
        Self::Minimax,
        Self::Ray,
        Self::KlingV2,
        Self::Wan,
        Self::Vidu,
        Self::Seedance,
        Self::ViduQ2,
        Self::Veo,
        Self::Sora,
        Self::SoraPro,
        Self::SoraStable,
        Self::SoraProStable,
        Self::Wan22Turbo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimax => "minimax",
            Self::Ray => "ray",
            Self::KlingV2 => "kling_v2",
            Self::Wan => "wan",
            Self::Vidu => "vidu",
            Self::Seedance => "seedance",
            Self::ViduQ2 => "vidu_q2",
            Self::Veo => "veo",
            Self::Sora => "sora",
            Self::SoraPro => "sora_pro",
            Self::SoraStable => "sora_stable",
            Self::SoraProStable => "sora_pro_stable",
            Self::Wan22Turbo => "wan_22_turbo",
        }
    }
}

/// Capability registry key. Written as `i2v:<name>` / `t2v:<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKey {
    ImageToVideo(ImageToVideoModel),
    TextToVideo(TextToVideoModel),
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageToVideo(m) => write!(f, "i2v:{}", m.as_str()),
            Self::TextToVideo(m) => write!(f, "t2v:{}", m.as_str()),
        }
    }
}

impl FromStr for ModelKey {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || GenerationError::Other(format!("unknown model key: {s}"));
        let (kind, name) = s.trim().split_once(':').ok_or_else(unknown)?;
        match kind {
            "i2v" => ImageToVideoModel::ALL
                .into_iter()
                .find(|m| m.as_str() == name)
                .map(Self::ImageToVideo)
                .ok_or_else(unknown),
            "t2v" => TextToVideoModel::ALL
                .into_iter()
                .find(|m| m.as_str() == name)
                .map(Self::TextToVideo)
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    ImageOnly,
    TextOnly,
    Both,
}

/// What a model accepts and produces. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCapability {
    pub show_duration: bool,
    pub show_aspect_ratio: bool,
    pub show_resolution: bool,
    /// Legal durations in seconds. Empty = fixed at `default_duration`.
    pub duration_options: &'static [u32],
    pub default_duration: Option<u32>,
    pub aspect_ratio_options: &'static [&'static str],
    pub default_aspect_ratio: Option<&'static str>,
    pub resolution_options: &'static [&'static str],
    pub default_resolution: Option<&'static str>,
    pub supports_audio: bool,
    pub supports_audio_input: bool,
    pub supports_end_frame: bool,
    pub input_mode: InputMode,
    pub supports_multiple_reference_images: bool,
    pub max_reference_images: Option<u32>,
    /// Multiple references must be stitched into one image client-side.
    pub requires_image_stitching: bool,
    pub supports_nsfw: bool,
    pub max_prompt_length: Option<u32>,
    /// Image-to-video only: model to use when no input image is given.
    pub text_to_video_fallback: Option<TextToVideoModel>,
    pub supports_camera_fixed: bool,
    pub supports_multi_shots: bool,
}

impl ModelCapability {
    /// (min, max) seconds, from the options or the fixed default.
    pub fn duration_range(&self) -> Option<(u32, u32)> {
        match (
            self.duration_options.iter().min(),
            self.duration_options.iter().max(),
        ) {
            (Some(min), Some(max)) => Some((*min, *max)),
            _ => self.default_duration.map(|d| (d, d)),
        }
    }

    /// Whether `count` reference images fit this model.
    pub fn accepts_references(&self, count: usize) -> bool {
        if count < 2 {
            return true;
        }
        self.supports_multiple_reference_images
            && self
                .max_reference_images
                .is_none_or(|max| count <= max as usize)
    }
}

const NONE: ModelCapability = ModelCapability {
    show_duration: false,
    show_aspect_ratio: false,
    show_resolution: false,
    duration_options: &[],
    default_duration: Some(5),
    aspect_ratio_options: &[],
    default_aspect_ratio: Some("16:9"),
    resolution_options: &[],
    default_resolution: None,
    supports_audio: false,
    supports_audio_input: false,
    supports_end_frame: false,
    input_mode: InputMode::Both,
    supports_multiple_reference_images: false,
    max_reference_images: None,
    requires_image_stitching: false,
    supports_nsfw: false,
    max_prompt_length: None,
    text_to_video_fallback: None,
    supports_camera_fixed: false,
    supports_multi_shots: false,
};

/// Returned for any model without a record.
pub const DEFAULT_CAPABILITY: ModelCapability = ModelCapability {
    show_duration: true,
    show_aspect_ratio: true,
    duration_options: &[5, 10],
    aspect_ratio_options: &["16:9", "9:16"],
    ..NONE
};

const SQUARE_WIDE_TALL: &[&str] = &["1:1", "16:9", "9:16"];
const WIDE_TALL: &[&str] = &["16:9", "9:16"];
const HD: &[&str] = &["720p", "1080p"];
const SEEDANCE_RATIOS: &[&str] = &["1:1", "16:9", "9:16", "3:4", "4:3", "21:9"];
const SEEDANCE_DURATIONS: &[u32] = &[4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Image-only model with only an aspect-ratio picker.
const IMAGE_ONLY_BASIC: ModelCapability = ModelCapability {
    show_aspect_ratio: true,
    aspect_ratio_options: SQUARE_WIDE_TALL,
    input_mode: InputMode::ImageOnly,
    ..NONE
};

fn image_to_video(model: ImageToVideoModel) -> ModelCapability {
    use ImageToVideoModel as M;
    match model {
        M::Vidu => ModelCapability {
            supports_audio: true,
            text_to_video_fallback: Some(TextToVideoModel::Vidu),
            ..NONE
        },
        M::ViduQ2 => ModelCapability {
            show_duration: true,
            show_resolution: true,
            duration_options: &[4, 5, 6, 7, 8],
            default_duration: Some(4),
            resolution_options: HD,
            default_resolution: Some("720p"),
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            text_to_video_fallback: Some(TextToVideoModel::ViduQ2),
            max_prompt_length: Some(3000),
            ..NONE
        },
        M::ViduQ2Pro => ModelCapability {
            show_duration: true,
            show_resolution: true,
            duration_options: &[2, 3, 4, 5, 6, 7, 8],
            default_duration: Some(4),
            resolution_options: HD,
            default_resolution: Some("720p"),
            input_mode: InputMode::ImageOnly,
            max_prompt_length: Some(3000),
            ..NONE
        },
        M::ViduQ2Multi => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: &[4, 5, 6, 7, 8],
            default_duration: Some(4),
            aspect_ratio_options: &["16:9", "9:16", "1:1"],
            resolution_options: &["360p", "720p", "1080p"],
            default_resolution: Some("720p"),
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            text_to_video_fallback: Some(TextToVideoModel::ViduQ2),
            max_prompt_length: Some(3000),
            ..NONE
        },
        M::SoraStable => ModelCapability {
            show_duration: true,
            duration_options: &[4, 8, 12],
            default_duration: Some(4),
            aspect_ratio_options: WIDE_TALL,
            supports_audio: true,
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            requires_image_stitching: true,
            text_to_video_fallback: Some(TextToVideoModel::SoraStable),
            ..NONE
        },
        M::SoraProStable => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: &[4, 8, 12],
            default_duration: Some(4),
            aspect_ratio_options: WIDE_TALL,
            resolution_options: HD,
            default_resolution: Some("720p"),
            supports_audio: true,
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            requires_image_stitching: true,
            text_to_video_fallback: Some(TextToVideoModel::SoraProStable),
            ..NONE
        },
        M::Sora => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            duration_options: &[10, 15],
            default_duration: Some(10),
            aspect_ratio_options: WIDE_TALL,
            supports_audio: true,
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            requires_image_stitching: true,
            text_to_video_fallback: Some(TextToVideoModel::Sora),
            ..NONE
        },
        M::SoraPro => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: &[10, 15],
            default_duration: Some(10),
            aspect_ratio_options: WIDE_TALL,
            resolution_options: HD,
            default_resolution: Some("720p"),
            supports_audio: true,
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            requires_image_stitching: true,
            text_to_video_fallback: Some(TextToVideoModel::SoraPro),
            ..NONE
        },
        M::Minimax => ModelCapability {
            supports_end_frame: true,
            supports_nsfw: true,
            text_to_video_fallback: Some(TextToVideoModel::Minimax),
            ..NONE
        },
        M::Seedance => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: SEEDANCE_DURATIONS,
            aspect_ratio_options: SEEDANCE_RATIOS,
            resolution_options: &["480p", "720p"],
            default_resolution: Some("480p"),
            supports_end_frame: true,
            supports_audio: true,
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            supports_camera_fixed: true,
            text_to_video_fallback: Some(TextToVideoModel::Seedance),
            ..NONE
        },
        M::KlingV2 => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            duration_options: &[5, 10],
            aspect_ratio_options: SQUARE_WIDE_TALL,
            text_to_video_fallback: Some(TextToVideoModel::KlingV2),
            ..NONE
        },
        // Image-to-video Veo is fixed at 8 seconds.
        M::Veo => ModelCapability {
            show_aspect_ratio: true,
            duration_options: &[8],
            default_duration: Some(8),
            aspect_ratio_options: SQUARE_WIDE_TALL,
            supports_audio: true,
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            requires_image_stitching: true,
            text_to_video_fallback: Some(TextToVideoModel::Veo),
            ..NONE
        },
        M::Wan => ModelCapability {
            show_duration: true,
            show_resolution: true,
            duration_options: &[5, 10, 15],
            resolution_options: HD,
            default_resolution: Some("720p"),
            supports_audio: true,
            supports_audio_input: true,
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            supports_multi_shots: true,
            text_to_video_fallback: Some(TextToVideoModel::Wan),
            ..NONE
        },
        M::WanPro => ModelCapability {
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            ..IMAGE_ONLY_BASIC
        },
        M::Ray => ModelCapability {
            show_aspect_ratio: true,
            duration_options: &[5],
            aspect_ratio_options: &["16:9", "9:16", "4:3", "3:4", "21:9", "9:21"],
            supports_end_frame: true,
            text_to_video_fallback: Some(TextToVideoModel::Ray),
            ..NONE
        },
        M::Anisora | M::Hedra | M::MjVideo => ModelCapability {
            input_mode: InputMode::ImageOnly,
            ..NONE
        },
        M::FramePack => ModelCapability {
            supports_nsfw: true,
            ..IMAGE_ONLY_BASIC
        },
        M::Kling | M::Pixverse | M::RayFlashV2 | M::Magi1 => IMAGE_ONLY_BASIC,
        M::Wan22Turbo => ModelCapability {
            show_resolution: true,
            resolution_options: &["480p", "580p", "720p"],
            default_resolution: Some("720p"),
            supports_end_frame: true,
            supports_nsfw: true,
            text_to_video_fallback: Some(TextToVideoModel::Wan22Turbo),
            ..NONE
        },
    }
}

fn text_to_video(model: TextToVideoModel) -> ModelCapability {
    use TextToVideoModel as M;
    match model {
        M::Vidu | M::Minimax => NONE,
        M::ViduQ2 => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: &[2, 3, 4, 5, 6, 7, 8],
            default_duration: Some(4),
            aspect_ratio_options: &["16:9", "9:16", "1:1"],
            resolution_options: &["360p", "520p", "720p", "1080p"],
            default_resolution: Some("720p"),
            supports_multiple_reference_images: true,
            max_reference_images: Some(3),
            max_prompt_length: Some(3000),
            ..NONE
        },
        M::SoraStable => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            duration_options: &[4, 8, 12],
            default_duration: Some(4),
            aspect_ratio_options: WIDE_TALL,
            supports_audio: true,
            ..NONE
        },
        M::SoraProStable => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: &[4, 8, 12],
            default_duration: Some(4),
            aspect_ratio_options: WIDE_TALL,
            resolution_options: HD,
            default_resolution: Some("720p"),
            supports_audio: true,
            ..NONE
        },
        M::Sora => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            duration_options: &[10, 15],
            default_duration: Some(10),
            aspect_ratio_options: WIDE_TALL,
            supports_audio: true,
            ..NONE
        },
        M::SoraPro => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: &[10, 15],
            default_duration: Some(10),
            aspect_ratio_options: WIDE_TALL,
            resolution_options: HD,
            default_resolution: Some("720p"),
            supports_audio: true,
            ..NONE
        },
        M::Seedance => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: SEEDANCE_DURATIONS,
            aspect_ratio_options: SEEDANCE_RATIOS,
            resolution_options: &["480p", "720p"],
            default_resolution: Some("480p"),
            supports_audio: true,
            supports_camera_fixed: true,
            ..NONE
        },
        M::KlingV2 => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            duration_options: &[5, 10],
            aspect_ratio_options: SQUARE_WIDE_TALL,
            ..NONE
        },
        M::Veo => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            duration_options: &[4, 6, 8],
            default_duration: Some(8),
            aspect_ratio_options: SQUARE_WIDE_TALL,
            supports_audio: true,
            ..NONE
        },
        M::Wan => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            show_resolution: true,
            duration_options: &[5, 10, 15],
            aspect_ratio_options: &["1:1", "16:9", "9:16", "3:4", "4:3"],
            resolution_options: HD,
            default_resolution: Some("720p"),
            supports_audio: true,
            supports_audio_input: true,
            supports_multi_shots: true,
            ..NONE
        },
        M::Ray => ModelCapability {
            show_duration: true,
            show_aspect_ratio: true,
            duration_options: &[5, 9],
            aspect_ratio_options: SQUARE_WIDE_TALL,
            ..NONE
        },
        M::Wan22Turbo => ModelCapability {
            show_aspect_ratio: true,
            show_resolution: true,
            default_duration: None,
            aspect_ratio_options: SQUARE_WIDE_TALL,
            resolution_options: &["480p", "580p", "720p"],
            default_resolution: Some("720p"),
            supports_nsfw: true,
            ..NONE
        },
    }
}

/// What the current selection requires of a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionContext {
    pub has_end_frame: bool,
    pub reference_images: usize,
    /// Distinct character references among the reference images.
    pub character_images: usize,
}

impl SelectionContext {
    /// Build from reference images given as `(url, character_id)` pairs.
    pub fn from_references<'a, I>(has_end_frame: bool, references: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut count = 0;
        let mut characters = HashSet::new();
        for (_, character_id) in references {
            count += 1;
            if let Some(id) = character_id {
                characters.insert(id);
            }
        }
        Self {
            has_end_frame,
            reference_images: count,
            character_images: characters.len(),
        }
    }

    pub fn allows(&self, capability: &ModelCapability) -> bool {
        if self.has_end_frame && !capability.supports_end_frame {
            return false;
        }
        if self.reference_images >= 2 && !capability.accepts_references(self.reference_images) {
            return false;
        }
        if self.character_images >= 2 && !capability.accepts_references(self.character_images) {
            return false;
        }
        true
    }
}

/// Process-wide capability table. Unknown keys resolve to `DEFAULT_CAPABILITY`.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    entries: HashMap<ModelKey, ModelCapability>,
}

static GLOBAL: LazyLock<CapabilityRegistry> = LazyLock::new(CapabilityRegistry::builtin);

impl CapabilityRegistry {
    pub fn global() -> &'static CapabilityRegistry {
        &GLOBAL
    }

    pub fn builtin() -> Self {
        let image = ImageToVideoModel::ALL
            .into_iter()
            .map(|m| (ModelKey::ImageToVideo(m), image_to_video(m)));
        let text = TextToVideoModel::ALL
            .into_iter()
            .map(|m| (ModelKey::TextToVideo(m), text_to_video(m)));
        Self::from_entries(image.chain(text))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (ModelKey, ModelCapability)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn contains(&self, key: ModelKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn get(&self, key: ModelKey) -> &ModelCapability {
        self.entries.get(&key).unwrap_or(&DEFAULT_CAPABILITY)
    }

    /// Look up by key string. Unparseable or unknown keys get the default.
    pub fn lookup(&self, key: &str) -> &ModelCapability {
        match key.parse::<ModelKey>() {
            Ok(key) => self.get(key),
            Err(_) => {
                tracing::debug!(key, "no capability record, using default");
                &DEFAULT_CAPABILITY
            }
        }
    }

    /// Keep the catalog entries that satisfy the selection, in catalog order.
    pub fn filter_models_for(&self, context: &SelectionContext, catalog: &[ModelKey]) -> Vec<ModelKey> {
        catalog
            .iter()
            .copied()
            .filter(|key| context.allows(self.get(*key)))
            .collect()
    }

    /// `current` if it satisfies the selection, else the first model that does.
    pub fn select_model(
        &self,
        context: &SelectionContext,
        catalog: &[ModelKey],
        current: ModelKey,
    ) -> Option<ModelKey> {
        let allowed = self.filter_models_for(context, catalog);
        if allowed.contains(&current) {
            return Some(current);
        }
        let fallback = allowed.first().copied();
        if let Some(next) = fallback {
            tracing::debug!(from = %current, to = %next, "selected model unavailable for context");
        }
        fallback
    }

    /// Swap an image-to-video model for its text-to-video fallback when no
    /// input image is supplied.
    pub fn effective_model(&self, key: ModelKey, has_input_image: bool) -> ModelKey {
        if has_input_image {
            return key;
        }
        match (key, self.get(key).text_to_video_fallback) {
            (ModelKey::ImageToVideo(_), Some(t2v)) => ModelKey::TextToVideo(t2v),
            _ => key,
        }
    }
}

pub fn capabilities_of(key: ModelKey) -> &'static ModelCapability {
    CapabilityRegistry::global().get(key)
}

pub fn filter_models_for(context: &SelectionContext, catalog: &[ModelKey]) -> Vec<ModelKey> {
    CapabilityRegistry::global().filter_models_for(context, catalog)
}
