//! Marker detection in prompt text: `@mentions`, `[style]` presets and
//! `<directive>` tags.

use std::sync::LazyLock;

use regex::Regex;

/// `@` followed by ASCII word characters, `-`, `(`, `)`, `.`, `:` or `'`.
/// e.g. `@Rem_(Re:Zero)`, `@Mr._C.B._(Umamusume)`, `@MayaJensen-dgqr`
static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@([A-Za-z0-9_\-().:']+)").expect("valid mention regex")
});

static STYLE_PRESET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.+?\]").expect("valid preset regex"));

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]+>").expect("valid directive regex"));

/// Suffix shape of user-created character ids, e.g. `-dgqr`.
static OC_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-[a-zA-Z0-9]{3,}$").expect("valid oc regex"));

/// Character ids mentioned in the prompt, without the leading `@`, in order.
pub fn extract_mentions(prompt: &str) -> Vec<&str> {
    MENTION_RE
        .captures_iter(prompt)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// True if the prompt contains a resolvable `@mention`.
pub fn has_mention(prompt: &str) -> bool {
    MENTION_RE.is_match(prompt)
}

/// True if the prompt contains a `[...]` style preset.
pub fn has_style_preset(prompt: &str) -> bool {
    STYLE_PRESET_RE.is_match(prompt)
}

/// True if the prompt opens any `<` directive, closed or not.
pub fn has_directive(prompt: &str) -> bool {
    prompt.contains('<')
}

/// Number of closed `<...>` directives in the prompt.
pub fn count_directives(prompt: &str) -> usize {
    DIRECTIVE_RE.find_iter(prompt).count()
}

/// True if any of `tags` occurs in the prompt.
pub fn contains_any<S: AsRef<str>>(prompt: &str, tags: &[S]) -> bool {
    tags.iter().any(|t| prompt.contains(t.as_ref()))
}

/// Heuristic for an id missing from the catalog: official ids carry the IP in
/// parentheses (`Rem_(Re:Zero)`); user-created ones end in a short random
/// suffix (`MayaJensen-dgqr`).
pub fn looks_user_created(character_id: &str) -> bool {
    !character_id.contains('(') && OC_SUFFIX_RE.is_match(character_id)
}

/// Whether a generic anime style should be appended: only when the prompt has no
/// reference image, no character image, no mention and no style preset.
pub fn should_add_anime_style<R, C>(prompt: &str, reference_images: &[R], character_images: &[C]) -> bool {
    reference_images.is_empty()
        && character_images.is_empty()
        && !has_mention(prompt)
        && !has_style_preset(prompt)
}
