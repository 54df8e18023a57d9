//! Fallback candidate generation for nominal asset paths.
//!
//! Gallery records name files the way they were uploaded, which is not always
//! how they ended up on the server: extensions get normalized, case gets
//! folded, files move to the shared gallery directory. Given a nominal path
//! the resolver produces the ordered list of places worth probing:
//!
//! 1. The path exactly as requested
//! 2. The same path lowercased
//! 3. The same basename with every other known extension of the media family
//!    (modern image formats first when the surface can decode them)
//! 4. The same basename in each configured alternate directory
//!
//! The list is a pure function of the input and the construction-time
//! settings, with duplicates removed and first occurrence kept.

use crate::config::{FormatSupport, MediaConfig};
use crate::types::MediaKind;

/// Image formats that are only tried when the surface reports support.
const MODERN_IMAGE_FORMATS: [&str; 2] = ["webp", "avif"];

/// Generates fallback candidates for one media family.
#[derive(Debug, Clone)]
pub struct CandidateResolver {
    kind: MediaKind,
    extensions: Vec<String>,
    alternate_dirs: Vec<String>,
}

impl CandidateResolver {
    /// Build a resolver for `kind` from the media settings and detected formats.
    #[must_use]
    pub fn new(kind: MediaKind, media: &MediaConfig, formats: FormatSupport) -> Self {
        let (extensions, dirs) = match kind {
            MediaKind::Image => (
                image_extension_order(&media.image_extensions, formats),
                &media.alternate_dirs,
            ),
            MediaKind::Video => (
                normalize_extensions(&media.video_extensions),
                &media.video_alternate_dirs,
            ),
        };
        Self {
            kind,
            extensions,
            alternate_dirs: dirs
                .iter()
                .map(|dir| dir.trim_end_matches('/').to_string())
                .filter(|dir| !dir.is_empty())
                .collect(),
        }
    }

    /// Media family this resolver generates candidates for.
    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Extensions tried after the requested path, in order.
    #[must_use]
    pub fn extension_order(&self) -> &[String] {
        &self.extensions
    }

    /// Ordered, de-duplicated candidate list for `nominal`.
    #[must_use]
    pub fn candidates(&self, nominal: &str) -> Vec<String> {
        let parts = AssetPath::split(nominal);
        let mut out: Vec<String> = Vec::with_capacity(2 + self.extensions.len() * 2);

        push_unique(&mut out, nominal.to_string());
        push_unique(&mut out, parts.lowercased());

        if parts.stem.is_empty() {
            return out;
        }

        for ext in &self.extensions {
            push_unique(&mut out, parts.with_extension(ext));
        }

        for dir in &self.alternate_dirs {
            if let Some(ext) = parts.extension {
                push_unique(&mut out, format!("{dir}/{}.{ext}", parts.stem));
            }
            for ext in &self.extensions {
                push_unique(&mut out, format!("{dir}/{}.{ext}", parts.stem));
            }
        }

        out
    }
}

/// File name shown next to the not-found placeholder.
#[must_use]
pub fn display_name(nominal: &str) -> &str {
    let parts = AssetPath::split(nominal);
    parts
        .path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(nominal)
}

fn image_extension_order(configured: &[String], formats: FormatSupport) -> Vec<String> {
    let supported = |ext: &str| match ext {
        "webp" => formats.webp,
        "avif" => formats.avif,
        _ => true,
    };

    let mut order = Vec::new();
    for modern in MODERN_IMAGE_FORMATS {
        if supported(modern) {
            push_unique(&mut order, modern.to_string());
        }
    }
    for ext in normalize_extensions(configured) {
        if supported(&ext) {
            push_unique(&mut order, ext);
        }
    }
    order
}

fn normalize_extensions(configured: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(configured.len());
    for ext in configured {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() {
            push_unique(&mut out, ext);
        }
    }
    out
}

fn push_unique(list: &mut Vec<String>, candidate: String) {
    if !list.contains(&candidate) {
        list.push(candidate);
    }
}

/// A nominal path split into the pieces candidates are rebuilt from.
#[derive(Debug)]
struct AssetPath<'a> {
    /// `scheme://host[:port]` for absolute URLs, empty for site-relative paths.
    origin: &'a str,
    /// Path portion, including the leading slash when present.
    path: &'a str,
    /// Query and fragment, reattached unchanged.
    suffix: &'a str,
    /// Directory portion of `path` without a trailing slash, if any.
    dir: Option<&'a str>,
    /// File name without its last extension.
    stem: &'a str,
    /// Last extension without the dot.
    extension: Option<&'a str>,
}

impl<'a> AssetPath<'a> {
    fn split(raw: &'a str) -> Self {
        let suffix_at = raw.find(['?', '#']).unwrap_or(raw.len());
        let (body, suffix) = raw.split_at(suffix_at);

        let (origin, path) = body.find("://").map_or(("", body), |scheme_end| {
            let host_start = scheme_end + 3;
            body[host_start..]
                .find('/')
                .map_or((body, ""), |slash| body.split_at(host_start + slash))
        });

        let (dir, file) = match path.rsplit_once('/') {
            Some((dir, file)) => (Some(dir), file),
            None => (None, path),
        };

        let (stem, extension) = match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
            _ => (file, None),
        };

        Self {
            origin,
            path,
            suffix,
            dir,
            stem,
            extension,
        }
    }

    fn lowercased(&self) -> String {
        format!(
            "{}{}{}",
            self.origin,
            self.path.to_lowercase(),
            self.suffix
        )
    }

    fn with_extension(&self, ext: &str) -> String {
        match self.dir {
            Some(dir) => format!("{}{dir}/{}.{ext}{}", self.origin, self.stem, self.suffix),
            None => format!("{}{}.{ext}{}", self.origin, self.stem, self.suffix),
        }
    }
}
