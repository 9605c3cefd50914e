//! Parameter types for convert operations.
//!
//! These structs describe *what* to add to a command line, not *how* it runs.
//! The [`toolkit`](super::toolkit) applies them to an [`ArgumentSet`] before
//! handing it to the execution manager.
//!
//! ## Types
//!
//! - [`Quality`]: output quality (0–100, default 75). Clamped on construction.
//! - [`PostProcessing`]: arguments every convert receives (prepend, density,
//!   profile or colorspace, quality).

use crate::config::MagickConfig;
use crate::exec::ArgumentSet;
use std::path::PathBuf;

/// Quality setting for output encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Arguments added to every convert command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostProcessing {
    /// Placed at the very front of the token list.
    pub prepend: Vec<String>,
    /// Resample to 72 pixels per inch.
    pub density: bool,
    pub colorspace: Option<String>,
    /// Takes precedence over `colorspace`.
    pub profile: Option<PathBuf>,
    pub quality: Quality,
}

impl PostProcessing {
    pub fn from_config(config: &MagickConfig) -> Self {
        let advanced = &config.advanced;
        Self {
            prepend: config.prepend_args(),
            density: advanced.density,
            colorspace: (!advanced.colorspace.is_empty()).then(|| advanced.colorspace.clone()),
            profile: (!advanced.profile.is_empty()).then(|| PathBuf::from(&advanced.profile)),
            quality: Quality::new(config.quality),
        }
    }

    /// Adds the post-processing arguments to `args`.
    ///
    /// Prepend arguments go before any existing tokens; everything else is
    /// appended after the caller's operations.
    pub fn apply(&self, args: &mut ArgumentSet) {
        for arg in self.prepend.iter().rev() {
            args.prepend(arg.as_str());
        }
        if self.density {
            args.add("-density").add("72").add("-units").add("PixelsPerInch");
        }
        if let Some(profile) = &self.profile {
            args.add("-profile")
                .add_quoted(profile.to_string_lossy().into_owned());
        } else if let Some(colorspace) = &self.colorspace {
            args.add("-colorspace").add(colorspace.as_str());
        }
        args.add("-quality").add(self.quality.value().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::Token;

    fn raw(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(Token::as_str).collect()
    }

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 0);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_75() {
        assert_eq!(Quality::default().value(), 75);
    }

    #[test]
    fn quality_only_by_default() {
        let mut args = ArgumentSet::new();
        args.add("-resize").add("50%");
        PostProcessing::default().apply(&mut args);
        assert_eq!(raw(args.tokens()), vec!["-resize", "50%", "-quality", "75"]);
    }

    #[test]
    fn full_post_processing_order() {
        let post = PostProcessing {
            prepend: vec!["-limit".into(), "thread".into(), "1".into()],
            density: true,
            colorspace: Some("GRAY".into()),
            profile: None,
            quality: Quality::new(90),
        };
        let mut args = ArgumentSet::new();
        args.add("-resize").add("50%");
        post.apply(&mut args);
        assert_eq!(
            raw(args.tokens()),
            vec![
                "-limit",
                "thread",
                "1",
                "-resize",
                "50%",
                "-density",
                "72",
                "-units",
                "PixelsPerInch",
                "-colorspace",
                "GRAY",
                "-quality",
                "90",
            ]
        );
    }

    #[test]
    fn profile_overrides_colorspace_and_is_quoted() {
        let post = PostProcessing {
            colorspace: Some("sRGB".into()),
            profile: Some(PathBuf::from("/icc/sRGB v4.icc")),
            ..PostProcessing::default()
        };
        let mut args = ArgumentSet::new();
        post.apply(&mut args);
        assert_eq!(args.find("-colorspace"), None);
        assert_eq!(
            args.tokens()[1],
            Token::Quoted("/icc/sRGB v4.icc".into())
        );
    }

    #[test]
    fn from_config_maps_empty_strings_to_none() {
        let mut config = MagickConfig::default();
        config.quality = 88;
        config.prepend = "-debug None".into();
        config.advanced.colorspace = "RGB".into();
        let post = PostProcessing::from_config(&config);
        assert_eq!(post.quality, Quality(88));
        assert_eq!(post.prepend, vec!["-debug", "None"]);
        assert_eq!(post.colorspace.as_deref(), Some("RGB"));
        assert!(post.profile.is_none());
        assert!(!post.density);
    }
}
