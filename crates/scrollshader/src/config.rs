//! Page wiring read from an embedded JSON block.
//!
//! The host page carries a `<script type="application/json">` element whose
//! body names every element this runtime drives, by id. Nothing here is
//! discovered by selector queries; a page that wants a hero scrub, a jack,
//! or a pattern canvas declares it.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Id of the JSON config element the runtime reads at startup.
pub const CONFIG_ELEMENT_ID: &str = "scrollshader-config";

pub const DEFAULT_CMS_API_BASE: &str = "https://cdn.contentful.com";
pub const DEFAULT_FORMS_ENDPOINT: &str = "https://api.hsforms.com";

const DEFAULT_EXTRA_SCROLL: f64 = 3000.0;

fn default_extra_scroll() -> f64 {
    DEFAULT_EXTRA_SCROLL
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    #[serde(default)]
    pub hero: Option<HeroConfig>,
    #[serde(default)]
    pub jacks: Vec<JackConfig>,
    #[serde(default)]
    pub pattern: Option<PatternConfig>,
    #[serde(default)]
    pub preloader: Option<PreloaderConfig>,
    #[serde(default)]
    pub cms: Option<CmsConfig>,
    #[serde(default)]
    pub form: Option<FormWiring>,
}

impl PageConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: PageConfig =
            serde_json::from_str(raw).context("parsing page config JSON")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(hero) = &self.hero {
            if !hero.extra_scroll.is_finite() || hero.extra_scroll <= 0.0 {
                bail!("hero extraScroll must be a positive number of pixels");
            }
            if let MediaWiring::Sequence { frame_count, .. } = &hero.media {
                if *frame_count == 0 {
                    bail!("hero sequence frameCount must be at least 1");
                }
            }
        }
        if let Some(form) = &self.form {
            if form.fields.is_empty() {
                bail!("form wiring must name at least one field");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroConfig {
    pub container_id: String,
    #[serde(default = "default_extra_scroll")]
    pub extra_scroll: f64,
    pub media: MediaWiring,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MediaWiring {
    #[serde(rename_all = "camelCase")]
    Video {
        video_id: String,
        src: String,
        #[serde(default)]
        portrait_src: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Sequence {
        image_id: String,
        url_template: String,
        frame_count: u32,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JackConfig {
    pub container_id: String,
    #[serde(default)]
    pub section_ids: Vec<String>,
}

impl JackConfig {
    /// Ledger owner id for this jack's hold on the scroll lock.
    pub fn owner_id(&self) -> String {
        format!("jack:{}", self.container_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternConfig {
    pub canvas_id: String,
    pub section_id: String,
    /// Scroll distance the pattern animates over; defaults to one viewport
    /// height at mount time.
    #[serde(default)]
    pub scroll_span: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloaderConfig {
    pub overlay_id: String,
    #[serde(default)]
    pub label_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmsConfig {
    pub space: String,
    pub access_token: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub media_base: Option<String>,
    #[serde(default)]
    pub targets: HydrationTargets,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HydrationTargets {
    #[serde(default)]
    pub values_id: Option<String>,
    #[serde(default)]
    pub rituals_id: Option<String>,
    #[serde(default)]
    pub gallery_id: Option<String>,
    #[serde(default)]
    pub faq_id: Option<String>,
    #[serde(default)]
    pub hero_heading_id: Option<String>,
    #[serde(default)]
    pub hero_subheading_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormWiring {
    pub element_id: String,
    pub portal_id: String,
    pub form_id: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub fields: Vec<FieldWiring>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldWiring {
    pub name: String,
    pub input_id: String,
}
