//! Bootstrap and teardown for the page runtime.
//!
//! Mount order matters: the preloader engages the scroll lock before
//! anything else can move the page, the hero source is negotiated before the
//! binder attaches to it, and CMS hydration runs last because it only
//! rewrites passive content. `dispose` unwinds in reverse and then sweeps
//! the lock ledger so no owner survives the page.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use engine::{
    negotiate, webm_variant, BoundaryCrossing, MediaSource, ScrollLockLedger, SourceSet,
};
use profiles::{Capabilities, DeviceProfile, ProfileSet};
use stage::{
    dom, ListenerRegistry, LockMirror, MediaBinding, PatternRenderer, PreloaderController,
    ScrollJackController, ScrollTriggerBinder, ScrubOptions, SequenceBinding, VideoBinding,
};
use tracing::{debug, error, info, warn};
use web_sys::{Document, HtmlElement, HtmlMediaElement, HtmlVideoElement, Window};

use crate::config::{
    HeroConfig, JackConfig, MediaWiring, PageConfig, PatternConfig, PreloaderConfig,
    CONFIG_ELEMENT_ID,
};
use crate::hydrate;

const AFTER_MEDIA_CLASS: &str = "is-beyond";
const WEBM_MIME: &str = "video/webm; codecs=\"vp8, vorbis\"";

thread_local! {
    static APP: RefCell<Option<App>> = RefCell::new(None);
}

pub fn initialise_tracing() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

/// Reads the page config and mounts the runtime. Runs as a detached task;
/// the mounted [`App`] is parked in module state until [`teardown`].
pub fn launch() {
    wasm_bindgen_futures::spawn_local(async {
        match boot().await {
            Ok(app) => {
                APP.with(|slot| *slot.borrow_mut() = Some(app));
                info!("scrollshader runtime mounted");
            }
            Err(err) => error!("bootstrap failed: {err:#}"),
        }
    });
}

pub fn teardown() {
    let app = APP.with(|slot| slot.borrow_mut().take());
    if let Some(mut app) = app {
        app.dispose();
        info!("scrollshader runtime unmounted");
    }
}

pub struct App {
    preloader: Option<PreloaderController>,
    binder: Option<ScrollTriggerBinder>,
    jacks: Vec<ScrollJackController>,
    pattern: Option<PatternRenderer>,
    form_listeners: ListenerRegistry,
    ledger: Rc<RefCell<ScrollLockLedger>>,
    mirror: Rc<LockMirror>,
}

impl App {
    /// Reverses the mount: controllers unwind newest-first, then any lock
    /// owner that survived its controller is force-released.
    pub fn dispose(&mut self) {
        self.form_listeners.clear();
        if let Some(mut pattern) = self.pattern.take() {
            pattern.dispose();
        }
        for mut jack in self.jacks.drain(..) {
            jack.dispose();
        }
        if let Some(mut binder) = self.binder.take() {
            binder.dispose();
        }
        if let Some(mut preloader) = self.preloader.take() {
            preloader.dispose();
        }
        let edge = self.ledger.borrow_mut().release_all();
        if let Some(edge) = edge {
            self.mirror.apply(edge);
        }
        self.mirror.reconcile(&self.ledger.borrow());
    }
}

struct PreparedHero {
    container: HtmlElement,
    binding: MediaBinding,
}

async fn boot() -> Result<App> {
    let window = dom::window()?;
    let document = dom::document(&window)?;
    let config = read_page_config(&document)?;
    let capabilities = read_capabilities(&window);
    let profile = ProfileSet::builtin()
        .context("loading built-in device profiles")?
        .resolve_for(&capabilities);
    info!(
        device = ?capabilities.device,
        browser = ?capabilities.browser,
        "device profile resolved"
    );

    let ledger = Rc::new(RefCell::new(ScrollLockLedger::new()));
    let mirror = Rc::new(LockMirror::new(&document)?);

    let hero = match &config.hero {
        Some(hero_config) => {
            Some(prepare_hero(&document, &capabilities, hero_config).await?)
        }
        None => None,
    };

    let preloader = match &config.preloader {
        Some(preloader_config) => Some(mount_preloader(
            &window,
            &document,
            preloader_config,
            &profile,
            hero.as_ref().and_then(|hero| hero.binding.media_element().cloned()),
            Rc::clone(&ledger),
            Rc::clone(&mirror),
        )?),
        None => None,
    };

    let binder = match (&config.hero, hero) {
        (Some(hero_config), Some(prepared)) => {
            Some(mount_binder(&window, hero_config, prepared, &profile)?)
        }
        _ => None,
    };

    let jacks = mount_jacks(&window, &document, &config.jacks, &profile, &ledger, &mirror);

    let pattern = match &config.pattern {
        Some(pattern_config) => mount_pattern(&window, &document, pattern_config)?,
        None => None,
    };

    let mut form_listeners = ListenerRegistry::new();
    if let Some(form) = &config.form {
        if let Err(err) = hydrate::wire_form(&window, &document, form, &mut form_listeners) {
            warn!("form wiring failed: {err:#}");
        }
    }

    if let Some(cms) = &config.cms {
        hydrate::hydrate_content(&document, cms).await;
    }

    Ok(App {
        preloader,
        binder,
        jacks,
        pattern,
        form_listeners,
        ledger,
        mirror,
    })
}

fn read_page_config(document: &Document) -> Result<PageConfig> {
    let Some(element) = document.get_element_by_id(CONFIG_ELEMENT_ID) else {
        info!("no page config element, mounting nothing");
        return Ok(PageConfig::default());
    };
    let raw = element.text_content().unwrap_or_default();
    PageConfig::from_json(&raw)
}

fn read_capabilities(window: &Window) -> Capabilities {
    let agent = window.navigator().user_agent().unwrap_or_default();
    Capabilities::from_user_agent(&agent)
}

async fn prepare_hero(
    document: &Document,
    capabilities: &Capabilities,
    hero: &HeroConfig,
) -> Result<PreparedHero> {
    let container: HtmlElement =
        dom::typed_element_by_id(document, &hero.container_id, "container element")?;
    let binding = match &hero.media {
        MediaWiring::Video {
            video_id,
            src,
            portrait_src,
        } => {
            let video: HtmlVideoElement =
                dom::typed_element_by_id(document, video_id, "video element")?;
            let sources = SourceSet {
                landscape: src.clone(),
                portrait: portrait_src.clone(),
            };
            let chosen = negotiate_source(&video, &sources, capabilities).await;
            info!(
                url = %chosen.url,
                container = ?chosen.container,
                orientation = ?chosen.orientation,
                "hero source selected"
            );
            video.set_muted(true);
            let _ = video.set_attribute("playsinline", "");
            let _ = video.set_attribute("preload", "auto");
            video.set_src(&chosen.url);
            MediaBinding::Video(VideoBinding::new(video))
        }
        MediaWiring::Sequence {
            image_id,
            url_template,
            frame_count,
        } => {
            let image = dom::typed_element_by_id(document, image_id, "image element")?;
            MediaBinding::Sequence(SequenceBinding::new(image, url_template.clone(), *frame_count)?)
        }
    };
    Ok(PreparedHero { container, binding })
}

/// Desktop browsers that can decode WebM get the transcoded variant, but
/// only after a HEAD probe confirms it exists. Everything else takes the
/// canonical mp4.
async fn negotiate_source(
    video: &HtmlVideoElement,
    sources: &SourceSet,
    capabilities: &Capabilities,
) -> MediaSource {
    let webm_supported = !video.can_play_type(WEBM_MIME).is_empty();
    let probe_ok = if !capabilities.is_mobile() && webm_supported {
        match webm_variant(&sources.landscape) {
            Some(variant) => content::probe_head(&reqwest::Client::new(), &variant).await,
            None => false,
        }
    } else {
        false
    };
    negotiate(sources, capabilities, webm_supported, probe_ok)
}

#[allow(clippy::too_many_arguments)]
fn mount_preloader(
    window: &Window,
    document: &Document,
    cfg: &PreloaderConfig,
    profile: &DeviceProfile,
    video: Option<HtmlMediaElement>,
    ledger: Rc<RefCell<ScrollLockLedger>>,
    mirror: Rc<LockMirror>,
) -> Result<PreloaderController> {
    let overlay: HtmlElement =
        dom::typed_element_by_id(document, &cfg.overlay_id, "overlay element")?;
    let label = match &cfg.label_id {
        Some(id) => Some(dom::typed_element_by_id::<HtmlElement>(
            document,
            id,
            "label element",
        )?),
        None => None,
    };
    Ok(PreloaderController::mount(
        window,
        overlay,
        label,
        video.as_ref(),
        profile,
        ledger,
        mirror,
        || info!("page released to the visitor"),
    )?)
}

fn mount_binder(
    window: &Window,
    hero_config: &HeroConfig,
    prepared: PreparedHero,
    profile: &DeviceProfile,
) -> Result<ScrollTriggerBinder> {
    let after_target = prepared.container.clone();
    let options = ScrubOptions::new(hero_config.extra_scroll).after_media(move |crossing| {
        let classes = after_target.class_list();
        let result = match crossing {
            BoundaryCrossing::Entered => classes.add_1(AFTER_MEDIA_CLASS),
            BoundaryCrossing::Exited => classes.remove_1(AFTER_MEDIA_CLASS),
        };
        if result.is_err() {
            debug!("failed to toggle after-media class");
        }
    });
    Ok(ScrollTriggerBinder::mount(
        window,
        prepared.container,
        prepared.binding,
        profile,
        options,
    )?)
}

fn mount_jacks(
    window: &Window,
    document: &Document,
    configs: &[JackConfig],
    profile: &DeviceProfile,
    ledger: &Rc<RefCell<ScrollLockLedger>>,
    mirror: &Rc<LockMirror>,
) -> Vec<ScrollJackController> {
    let mut jacks = Vec::new();
    for config in configs {
        match mount_jack(window, document, config, profile, ledger, mirror) {
            Ok(jack) => jacks.push(jack),
            Err(err) => warn!(container = %config.container_id, "jack skipped: {err:#}"),
        }
    }
    jacks
}

fn mount_jack(
    window: &Window,
    document: &Document,
    config: &JackConfig,
    profile: &DeviceProfile,
    ledger: &Rc<RefCell<ScrollLockLedger>>,
    mirror: &Rc<LockMirror>,
) -> Result<ScrollJackController> {
    let container: HtmlElement =
        dom::typed_element_by_id(document, &config.container_id, "container element")?;
    let mut sections = Vec::with_capacity(config.section_ids.len());
    for id in &config.section_ids {
        sections.push(dom::typed_element_by_id::<HtmlElement>(
            document,
            id,
            "section element",
        )?);
    }
    let owner_id = config.owner_id();
    Ok(ScrollJackController::mount(
        window,
        container,
        sections,
        profile,
        Rc::clone(ledger),
        Rc::clone(mirror),
        &owner_id,
        Some(Box::new(|| debug!("section walkthrough finished"))),
    )?)
}

fn mount_pattern(
    window: &Window,
    document: &Document,
    cfg: &PatternConfig,
) -> Result<Option<PatternRenderer>> {
    let canvas = dom::typed_element_by_id(document, &cfg.canvas_id, "canvas element")?;
    let section: HtmlElement =
        dom::typed_element_by_id(document, &cfg.section_id, "section element")?;
    let span = cfg
        .scroll_span
        .unwrap_or_else(|| dom::viewport_height(window).max(1.0));
    Ok(PatternRenderer::mount(window, canvas, section, span)?)
}
