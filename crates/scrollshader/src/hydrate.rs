//! CMS hydration and form submission wiring.
//!
//! Each content collection hydrates independently: a failed fetch logs a
//! warning and leaves that region of the page as authored, never taking the
//! rest of the page down with it.

use anyhow::{Context, Result};
use content::{
    hutk_from_cookies, ContentClient, ContentConfig, FormClient, FormConfig, FormContext,
    FormField, FormSubmission, GalleryImage, HeroCopy, Question, Ritual, ValueCard,
    CONTENT_TYPE_GALLERY, CONTENT_TYPE_HERO, CONTENT_TYPE_QUESTION, CONTENT_TYPE_RITUAL,
    CONTENT_TYPE_VALUE,
};
use stage::ListenerRegistry;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlFormElement, HtmlInputElement, HtmlTextAreaElement, Window};

use crate::config::{
    CmsConfig, FieldWiring, FormWiring, HydrationTargets, DEFAULT_CMS_API_BASE,
    DEFAULT_FORMS_ENDPOINT,
};

const SUBMITTED_CLASS: &str = "is-submitted";
const ERROR_CLASS: &str = "has-error";

pub async fn hydrate_content(document: &Document, cfg: &CmsConfig) {
    let client = match build_client(cfg) {
        Ok(client) => client,
        Err(err) => {
            warn!("CMS client unavailable, page stays as authored: {err:#}");
            return;
        }
    };
    let targets = &cfg.targets;
    if let Some(id) = &targets.values_id {
        hydrate_values(document, &client, id).await;
    }
    if let Some(id) = &targets.rituals_id {
        hydrate_rituals(document, &client, id).await;
    }
    if let Some(id) = &targets.faq_id {
        hydrate_questions(document, &client, id).await;
    }
    if targets.hero_heading_id.is_some() || targets.hero_subheading_id.is_some() {
        hydrate_hero_copy(document, &client, targets).await;
    }
    if let Some(id) = &targets.gallery_id {
        hydrate_gallery(document, &client, id).await;
    }
}

fn build_client(cfg: &CmsConfig) -> Result<ContentClient> {
    let api_base = cfg.api_base.as_deref().unwrap_or(DEFAULT_CMS_API_BASE);
    let mut config = ContentConfig::new(
        cfg.space.clone(),
        cfg.environment.clone().unwrap_or_default(),
        cfg.access_token.clone(),
        api_base,
    )?;
    if let Some(media_base) = &cfg.media_base {
        config = config.with_media_base(media_base)?;
    }
    ContentClient::new(config)
}

async fn hydrate_values(document: &Document, client: &ContentClient, target_id: &str) {
    let entries = match client.entries(CONTENT_TYPE_VALUE).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(target = target_id, "values fetch failed: {err:#}");
            return;
        }
    };
    let Some(target) = document.get_element_by_id(target_id) else {
        warn!(target = target_id, "values target element missing");
        return;
    };
    let cards = ValueCard::collect(&entries);
    target.set_text_content(None);
    for card in &cards {
        if let Some(node) = build_value_card(document, card) {
            let _ = target.append_child(&node);
        }
    }
    debug!(count = cards.len(), "values hydrated");
}

fn build_value_card(document: &Document, card: &ValueCard) -> Option<Element> {
    let article = document.create_element("article").ok()?;
    article.set_class_name("value-card");
    let title = document.create_element("h3").ok()?;
    title.set_text_content(Some(&card.title));
    article.append_child(&title).ok()?;
    let body = document.create_element("p").ok()?;
    body.set_text_content(Some(&card.description));
    article.append_child(&body).ok()?;
    Some(article)
}

async fn hydrate_rituals(document: &Document, client: &ContentClient, target_id: &str) {
    let entries = match client.entries(CONTENT_TYPE_RITUAL).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(target = target_id, "rituals fetch failed: {err:#}");
            return;
        }
    };
    let Some(target) = document.get_element_by_id(target_id) else {
        warn!(target = target_id, "rituals target element missing");
        return;
    };
    let rituals = Ritual::collect(&entries);
    target.set_text_content(None);
    for ritual in &rituals {
        if let Some(node) = build_ritual(document, ritual) {
            let _ = target.append_child(&node);
        }
    }
    debug!(count = rituals.len(), "rituals hydrated");
}

fn build_ritual(document: &Document, ritual: &Ritual) -> Option<Element> {
    let item = document.create_element("li").ok()?;
    item.set_class_name("ritual");
    let title = document.create_element("h4").ok()?;
    title.set_text_content(Some(&ritual.title));
    item.append_child(&title).ok()?;
    let body = document.create_element("p").ok()?;
    body.set_text_content(Some(&ritual.body));
    item.append_child(&body).ok()?;
    Some(item)
}

async fn hydrate_questions(document: &Document, client: &ContentClient, target_id: &str) {
    let entries = match client.entries(CONTENT_TYPE_QUESTION).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(target = target_id, "questions fetch failed: {err:#}");
            return;
        }
    };
    let Some(target) = document.get_element_by_id(target_id) else {
        warn!(target = target_id, "questions target element missing");
        return;
    };
    let questions = Question::collect(&entries);
    target.set_text_content(None);
    for question in &questions {
        if let Some(node) = build_question(document, question) {
            let _ = target.append_child(&node);
        }
    }
    debug!(count = questions.len(), "questions hydrated");
}

fn build_question(document: &Document, question: &Question) -> Option<Element> {
    let details = document.create_element("details").ok()?;
    details.set_class_name("faq-item");
    let summary = document.create_element("summary").ok()?;
    summary.set_text_content(Some(&question.question));
    details.append_child(&summary).ok()?;
    let answer = document.create_element("p").ok()?;
    answer.set_text_content(Some(&question.answer));
    details.append_child(&answer).ok()?;
    Some(details)
}

async fn hydrate_hero_copy(document: &Document, client: &ContentClient, targets: &HydrationTargets) {
    let entries = match client.entries(CONTENT_TYPE_HERO).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!("hero copy fetch failed: {err:#}");
            return;
        }
    };
    let Some(copy) = HeroCopy::first(&entries) else {
        debug!("no hero copy published");
        return;
    };
    if let Some(id) = &targets.hero_heading_id {
        if let Some(element) = document.get_element_by_id(id) {
            element.set_text_content(Some(&copy.heading));
        }
    }
    if let Some(id) = &targets.hero_subheading_id {
        if let (Some(element), Some(subheading)) =
            (document.get_element_by_id(id), copy.subheading.as_deref())
        {
            element.set_text_content(Some(subheading));
        }
    }
    debug!("hero copy hydrated");
}

async fn hydrate_gallery(document: &Document, client: &ContentClient, target_id: &str) {
    let entries = match client.entries(CONTENT_TYPE_GALLERY).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(target = target_id, "gallery fetch failed: {err:#}");
            return;
        }
    };
    let Some(target) = document.get_element_by_id(target_id) else {
        warn!(target = target_id, "gallery target element missing");
        return;
    };
    let images = GalleryImage::collect(&entries);
    target.set_text_content(None);
    let mut shown = 0usize;
    for image in &images {
        let asset = match client.asset(&image.asset_id).await {
            Ok(asset) => asset,
            Err(err) => {
                warn!(asset = %image.asset_id, "gallery asset fetch failed: {err:#}");
                continue;
            }
        };
        let url = match client.resolve_media_url(&asset.fields.file.url) {
            Ok(url) => url,
            Err(err) => {
                warn!(asset = %image.asset_id, "gallery asset url invalid: {err:#}");
                continue;
            }
        };
        let alt = image
            .title
            .clone()
            .or_else(|| asset.fields.title.clone())
            .unwrap_or_default();
        if let Some(node) = build_gallery_figure(document, url.as_str(), &alt) {
            let _ = target.append_child(&node);
            shown += 1;
        }
    }
    debug!(count = shown, "gallery hydrated");
}

fn build_gallery_figure(document: &Document, url: &str, alt: &str) -> Option<Element> {
    let figure = document.create_element("figure").ok()?;
    figure.set_class_name("gallery-item");
    let img = document
        .create_element("img")
        .ok()?
        .dyn_into::<web_sys::HtmlImageElement>()
        .ok()?;
    img.set_src(url);
    img.set_alt(alt);
    figure.append_child(&img).ok()?;
    if !alt.is_empty() {
        let caption = document.create_element("figcaption").ok()?;
        caption.set_text_content(Some(alt));
        figure.append_child(&caption).ok()?;
    }
    Some(figure)
}

/// Wires a submit listener that posts the named fields. The submission is
/// attempted once; failure marks the form and keeps the user's input intact.
pub fn wire_form(
    window: &Window,
    document: &Document,
    wiring: &FormWiring,
    listeners: &mut ListenerRegistry,
) -> Result<()> {
    let form: HtmlFormElement = stage::dom::typed_element_by_id(document, &wiring.element_id, "form")?;
    let endpoint = wiring.endpoint.as_deref().unwrap_or(DEFAULT_FORMS_ENDPOINT);
    let form_config = FormConfig::new(&wiring.portal_id, &wiring.form_id, endpoint)?;
    let form_client = FormClient::new().context("building form client")?;

    let fields = wiring.fields.clone();
    let window = window.clone();
    let document = document.clone();
    let submit_form = form.clone();
    listeners.add(form.as_ref(), "submit", move |event| {
        event.prevent_default();
        let submission = collect_submission(&window, &document, &fields);
        let client = form_client.clone();
        let config = form_config.clone();
        let marked = submit_form.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match client.submit(&config, &submission).await {
                Ok(()) => {
                    let _ = marked.class_list().remove_1(ERROR_CLASS);
                    let _ = marked.class_list().add_1(SUBMITTED_CLASS);
                }
                Err(err) => {
                    warn!("form submission failed, input preserved: {err:#}");
                    let _ = marked.class_list().add_1(ERROR_CLASS);
                }
            }
        });
    })?;
    Ok(())
}

fn collect_submission(
    window: &Window,
    document: &Document,
    fields: &[FieldWiring],
) -> FormSubmission {
    let mut collected = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(element) = document.get_element_by_id(&field.input_id) else {
            warn!(input = %field.input_id, "form field element missing");
            continue;
        };
        let value = if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
            area.value()
        } else {
            warn!(input = %field.input_id, "form field is not an input");
            continue;
        };
        collected.push(FormField {
            name: field.name.clone(),
            value,
        });
    }
    let page_uri = window.location().href().unwrap_or_default();
    // document.cookie lives on HtmlDocument in the bindings.
    let hutk = document
        .dyn_ref::<web_sys::HtmlDocument>()
        .and_then(|html_document| html_document.cookie().ok())
        .and_then(|cookies| hutk_from_cookies(&cookies));
    FormSubmission {
        fields: collected,
        context: FormContext {
            page_uri,
            page_name: document.title(),
            hutk,
        },
    }
}
