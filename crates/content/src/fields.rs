use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::client::Entry;

pub const CONTENT_TYPE_VALUE: &str = "value";
pub const CONTENT_TYPE_RITUAL: &str = "ritual";
pub const CONTENT_TYPE_QUESTION: &str = "question";
pub const CONTENT_TYPE_HERO: &str = "heroText";
pub const CONTENT_TYPE_GALLERY: &str = "galleryImage";

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("entry '{id}' has malformed fields: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCard {
    pub title: String,
    pub description: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ritual {
    pub title: String,
    pub body: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub question: String,
    pub answer: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroCopy {
    pub heading: String,
    pub subheading: Option<String>,
}

/// A gallery slot before asset resolution; the image URL still has to be
/// looked up through the asset link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub title: Option<String>,
    pub asset_id: String,
    pub order: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueCardFields {
    title: String,
    description: String,
    #[serde(default)]
    order_number: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RitualFields {
    title: String,
    body: String,
    #[serde(default)]
    order_number: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionFields {
    question: String,
    answer: String,
    #[serde(default)]
    order_number: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeroCopyFields {
    heading: String,
    #[serde(default)]
    subheading: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GalleryImageFields {
    #[serde(default)]
    title: Option<String>,
    image: Value,
    #[serde(default)]
    order_number: i64,
}

/// Pull the linked asset id out of a CMS link value
/// (`{"sys": {"type": "Link", "linkType": "Asset", "id": …}}`).
pub fn asset_link_id(value: &Value) -> Option<&str> {
    value.get("sys")?.get("id")?.as_str()
}

fn decode_fields<T: DeserializeOwned>(entry: &Entry) -> Result<T, FieldError> {
    serde_json::from_value(Value::Object(entry.fields.clone())).map_err(|source| {
        FieldError::Malformed {
            id: entry.sys.id.clone(),
            source,
        }
    })
}

/// Decode every entry that has the expected shape, dropping and logging the
/// rest. One broken entry must not take the whole section down.
fn decode_lossy<T: DeserializeOwned>(entries: &[Entry], kind: &str) -> Vec<T> {
    let mut decoded = Vec::with_capacity(entries.len());
    for entry in entries {
        match decode_fields::<T>(entry) {
            Ok(fields) => decoded.push(fields),
            Err(err) => warn!(kind, error = %err, "skipping malformed CMS entry"),
        }
    }
    decoded
}

impl ValueCard {
    pub fn collect(entries: &[Entry]) -> Vec<ValueCard> {
        let mut cards: Vec<ValueCard> = decode_lossy::<ValueCardFields>(entries, "value")
            .into_iter()
            .map(|f| ValueCard {
                title: f.title,
                description: f.description,
                order: f.order_number,
            })
            .collect();
        cards.sort_by_key(|card| card.order);
        cards
    }
}

impl Ritual {
    pub fn collect(entries: &[Entry]) -> Vec<Ritual> {
        let mut rituals: Vec<Ritual> = decode_lossy::<RitualFields>(entries, "ritual")
            .into_iter()
            .map(|f| Ritual {
                title: f.title,
                body: f.body,
                order: f.order_number,
            })
            .collect();
        rituals.sort_by_key(|ritual| ritual.order);
        rituals
    }
}

impl Question {
    pub fn collect(entries: &[Entry]) -> Vec<Question> {
        let mut questions: Vec<Question> = decode_lossy::<QuestionFields>(entries, "question")
            .into_iter()
            .map(|f| Question {
                question: f.question,
                answer: f.answer,
                order: f.order_number,
            })
            .collect();
        questions.sort_by_key(|question| question.order);
        questions
    }
}

impl HeroCopy {
    /// The hero copy is a singleton content type; the first decodable entry
    /// wins.
    pub fn first(entries: &[Entry]) -> Option<HeroCopy> {
        decode_lossy::<HeroCopyFields>(entries, "heroText")
            .into_iter()
            .next()
            .map(|f| HeroCopy {
                heading: f.heading,
                subheading: f.subheading,
            })
    }
}

impl GalleryImage {
    pub fn collect(entries: &[Entry]) -> Vec<GalleryImage> {
        let mut images: Vec<GalleryImage> = decode_lossy::<GalleryImageFields>(entries, "gallery")
            .into_iter()
            .filter_map(|f| match asset_link_id(&f.image) {
                Some(id) => Some(GalleryImage {
                    title: f.title,
                    asset_id: id.to_string(),
                    order: f.order_number,
                }),
                None => {
                    warn!(title = ?f.title, "gallery entry has no usable asset link");
                    None
                }
            })
            .collect();
        images.sort_by_key(|image| image.order);
        images
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries_from(json: &str) -> Vec<Entry> {
        serde_json::from_str::<Vec<Entry>>(json).unwrap()
    }

    #[test]
    fn value_cards_sort_by_order_number() {
        let entries = entries_from(
            r#"[
                {"sys": {"id": "b"}, "fields": {"title": "Craft", "description": "Slow.", "orderNumber": 2}},
                {"sys": {"id": "c"}, "fields": {"title": "Earth", "description": "Raw.", "orderNumber": 3}},
                {"sys": {"id": "a"}, "fields": {"title": "Calm", "description": "Quiet.", "orderNumber": 1}}
            ]"#,
        );
        let cards = ValueCard::collect(&entries);
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Calm", "Craft", "Earth"]);
    }

    #[test]
    fn malformed_entries_are_dropped_not_fatal() {
        let entries = entries_from(
            r#"[
                {"sys": {"id": "ok"}, "fields": {"title": "Calm", "description": "Quiet.", "orderNumber": 1}},
                {"sys": {"id": "broken"}, "fields": {"title": 42}}
            ]"#,
        );
        let cards = ValueCard::collect(&entries);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].title, "Calm");
    }

    #[test]
    fn missing_order_number_defaults_to_zero() {
        let entries = entries_from(
            r#"[
                {"sys": {"id": "x"}, "fields": {"question": "Why?", "answer": "Because.", "orderNumber": 5}},
                {"sys": {"id": "y"}, "fields": {"question": "How?", "answer": "Slowly."}}
            ]"#,
        );
        let questions = Question::collect(&entries);
        assert_eq!(questions[0].question, "How?");
        assert_eq!(questions[0].order, 0);
    }

    #[test]
    fn hero_copy_takes_the_first_decodable_entry() {
        let entries = entries_from(
            r#"[
                {"sys": {"id": "bad"}, "fields": {}},
                {"sys": {"id": "good"}, "fields": {"heading": "Still water", "subheading": "Runs deep"}}
            ]"#,
        );
        let hero = HeroCopy::first(&entries).unwrap();
        assert_eq!(hero.heading, "Still water");
        assert_eq!(hero.subheading.as_deref(), Some("Runs deep"));
    }

    #[test]
    fn gallery_images_need_an_asset_link() {
        let entries = entries_from(
            r#"[
                {"sys": {"id": "g2"}, "fields": {"title": "Second", "orderNumber": 2,
                    "image": {"sys": {"type": "Link", "linkType": "Asset", "id": "asset-2"}}}},
                {"sys": {"id": "g1"}, "fields": {"orderNumber": 1,
                    "image": {"sys": {"type": "Link", "linkType": "Asset", "id": "asset-1"}}}},
                {"sys": {"id": "g3"}, "fields": {"orderNumber": 3, "image": {}}}
            ]"#,
        );
        let images = GalleryImage::collect(&entries);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].asset_id, "asset-1");
        assert_eq!(images[0].title, None);
        assert_eq!(images[1].asset_id, "asset-2");
    }

    #[test]
    fn asset_link_id_reads_the_sys_id() {
        let value: Value =
            serde_json::from_str(r#"{"sys": {"type": "Link", "linkType": "Asset", "id": "a-9"}}"#)
                .unwrap();
        assert_eq!(asset_link_id(&value), Some("a-9"));
        assert_eq!(asset_link_id(&Value::Null), None);
    }
}
