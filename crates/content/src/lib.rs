mod client;
mod fields;
mod forms;

pub use client::{
    probe_head, Asset, AssetFields, AssetFile, ContentClient, ContentConfig, Entry, EntrySys,
};
pub use fields::{
    asset_link_id, GalleryImage, HeroCopy, Question, Ritual, ValueCard, CONTENT_TYPE_GALLERY,
    CONTENT_TYPE_HERO, CONTENT_TYPE_QUESTION, CONTENT_TYPE_RITUAL, CONTENT_TYPE_VALUE,
};
pub use forms::{
    hutk_from_cookies, FormClient, FormConfig, FormContext, FormField, FormSubmission,
};
