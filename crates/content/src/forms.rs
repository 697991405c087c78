use anyhow::{bail, Context, Result};
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{debug, warn};

// Tracking cookie set by the marketing provider's analytics script.
const TRACKING_COOKIE: &str = "hubspotutk";

#[derive(Debug, Clone)]
pub struct FormConfig {
    pub portal_id: String,
    pub form_id: String,
    pub endpoint_base: Url,
}

impl FormConfig {
    pub fn new(
        portal_id: impl Into<String>,
        form_id: impl Into<String>,
        endpoint_base: &str,
    ) -> Result<Self> {
        let portal_id = portal_id.into();
        let form_id = form_id.into();
        if portal_id.trim().is_empty() || form_id.trim().is_empty() {
            bail!("form portal id and form id must not be empty");
        }
        let endpoint_base = Url::parse(endpoint_base)
            .with_context(|| format!("form endpoint base '{endpoint_base}'"))?;
        Ok(Self {
            portal_id,
            form_id,
            endpoint_base,
        })
    }

    fn submit_url(&self) -> Result<Url> {
        let mut url = self.endpoint_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("invalid form endpoint base"))?;
            segments.extend(["submissions", "v3", "integration", "submit"]);
            segments.push(&self.portal_id);
            segments.push(&self.form_id);
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FormContext {
    pub page_uri: String,
    pub page_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hutk: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FormSubmission {
    pub fields: Vec<FormField>,
    pub context: FormContext,
}

/// Extract the marketing tracking token from a raw `document.cookie` string.
pub fn hutk_from_cookies(cookies: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == TRACKING_COOKIE {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

#[derive(Debug, Clone)]
pub struct FormClient {
    http: Client,
}

impl FormClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self { http })
    }

    /// One POST, no retries. The caller keeps the form data around so the
    /// visitor can resubmit by hand after a failure.
    pub async fn submit(&self, config: &FormConfig, submission: &FormSubmission) -> Result<()> {
        let url = config.submit_url()?;
        debug!(form = %config.form_id, "submitting marketing form");
        let response = self
            .http
            .post(url.clone())
            .json(submission)
            .send()
            .await
            .with_context(|| format!("posting form to {url}"))?;
        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, form = %config.form_id, "form endpoint rejected the submission");
            bail!("form endpoint answered {status}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_url_includes_portal_and_form() {
        let config = FormConfig::new("424242", "f-0001", "https://forms.example.com").unwrap();
        let url = config.submit_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://forms.example.com/submissions/v3/integration/submit/424242/f-0001"
        );
    }

    #[test]
    fn rejects_blank_ids() {
        assert!(FormConfig::new("", "f", "https://forms.example.com").is_err());
        assert!(FormConfig::new("p", "  ", "https://forms.example.com").is_err());
    }

    #[test]
    fn submission_serializes_to_the_wire_shape() {
        let submission = FormSubmission {
            fields: vec![
                FormField {
                    name: "email".into(),
                    value: "visitor@example.com".into(),
                },
                FormField {
                    name: "firstname".into(),
                    value: "Ada".into(),
                },
            ],
            context: FormContext {
                page_uri: "https://example.com/".into(),
                page_name: "Home".into(),
                hutk: Some("abc123".into()),
            },
        };

        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(value["fields"][0]["name"], "email");
        assert_eq!(value["fields"][1]["value"], "Ada");
        assert_eq!(value["context"]["pageUri"], "https://example.com/");
        assert_eq!(value["context"]["pageName"], "Home");
        assert_eq!(value["context"]["hutk"], "abc123");
    }

    #[test]
    fn absent_tracking_token_is_omitted_from_the_payload() {
        let submission = FormSubmission {
            fields: vec![],
            context: FormContext {
                page_uri: "https://example.com/".into(),
                page_name: "Home".into(),
                hutk: None,
            },
        };
        let value = serde_json::to_value(&submission).unwrap();
        assert!(value["context"].get("hutk").is_none());
    }

    #[test]
    fn finds_the_tracking_cookie_among_others() {
        let cookies = "session=xyz; hubspotutk=token-99 ; theme=dark";
        assert_eq!(hutk_from_cookies(cookies).as_deref(), Some("token-99"));
    }

    #[test]
    fn missing_or_empty_tracking_cookie_yields_none() {
        assert_eq!(hutk_from_cookies("session=xyz; theme=dark"), None);
        assert_eq!(hutk_from_cookies("hubspotutk="), None);
        assert_eq!(hutk_from_cookies(""), None);
    }
}
