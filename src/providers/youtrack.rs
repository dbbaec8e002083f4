use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use super::IssueSource;
use crate::config::YouTrackConfig;
use crate::error::check_response;
use crate::model::issue::{Attachment, Comment, CustomFields, FieldValue, Issue};

const SYSTEM: &str = "YouTrack";

/// Field selection for a full issue snapshot. The custom field value keys
/// cover every value type YouTrack can return.
const ISSUE_FIELDS: &str = "idReadable,summary,description,created,reporter(login),\
customFields(name,value(avatarUrl,buildLink,color(id),fullName,id,isResolved,\
localizedName,login,minutes,name,presentation,text)),\
comments(created,author(login),text),attachments(name,base64Content,url)";

pub struct YouTrackClient {
    base_url: String,
    auth_header: Option<String>,
    client: reqwest::Client,
}

impl YouTrackClient {
    pub fn new(config: &YouTrackConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to build YouTrack HTTP client")?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header: config
                .token
                .as_deref()
                .filter(|t| !t.is_empty())
                .map(|t| format!("Bearer {t}")),
            client,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(url).header("Accept", "application/json");
        match &self.auth_header {
            Some(auth) => req.header("Authorization", auth),
            None => req,
        }
    }

    /// Attachment URLs come back relative to the base URL (`/api/files/..`),
    /// which may itself carry a path such as `/youtrack`.
    fn resolve_url(&self, url: &str) -> Result<reqwest::Url> {
        let full = if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            url.to_string()
        };
        reqwest::Url::parse(&full).with_context(|| format!("Invalid attachment URL {url}"))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct YtIssue {
    id_readable: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    created: Option<i64>,
    reporter: Option<YtUser>,
    #[serde(default)]
    custom_fields: Vec<YtCustomField>,
    #[serde(default)]
    comments: Vec<YtComment>,
    #[serde(default)]
    attachments: Vec<YtAttachment>,
}

#[derive(Deserialize)]
struct YtUser {
    login: Option<String>,
}

#[derive(Deserialize)]
struct YtCustomField {
    name: String,
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
struct YtComment {
    created: Option<i64>,
    author: Option<YtUser>,
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct YtAttachment {
    name: String,
    base64_content: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct YtIssueId {
    id_readable: String,
}

impl YtIssue {
    fn into_issue(self, requested_id: &str) -> Issue {
        let custom_fields = self
            .custom_fields
            .into_iter()
            .map(|f| (f.name, FieldValue(f.value)))
            .collect::<CustomFields>();

        let comments = self
            .comments
            .into_iter()
            .map(|c| Comment {
                author: c.author.and_then(|a| a.login),
                created: c.created.unwrap_or_default(),
                text: c.text.unwrap_or_default(),
            })
            .collect();

        let attachments = self
            .attachments
            .into_iter()
            .map(|a| Attachment {
                name: a.name,
                base64_content: a.base64_content,
                url: a.url,
            })
            .collect();

        Issue {
            id: self.id_readable.unwrap_or_else(|| requested_id.to_string()),
            summary: self.summary.unwrap_or_default(),
            description: self.description,
            created: self.created.unwrap_or_default(),
            reporter: self.reporter.and_then(|r| r.login),
            custom_fields,
            comments,
            attachments,
        }
    }
}

/// Decode the payload of a `data:<mime>;base64,<payload>` URL (or a bare payload).
pub fn decode_data_url(content: &str) -> Result<Vec<u8>> {
    let payload = content.split_once(',').map_or(content, |(_, data)| data);
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .context("Attachment content is not valid base64")
}

#[async_trait]
impl IssueSource for YouTrackClient {
    fn name(&self) -> &str {
        SYSTEM
    }

    fn issue_url(&self, id: &str) -> String {
        format!("{}/issue/{id}", self.base_url)
    }

    async fn fetch_issue(&self, id: &str) -> Result<Issue> {
        let url = format!("{}/api/issues/{}", self.base_url, urlencoding::encode(id));
        tracing::debug!(issue = id, "fetching YouTrack issue");

        let resp = self
            .get(&url)
            .query(&[("fields", ISSUE_FIELDS)])
            .send()
            .await
            .context("YouTrack API request failed")?;
        let resp = check_response(SYSTEM, &format!("issue {id}"), resp).await?;

        let issue: YtIssue = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse YouTrack issue {id}"))?;
        Ok(issue.into_issue(id))
    }

    async fn list_issue_ids(&self, project: &str, limit: usize) -> Result<Vec<String>> {
        let url = format!("{}/api/issues", self.base_url);
        let top = limit.to_string();
        let query = format!("project: {project}");

        let resp = self
            .get(&url)
            .query(&[
                ("fields", "idReadable"),
                ("$top", top.as_str()),
                ("query", query.as_str()),
            ])
            .send()
            .await
            .context("YouTrack API request failed")?;
        let resp = check_response(SYSTEM, &format!("project {project}"), resp).await?;

        let ids: Vec<YtIssueId> = resp
            .json()
            .await
            .context("Failed to parse YouTrack issue list")?;
        Ok(ids.into_iter().map(|i| i.id_readable).collect())
    }

    async fn download_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>> {
        if let Some(content) = attachment.base64_content.as_deref() {
            return decode_data_url(content)
                .with_context(|| format!("Failed to decode attachment {}", attachment.name));
        }

        let url = attachment
            .url
            .as_deref()
            .with_context(|| format!("Attachment {} has neither content nor URL", attachment.name))?;
        let url = self.resolve_url(url)?;

        let resp = self
            .get(url.as_str())
            .send()
            .await
            .context("YouTrack attachment download failed")?;
        let resp = check_response(SYSTEM, &format!("attachment {}", attachment.name), resp).await?;
        let bytes = resp.bytes().await.context("Failed to read attachment body")?;
        Ok(bytes.to_vec())
    }
}
