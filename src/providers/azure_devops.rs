use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use super::WorkItemSink;
use crate::config::AzureDevOpsConfig;
use crate::error::check_response;
use crate::model::operation::PatchOperation;
use crate::model::work_item::WorkItem;

const SYSTEM: &str = "Azure DevOps";
const API_VERSION: &str = "6.0";
const COMMENTS_API_VERSION: &str = "6.0-preview.3";
const JSON_PATCH: &str = "application/json-patch+json";

pub struct AzureDevOpsClient {
    /// `{organization}/{project}/_apis/wit`
    base_url: String,
    auth_header: String,
    work_item_type: String,
    client: reqwest::Client,
}

impl AzureDevOpsClient {
    pub fn new(config: &AzureDevOpsConfig) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{}", config.token));
        Self {
            base_url: format!(
                "{}/{}/_apis/wit",
                config.organization.trim_end_matches('/'),
                config.project
            ),
            auth_header: format!("Basic {encoded}"),
            work_item_type: config.work_item_type.clone(),
            client: reqwest::Client::new(),
        }
    }

    async fn send_patch(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
        ops: &[PatchOperation],
    ) -> Result<reqwest::Response> {
        let body = serde_json::to_vec(ops).context("Failed to encode patch document")?;
        let resp = req
            .header("Authorization", &self.auth_header)
            .header("Content-Type", JSON_PATCH)
            .body(body)
            .send()
            .await
            .context("Azure DevOps API request failed")?;
        Ok(check_response(SYSTEM, what, resp).await?)
    }
}

#[derive(Deserialize)]
struct CreatedWorkItem {
    id: Option<u64>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct AttachmentReference {
    url: String,
}

#[async_trait]
impl WorkItemSink for AzureDevOpsClient {
    fn name(&self) -> &str {
        SYSTEM
    }

    async fn create_work_item(&self, ops: &[PatchOperation]) -> Result<WorkItem> {
        let url = format!(
            "{}/workitems/${}?api-version={API_VERSION}",
            self.base_url,
            urlencoding::encode(&self.work_item_type)
        );
        let resp = self
            .send_patch(self.client.post(&url), "work item type", ops)
            .await?;

        let created: CreatedWorkItem = resp
            .json()
            .await
            .context("Failed to parse Azure DevOps work item response")?;
        let id = created
            .id
            .context("Azure DevOps response did not contain a work item id")?;
        Ok(WorkItem {
            id,
            url: created.url,
        })
    }

    async fn update_work_item(&self, id: u64, ops: &[PatchOperation]) -> Result<()> {
        let url = format!("{}/workitems/{id}?api-version={API_VERSION}", self.base_url);
        self.send_patch(self.client.patch(&url), &format!("work item {id}"), ops)
            .await?;
        Ok(())
    }

    async fn add_comment(&self, id: u64, text: &str) -> Result<()> {
        let url = format!(
            "{}/workItems/{id}/comments?api-version={COMMENTS_API_VERSION}",
            self.base_url
        );
        let resp = self
            .client
            .post(&url)
            .header("Authorization", &self.auth_header)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .context("Azure DevOps API request failed")?;
        check_response(SYSTEM, &format!("work item {id}"), resp).await?;
        Ok(())
    }

    async fn upload_attachment(&self, file_name: &str, content: Vec<u8>) -> Result<String> {
        let url = format!("{}/attachments", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("fileName", file_name), ("api-version", API_VERSION)])
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/octet-stream")
            .body(content)
            .send()
            .await
            .context("Azure DevOps attachment upload failed")?;
        let resp = check_response(SYSTEM, "attachments endpoint", resp).await?;

        let reference: AttachmentReference = resp
            .json()
            .await
            .context("Failed to parse Azure DevOps attachment response")?;
        Ok(reference.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;
    use wiremock::matchers::{body_bytes, body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AzureDevOpsClient {
        AzureDevOpsClient::new(&AzureDevOpsConfig {
            organization: format!("{}/", server.uri()),
            project: "Boards".into(),
            token: "pat".into(),
            work_item_type: "Task".into(),
        })
    }

    #[tokio::test]
    async fn create_posts_json_patch_with_basic_auth() {
        let server = MockServer::start().await;
        let ops = vec![PatchOperation::set_field("System.Title", "Hello")];
        Mock::given(method("POST"))
            .and(path("/Boards/_apis/wit/workitems/$Task"))
            .and(query_param("api-version", "6.0"))
            // base64(":pat")
            .and(header("Authorization", "Basic OnBhdA=="))
            .and(header("Content-Type", JSON_PATCH))
            .and(body_json(&ops))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 17, "url": "https://x/17"})),
            )
            .mount(&server)
            .await;

        let item = client(&server).create_work_item(&ops).await.unwrap();
        assert_eq!(item.id, 17);
        assert_eq!(item.url.as_deref(), Some("https://x/17"));
    }

    #[tokio::test]
    async fn create_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Boards/_apis/wit/workitems/$Task"))
            .respond_with(ResponseTemplate::new(400).set_body_string("TF401320: Rule Error for field Title"))
            .mount(&server)
            .await;

        let err = client(&server).create_work_item(&[]).await.unwrap_err();
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert!(matches!(api, ApiError::Rejected { .. }));
        assert!(err.to_string().contains("TF401320"));
    }

    #[tokio::test]
    async fn create_without_id_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Boards/_apis/wit/workitems/$Task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "odd"})))
            .mount(&server)
            .await;

        let err = client(&server).create_work_item(&[]).await.unwrap_err();
        assert!(err.to_string().contains("work item id"));
    }

    #[tokio::test]
    async fn update_patches_work_item() {
        let server = MockServer::start().await;
        let ops = vec![PatchOperation::set_field("System.State", "Done")];
        Mock::given(method("PATCH"))
            .and(path("/Boards/_apis/wit/workitems/17"))
            .and(body_json(&ops))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 17})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).update_work_item(17, &ops).await.unwrap();
    }

    #[tokio::test]
    async fn comment_uses_preview_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Boards/_apis/wit/workItems/17/comments"))
            .and(query_param("api-version", COMMENTS_API_VERSION))
            .and(body_json(json!({"text": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).add_comment(17, "hi").await.unwrap();
    }

    #[tokio::test]
    async fn upload_sends_raw_bytes() {
        let server = MockServer::start().await;
        let content = vec![1u8, 2, 3, 254];
        Mock::given(method("POST"))
            .and(path("/Boards/_apis/wit/attachments"))
            .and(query_param("fileName", "dump file.bin"))
            .and(header("Content-Type", "application/octet-stream"))
            .and(body_bytes(content.clone()))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "a1", "url": "https://x/att/a1"})),
            )
            .mount(&server)
            .await;

        let url = client(&server)
            .upload_attachment("dump file.bin", content)
            .await
            .unwrap();
        assert_eq!(url, "https://x/att/a1");
    }

    #[tokio::test]
    async fn unauthorized_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).add_comment(1, "x").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::Unauthorized { .. })
        ));
    }
}
