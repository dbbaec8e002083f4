pub mod azure_devops;
pub mod youtrack;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::issue::{Attachment, Issue};
use crate::model::operation::PatchOperation;
use crate::model::work_item::WorkItem;

/// Read side of a migration.
#[async_trait]
pub trait IssueSource: Send + Sync {
    fn name(&self) -> &str;
    /// Browser link to an issue, used in the "migrated from" headers.
    fn issue_url(&self, id: &str) -> String;
    async fn fetch_issue(&self, id: &str) -> Result<Issue>;
    /// Readable ids of at most `limit` issues in `project`.
    async fn list_issue_ids(&self, project: &str, limit: usize) -> Result<Vec<String>>;
    async fn download_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>>;
}

/// Write side of a migration.
#[async_trait]
pub trait WorkItemSink: Send + Sync {
    fn name(&self) -> &str;
    async fn create_work_item(&self, ops: &[PatchOperation]) -> Result<WorkItem>;
    async fn update_work_item(&self, id: u64, ops: &[PatchOperation]) -> Result<()>;
    async fn add_comment(&self, id: u64, text: &str) -> Result<()>;
    /// Uploads raw bytes and returns the attachment URL to link from a work item.
    async fn upload_attachment(&self, file_name: &str, content: Vec<u8>) -> Result<String>;
}
