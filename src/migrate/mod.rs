use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::mapping::FieldHandler;
use crate::model::issue::{Comment, CustomFields, Issue};
use crate::model::operation::PatchOperation;
use crate::model::work_item::MigratedIssue;
use crate::providers::azure_devops::AzureDevOpsClient;
use crate::providers::youtrack::YouTrackClient;
use crate::providers::{IssueSource, WorkItemSink};
use crate::util::text::{format_timestamp, html_line_breaks};

pub const DEFAULT_ISSUE_LIMIT: usize = 10_000;

/// Replays YouTrack issues as Azure DevOps work items.
pub struct Migrator {
    source: Box<dyn IssueSource>,
    sink: Box<dyn WorkItemSink>,
}

impl Migrator {
    /// Build the HTTP clients for both systems from config.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let source = YouTrackClient::new(config.youtrack()?)?;
        let sink = AzureDevOpsClient::new(config.azure_devops()?);
        Ok(Self::with_clients(Box::new(source), Box::new(sink)))
    }

    pub fn with_clients(source: Box<dyn IssueSource>, sink: Box<dyn WorkItemSink>) -> Self {
        Self { source, sink }
    }

    /// Custom fields of a single issue, for authoring a field mapping.
    pub async fn custom_fields(&self, id: &str) -> Result<CustomFields> {
        let issue = self.source.fetch_issue(id).await?;
        Ok(issue.custom_fields)
    }

    pub async fn migrate_issue(&self, id: &str, handler: &dyn FieldHandler) -> Result<MigratedIssue> {
        let issue = self
            .source
            .fetch_issue(id)
            .await
            .with_context(|| format!("Failed to fetch {} issue {id}", self.source.name()))?;

        let mut create_ops = vec![
            PatchOperation::set_field("System.Title", issue.summary.clone()),
            PatchOperation::set_field("System.Description", self.description(&issue)),
        ];
        let mut deferred_ops = Vec::new();
        for op in handler.translate(&issue.custom_fields) {
            if op.set_after_creation {
                deferred_ops.push(op.to_patch());
            } else {
                create_ops.push(op.to_patch());
            }
        }

        let work_item = self
            .sink
            .create_work_item(&create_ops)
            .await
            .with_context(|| format!("migration of {id} failed"))?;
        debug!(issue = id, work_item = work_item.id, "created work item");

        if !deferred_ops.is_empty() {
            self.sink
                .update_work_item(work_item.id, &deferred_ops)
                .await
                .with_context(|| format!("Failed to set deferred fields for {id}"))?;
        }

        for comment in &issue.comments {
            self.sink
                .add_comment(work_item.id, &self.comment_text(&issue.id, comment))
                .await
                .with_context(|| format!("Failed to copy comment of {id}"))?;
        }

        for attachment in &issue.attachments {
            let content = self
                .source
                .download_attachment(attachment)
                .await
                .with_context(|| format!("Failed to download {} from {id}", attachment.name))?;
            debug!(issue = id, name = %attachment.name, bytes = content.len(), "uploading attachment");
            let url = self
                .sink
                .upload_attachment(&attachment.name, content)
                .await
                .with_context(|| format!("Failed to upload {} for {id}", attachment.name))?;
            self.sink
                .update_work_item(work_item.id, &[PatchOperation::attach_file(&url, &attachment.name)])
                .await
                .with_context(|| format!("Failed to link {} to work item {}", attachment.name, work_item.id))?;
        }

        Ok(MigratedIssue {
            source_id: issue.id,
            work_item_id: work_item.id,
            deferred_fields: deferred_ops.len(),
            comments: issue.comments.len(),
            attachments: issue.attachments.len(),
        })
    }

    /// Migrate up to `limit` issues of `project` in order. Stops at the first
    /// failure; issues migrated before it are left in place.
    pub async fn migrate_project(
        &self,
        project: &str,
        handler: &dyn FieldHandler,
        limit: usize,
    ) -> Result<Vec<MigratedIssue>> {
        let mut ids = self
            .source
            .list_issue_ids(project, limit)
            .await
            .with_context(|| format!("Failed to list issues of project {project}"))?;
        ids.truncate(limit);

        let total = ids.len();
        let mut migrated = Vec::with_capacity(total);
        for (i, id) in ids.iter().enumerate() {
            info!("Migrating {id}, {}/{total}", i + 1);
            let result = self.migrate_issue(id, handler).await?;
            info!(work_item = result.work_item_id, "Migrated {id}, {}/{total}", i + 1);
            migrated.push(result);
        }
        Ok(migrated)
    }

    fn migrated_from(&self, id: &str) -> String {
        format!(
            "[Migrated from <a href=\"{}\">{}</a>",
            self.source.issue_url(id),
            self.source.name()
        )
    }

    fn description(&self, issue: &Issue) -> String {
        let text = format!(
            "{}, originally reported by {} on {}]\n\n{}",
            self.migrated_from(&issue.id),
            issue.reporter.as_deref().unwrap_or("unknown"),
            format_timestamp(issue.created),
            issue.description.as_deref().unwrap_or_default()
        );
        html_line_breaks(&text, "<br />")
    }

    fn comment_text(&self, id: &str, comment: &Comment) -> String {
        let text = format!(
            "{}. Original comment by {} on {}]\n\n{}",
            self.migrated_from(id),
            comment.author.as_deref().unwrap_or("unknown"),
            format_timestamp(comment.created),
            comment.text
        );
        html_line_breaks(&text, "<br/>")
    }
}
