/// Work item created in Azure DevOps for a migrated issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: u64,
    pub url: Option<String>,
}

/// Outcome of migrating a single issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedIssue {
    pub source_id: String,
    pub work_item_id: u64,
    pub deferred_fields: usize,
    pub comments: usize,
    pub attachments: usize,
}
