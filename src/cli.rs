use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{self, AppConfig};
use crate::mapping::FieldMapping;
use crate::migrate::{Migrator, DEFAULT_ISSUE_LIMIT};
use crate::model::issue::CustomFields;
use crate::providers::youtrack::YouTrackClient;
use crate::providers::IssueSource;

#[derive(Debug, Parser)]
#[command(name = "yt2ado", version, about = "Migrate YouTrack issues to Azure DevOps Boards")]
pub struct Cli {
    /// Config file (defaults to ~/.yt2ado/config.toml)
    #[arg(long, global = true, env = "YT2ADO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Migrate a single issue
    MigrateIssue {
        /// Readable issue id, e.g. PRJ-42
        id: String,
    },
    /// Migrate every issue of a project, in order
    MigrateProject {
        project: String,
        /// Upper bound on the number of issues migrated
        #[arg(long, default_value_t = DEFAULT_ISSUE_LIMIT)]
        limit: usize,
    },
    /// Show the custom fields of an issue, for writing [[fields]] rules
    Fields {
        id: String,
        #[arg(long)]
        json: bool,
    },
}

pub fn init_logging(config: &AppConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);

    let mapping = FieldMapping::new(config.fields.clone());

    match cli.command {
        Commands::MigrateIssue { id } => {
            let migrator = migrator(&config, &mapping)?;
            let result = migrator.migrate_issue(&id, &mapping).await?;
            println!(
                "Migrated {} -> work item {} ({} comments, {} attachments)",
                result.source_id, result.work_item_id, result.comments, result.attachments
            );
        }
        Commands::MigrateProject { project, limit } => {
            let migrator = migrator(&config, &mapping)?;
            let results = migrator.migrate_project(&project, &mapping, limit).await?;
            for r in &results {
                println!("{} -> {}", r.source_id, r.work_item_id);
            }
            println!("Migrated {} issues from {project}", results.len());
        }
        Commands::Fields { id, json } => {
            let fields = discover_fields(&config, &id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&fields)?);
            } else {
                print!("{}", format_fields(&fields));
            }
        }
    }
    Ok(())
}

fn migrator(config: &AppConfig, mapping: &FieldMapping) -> Result<Migrator> {
    if mapping.is_empty() {
        tracing::debug!("no [[fields]] rules configured, custom fields will not be migrated");
    }
    Migrator::new(config)
}

/// Field discovery only talks to YouTrack, so `[azure_devops]` may be absent.
pub async fn discover_fields(config: &AppConfig, id: &str) -> Result<CustomFields> {
    let source = YouTrackClient::new(config.youtrack()?)?;
    Ok(source.fetch_issue(id).await?.custom_fields)
}

/// One `name = value` line per field; empty fields show as `<empty>`.
pub fn format_fields(fields: &CustomFields) -> String {
    fields
        .iter()
        .map(|(name, value)| {
            let display = value.display().unwrap_or_else(|| "<empty>".into());
            format!("{name} = {display}\n")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_migrate_issue() {
        let cli = Cli::try_parse_from(["yt2ado", "migrate-issue", "PRJ-1"]).unwrap();
        assert!(matches!(cli.command, Commands::MigrateIssue { ref id } if id == "PRJ-1"));
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_migrate_project_default_limit() {
        let cli = Cli::try_parse_from(["yt2ado", "migrate-project", "PRJ"]).unwrap();
        match cli.command {
            Commands::MigrateProject { project, limit } => {
                assert_eq!(project, "PRJ");
                assert_eq!(limit, DEFAULT_ISSUE_LIMIT);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "yt2ado",
            "migrate-project",
            "PRJ",
            "--limit",
            "5",
            "--config",
            "/tmp/c.toml",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::MigrateProject { limit: 5, .. }));
    }

    #[test]
    fn parse_fields_json() {
        let cli = Cli::try_parse_from(["yt2ado", "fields", "PRJ-2", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Fields { json: true, .. }));
    }

    #[test]
    fn missing_id_fails() {
        assert!(Cli::try_parse_from(["yt2ado", "migrate-issue"]).is_err());
    }

    #[tokio::test]
    async fn discover_fields_needs_only_youtrack_config() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/issues/PRJ-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "idReadable": "PRJ-3",
                "customFields": [{"name": "Type", "value": {"name": "Bug"}}]
            })))
            .mount(&server)
            .await;

        let toml = format!("[youtrack]\nbase_url = \"{}\"\n", server.uri());
        let config = config::parse_config(&toml).unwrap();
        assert!(config.azure_devops.is_none());

        let fields = discover_fields(&config, "PRJ-3").await.unwrap();
        assert_eq!(fields.display("Type"), Some("Bug".into()));
    }

    #[test]
    fn format_fields_lists_each_field() {
        let mut fields = CustomFields::new();
        fields.insert("Priority", json!({"name": "Major"}));
        fields.insert("Assignee", json!(null));
        assert_eq!(format_fields(&fields), "Assignee = <empty>\nPriority = Major\n");
    }
}
