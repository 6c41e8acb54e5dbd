use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::{Term, style};
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vidsearch_core::{
    AccountConfig, AzureBlobContainer, AzureOpenAiEmbeddings, DbBackend, DbConfig, HttpConfig,
    PrepareSettings, Preparer, ProgressReporter, PromptContentDb, RunOutcome, StorageConfig,
    TracingReporter, VideoIndexerClient, clients::embeddings::AzureOpenAiConfig,
    db::AzureSearchConfig, dry_run_collaborators, format_dry_run_readable, format_duration,
    format_summary_readable,
};

use crate::{config::Cli, reporter::SpinnerReporter};

mod config;
mod reporter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

/// Every collaborator of a run, each kept even when it failed to build.
struct Collaborators {
    indexer: vidsearch_core::Result<VideoIndexerClient>,
    storage: Option<vidsearch_core::Result<AzureBlobContainer>>,
    embedder: vidsearch_core::Result<AzureOpenAiEmbeddings>,
    db: vidsearch_core::Result<PromptContentDb>,
}

impl Collaborators {
    fn build(cli: &Cli, settings: &PrepareSettings, backend: DbBackend, http: HttpConfig) -> Self {
        let indexer = AccountConfig::new(&cli.subscription_id, &cli.resource_group, &cli.account_name)
            .map(|account| {
                account.with_endpoints(&cli.vi_api_endpoint, &cli.vi_arm_endpoint, &cli.vi_api_version)
            })
            .and_then(|account| VideoIndexerClient::new(account, &cli.arm_token, http));

        let storage = StorageConfig::resolve(
            cli.use_blob_storage,
            cli.storage_sas_url.clone(),
            cli.storage_container.clone(),
        )
        .map(|storage| AzureBlobContainer::new(&storage, http));
        if storage.is_none() && cli.use_blob_storage {
            info!("blob storage URL or container missing, using the id cache only");
        }

        let mut openai = AzureOpenAiConfig::new(&cli.openai_endpoint, &cli.openai_api_key);
        openai.deployment = cli.embedding_deployment.clone();
        openai.api_version = cli.openai_api_version.clone();
        let embedder = AzureOpenAiEmbeddings::new(&openai, http);

        let azure_search = match (&cli.search_endpoint, &cli.search_key) {
            (Some(endpoint), Some(api_key)) => Some(AzureSearchConfig {
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
            }),
            _ => None,
        };
        let db = PromptContentDb::connect(
            backend,
            &DbConfig {
                db_name: settings.db_name.clone(),
                vector_field: settings.embeddings_field.clone(),
                chroma_url: cli.chroma_url.clone(),
                azure_search,
            },
            http,
        );

        Self {
            indexer,
            storage,
            embedder,
            db,
        }
    }

    async fn run<R: ProgressReporter>(
        self,
        settings: &PrepareSettings,
        reporter: &R,
    ) -> Result<RunOutcome> {
        if settings.dry_run {
            let report = dry_run_collaborators(
                settings,
                self.indexer,
                self.storage,
                self.embedder,
                self.db,
                reporter,
            )
            .await?;
            return Ok(RunOutcome::DryRun(report));
        }

        let indexer = self
            .indexer
            .context("Failed to create Video Indexer client")?;
        let storage = self
            .storage
            .transpose()
            .context("Failed to create blob client")?;
        let embedder = self
            .embedder
            .context("Failed to create embeddings client")?;
        let db = self.db.context("Failed to create prompt content db")?;

        Ok(Preparer::new(settings, indexer, storage, embedder, db)
            .execute(reporter)
            .await?)
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = cli.settings();
    let backend: DbBackend = cli.db.into();
    let http = HttpConfig::default();

    println!(
        "\n{}  {}\n",
        style("vidsearch").cyan().bold(),
        style("Prompt Content Indexer").dim()
    );
    info!(
        db = %settings.db_name,
        backend = backend.name(),
        dry_run = settings.dry_run,
        use_blob_storage = cli.use_blob_storage,
        cache_file = %settings.videos_ids_cache_file.display(),
        "resolved settings"
    );

    let collaborators = Collaborators::build(&cli, &settings, backend, http);

    println!("{}", style("─".repeat(60)).dim());
    let total_start = Instant::now();

    // Spinners on a terminal, log lines otherwise.
    let outcome = if Term::stdout().is_term() {
        collaborators
            .run(&settings, &SpinnerReporter::default())
            .await?
    } else {
        collaborators.run(&settings, &TracingReporter).await?
    };

    println!("{}", style("─".repeat(60)).dim());
    match outcome {
        RunOutcome::DryRun(report) => {
            println!("\n{}", format_dry_run_readable(&report));
            if !report.all_ok() {
                anyhow::bail!("dry run found unreachable services");
            }
        }
        RunOutcome::Prepared(summary) => {
            println!("\n{}", format_summary_readable(&summary));
        }
    }

    println!(
        "{} {}",
        style("Total time:").bold(),
        format_duration(total_start.elapsed())
    );
    Ok(())
}
