//! End-to-end run: select → generate → assemble → publish.
//!
//! Strictly sequential; the only retry is the generator's repair round.
//! The first unrecoverable collaborator error ends the run, except for the
//! SEO metafield, whose failure is logged and recorded on the result.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{info, instrument, warn};

use shopscribe_shared::{
    AppConfig, ArticleDraft, ArticleRequest, BlogRef, Catalog, GenerationService,
    PublishedArticle, Publisher, Result, RunConfig, SelectionResult,
};

use crate::assembler::{AssembleOptions, assemble};
use crate::clock::Clock;
use crate::generator::{ContentGenerator, GeneratorOptions};
use crate::keywords::SeedKeywords;
use crate::selector::{SelectionRules, select};

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub rules: SelectionRules,
    pub generator: GeneratorOptions,
    pub assemble: AssembleOptions,
    pub blog: BlogRef,
    /// Build the request but make no write calls.
    pub dry_run: bool,
}

impl PipelineConfig {
    pub fn from_config(app: &AppConfig, run: &RunConfig, keywords: SeedKeywords) -> Result<Self> {
        Ok(Self {
            rules: SelectionRules::from_config(app, keywords)?,
            generator: GeneratorOptions::from_config(app, &run.author),
            assemble: AssembleOptions {
                author: run.author.clone(),
                published: run.auto_publish,
            },
            blog: run.blog.clone(),
            dry_run: false,
        })
    }
}

/// The outside world a run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub catalog: &'a dyn Catalog,
    pub generation: &'a dyn GenerationService,
    pub publisher: &'a dyn Publisher,
    pub clock: &'a dyn Clock,
}

/// What happened at the publish step.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// Dry run: nothing was written.
    Skipped,
    Published {
        blog_id: u64,
        article: PublishedArticle,
        /// Set when the article exists but its SEO metafield could not be attached.
        metafield_error: Option<String>,
    },
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub selection: SelectionResult,
    pub draft: ArticleDraft,
    pub request: ArticleRequest,
    pub outcome: PublishOutcome,
    pub elapsed: Duration,
}

impl RunResult {
    pub fn article(&self) -> Option<&PublishedArticle> {
        match &self.outcome {
            PublishOutcome::Published { article, .. } => Some(article),
            PublishOutcome::Skipped => None,
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &RunResult) {}
}

/// Run the full pipeline once.
///
/// 1. Resolve the target blog (skipped on dry runs)
/// 2. Select products and topic
/// 3. Generate the article
/// 4. Assemble the backend request
/// 5. Create the article, then attach its SEO metafield
#[instrument(skip_all, fields(blog = %config.blog, dry_run = config.dry_run))]
pub async fn run<R: Rng + Send>(
    collaborators: Collaborators<'_>,
    config: &PipelineConfig,
    rng: &mut R,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();

    let blog_id = if config.dry_run {
        None
    } else {
        progress.phase("Resolving blog");
        Some(collaborators.publisher.resolve_blog(&config.blog).await?)
    };

    progress.phase("Selecting products");
    let selection = select(collaborators.catalog, collaborators.clock, &config.rules, rng).await?;

    progress.phase("Generating article");
    let generator = ContentGenerator::new(collaborators.generation, config.generator.clone());
    let draft = generator
        .generate(selection.topic(), selection.products())
        .await?;

    progress.phase("Assembling article");
    let request = assemble(&draft, selection.products(), &config.assemble)?;

    let outcome = match blog_id {
        None => {
            info!(title = %request.title, "dry run, not publishing");
            PublishOutcome::Skipped
        }
        Some(blog_id) => {
            progress.phase("Publishing article");
            let article = collaborators
                .publisher
                .create_article(blog_id, &request)
                .await?;
            let metafield_error = match &request.metafield {
                Some(field) => {
                    progress.phase("Attaching meta description");
                    match collaborators
                        .publisher
                        .attach_metafield(article.id, field)
                        .await
                    {
                        Ok(()) => None,
                        Err(e) => {
                            warn!(article_id = article.id, error = %e, "could not attach meta description");
                            Some(e.to_string())
                        }
                    }
                }
                None => None,
            };
            PublishOutcome::Published {
                blog_id,
                article,
                metafield_error,
            }
        }
    };

    let result = RunResult {
        selection,
        draft,
        request,
        outcome,
        elapsed: start.elapsed(),
    };
    info!(
        tier = %result.selection.tier(),
        article_id = result.article().map(|a| a.id),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "run complete"
    );
    progress.done(&result);
    Ok(result)
}
