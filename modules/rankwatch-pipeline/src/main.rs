use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rankwatch_common::{AnalysisResult, Config};
use rankwatch_pipeline::{InsightPipeline, PipelineDeps, PipelineOptions, RunRequest};

#[derive(Parser)]
#[command(name = "rankwatch", about = "Search performance analysis and page improvement advice")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a site and recommend improvements for its worst-ranking page
    Analyze {
        /// Site URL, bare domain or `sc-domain:` property
        site: String,

        /// Date the default window is anchored to (defaults to the local date)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Explicit window start, inclusive
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        /// Explicit window end, inclusive
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// Skip metric collection entirely
        #[arg(long)]
        skip_metrics: bool,

        /// Disable the previous-window rank comparison
        #[arg(long)]
        no_compare: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the result.
    let filter = EnvFilter::from_default_env().add_directive("rankwatch=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = Config::from_env();
    config.log_redacted();

    match cli.command {
        Command::Analyze {
            site,
            today,
            start,
            end,
            skip_metrics,
            no_compare,
            format,
        } => {
            let mut options = PipelineOptions::from_config(&config);
            options.compare_previous_window = !no_compare;
            let pipeline = InsightPipeline::new(PipelineDeps::from_config(&config), options);

            let cancel = Arc::new(AtomicBool::new(false));
            let flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current stage");
                    flag.store(true, Ordering::Relaxed);
                }
            });

            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let mut request = RunRequest::new(site, today).with_cancel(cancel);
            if let (Some(start), Some(end)) = (start, end) {
                request = request.with_window(start, end);
            }
            if skip_metrics {
                request = request.skip_metrics();
            }

            let outcome = pipeline.run(&request).await.context("Analysis failed")?;
            info!(run_id = %outcome.result.run_id, "Analysis finished");

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&outcome.result)?)
                }
                OutputFormat::Text => print!("{}", text_report(&outcome.result)),
            }
        }
    }

    Ok(())
}

fn text_report(result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Site:        {}\n", result.site));
    out.push_str(&format!("Window:      {}\n", result.window));
    out.push_str(&format!("Status:      {:?}\n", result.status));
    out.push_str(&format!("Target page: {}\n", result.target_page));
    out.push_str(&format!(
        "Keyword:     {}\n\n",
        result.keyword.as_deref().unwrap_or("-")
    ));

    let s = &result.summary;
    out.push_str(&format!(
        "Clicks {} | Impressions {} | CTR {:.2}% | Avg. position {:.2} | Conversions {}\n",
        s.total_clicks, s.total_impressions, s.overall_ctr, s.mean_position, s.total_conversions
    ));

    if !result.rank_drops.is_empty() {
        out.push_str("\nRank drops:\n");
        for d in &result.rank_drops {
            out.push_str(&format!(
                "  {} {:.1} -> {:.1} (+{:.1})\n",
                d.page_key, d.previous_position, d.current_position, d.change
            ));
        }
    }

    if !result.competitors.is_empty() {
        out.push_str("\nCompetitors:\n");
        for c in &result.competitors {
            out.push_str(&format!("  {}. {} <{}>\n", c.rank, c.title, c.url));
        }
    }

    if !result.recommendation_text.is_empty() {
        out.push_str("\nRecommendation:\n");
        out.push_str(&result.recommendation_text);
        out.push('\n');
    }
    out
}
