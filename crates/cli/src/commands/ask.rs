//! Ask command handler.
//!
//! Runs every question as an independent task over one shared agent.
//! Ctrl-C cancels all tasks at their next phase boundary.

use crate::runtime;
use clap::Args;
use futures::future::join_all;
use sleuth_agent::{TaskReport, TaskRequest};
use sleuth_core::{config::AppConfig, AppError, AppResult};
use tokio_util::sync::CancellationToken;

/// Answer one or more questions
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Questions to answer; each runs as its own task
    #[arg(required = true)]
    pub questions: Vec<String>,

    /// Output the full task reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the attempt trace after each answer
    #[arg(long)]
    pub trace: bool,

    /// Hard cap on planning cycles per task
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Semantic weight for the hybrid tool (0.0 = lexical only, 1.0 = semantic only)
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Results requested per tool call
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Previous question, used to rewrite follow-ups like "tell me more"
    #[arg(long)]
    pub follow_up_of: Option<String>,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let config = config
            .clone()
            .with_agent_overrides(self.max_iterations, self.alpha, self.top_k);
        config.validate()?;

        let registry = runtime::build_registry(&config).await?;
        let agent = runtime::build_agent(&config, registry)?;

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling tasks");
                    cancel.cancel();
                }
            })
        };

        let runs = self.questions.iter().map(|question| {
            let mut request = TaskRequest::new(question.as_str());
            if let Some(previous) = &self.follow_up_of {
                request = request.follow_up_of(previous.as_str());
            }
            agent.run(request, &cancel)
        });
        let results = join_all(runs).await;
        interrupt.abort();

        let mut reports = Vec::new();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!(error = %e, "Task aborted");
                    first_error.get_or_insert(e);
                }
            }
        }

        if self.json {
            let json = if reports.len() == 1 {
                serde_json::to_string_pretty(&reports[0])
            } else {
                serde_json::to_string_pretty(&reports)
            }
            .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            let headed = reports.len() > 1;
            for report in &reports {
                self.print_report(report, headed);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn print_report(&self, report: &TaskReport, headed: bool) {
        if headed {
            println!("## {}", report.question);
            println!();
        }

        match &report.answer {
            Some(answer) if report.is_done() => println!("{}", answer),
            None if report.is_done() => println!(
                "No answer could be written: {}",
                report.synthesis_error.as_deref().unwrap_or("unknown error")
            ),
            _ => println!(
                "Task failed: {}",
                report.failure_reason.as_deref().unwrap_or("unknown reason")
            ),
        }

        if !report.citations.is_empty() {
            println!();
            println!("Sources:");
            for citation in &report.citations {
                println!("  [{}] {}", citation.chunk_id, citation.source_uri);
            }
        }

        if self.trace {
            println!();
            println!(
                "Trace ({} attempts, {} evidence chunks, {} ms):",
                report.attempts.len(),
                report.evidence_count,
                report.duration_ms()
            );
            if report.effective_question != report.question {
                println!("  rewritten: {}", report.effective_question);
            }
            for line in report.trace_lines() {
                println!("  {}", line);
            }
        }

        println!();
    }
}
