//! CLI entrypoint for scholar-debate
//!
//! Wires the infrastructure adapters into the application use cases and
//! renders progress events on the console.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use scholar_application::{
    FollowUpInput, FollowUpUseCase, ProgressSink, RunDebateInput, RunDebateUseCase,
    SolveSingleInput, SolveSingleUseCase,
};
use scholar_domain::{
    DebateModels, ImageAttachment, Question, SolveResult, StreamEvent,
};
use scholar_infrastructure::{ConfigLoader, HeuristicEstimator, ModelOverride, OpenAiInvoker};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scholar-debate", version, about = "Solve academic questions with one model or a proposer/reviewer debate")]
struct Cli {
    /// The question text (omit when passing --image)
    question: Option<String>,

    /// Image file(s) containing the question (repeatable)
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Run the proposer/reviewer debate instead of a single pass
    #[arg(long)]
    debate: bool,

    /// Maximum debate rounds (overrides the config file)
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Subject used for per-subject model overrides (e.g. math)
    #[arg(long)]
    subject: Option<String>,

    /// Supplementary instructions appended to the prompt
    #[arg(long)]
    extra: Option<String>,

    /// Disable streaming; one blocking call per model
    #[arg(long)]
    no_stream: bool,

    /// Ask a follow-up question over a previous solve
    #[arg(long, value_name = "PROMPT", requires = "base_question", requires = "base_answer")]
    follow_up: Option<String>,

    /// The originally solved question (with --follow-up)
    #[arg(long)]
    base_question: Option<String>,

    /// The answer previously given (with --follow-up)
    #[arg(long)]
    base_answer: Option<String>,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress progress output
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = ConfigLoader::load(cli.config.as_ref())?;
    let models = config.resolve(cli.subject.as_deref(), &ModelOverride::default())?;
    let max_iterations = cli.max_iterations.unwrap_or(config.max_iterations);

    // Ctrl-C cancels the run cooperatively
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let sink = ConsoleSink { quiet: cli.quiet };

    if let Some(prompt) = cli.follow_up.clone() {
        return run_follow_up(&cli, prompt, models, max_iterations, cancel, &sink).await;
    }

    let question = build_question(&cli)?;
    info!(debate = cli.debate, "starting solve");

    let estimator = Arc::new(HeuristicEstimator);
    let result = if cli.debate {
        let use_case = RunDebateUseCase::new(
            Arc::new(OpenAiInvoker::new(models.proposer)),
            Arc::new(OpenAiInvoker::new(models.reviewer)),
            estimator,
        );
        let mut input = RunDebateInput::new(question, max_iterations).with_cancellation(cancel);
        if let Some(extra) = cli.extra.clone() {
            input = input.with_extra_prompt(extra);
        }
        let outcome = use_case.execute(input, &sink).await?;
        if !cli.quiet && !outcome.consensus_reached {
            eprintln!(
                "{}",
                format!("({} 轮后未达成共识，采用最后一版解答)", outcome.iterations).dimmed()
            );
        }
        outcome.result
    } else {
        let use_case = SolveSingleUseCase::new(
            Arc::new(OpenAiInvoker::new(models.proposer)),
            estimator,
        );
        let mut input = SolveSingleInput::new(question).with_cancellation(cancel);
        if let Some(extra) = cli.extra.clone() {
            input = input.with_extra_prompt(extra);
        }
        if cli.no_stream {
            input = input.without_streaming();
        }
        use_case.execute(input, &sink).await?
    };

    print_result(&result);
    Ok(())
}

async fn run_follow_up(
    cli: &Cli,
    prompt: String,
    models: DebateModels,
    max_iterations: u32,
    cancel: CancellationToken,
    sink: &ConsoleSink,
) -> Result<()> {
    let use_case = FollowUpUseCase::new(
        Arc::new(OpenAiInvoker::new(models.proposer)),
        Arc::new(OpenAiInvoker::new(models.reviewer)),
        Arc::new(HeuristicEstimator),
    );

    let mut input = FollowUpInput::new(
        cli.base_question.clone().unwrap_or_default(),
        cli.base_answer.clone().unwrap_or_default(),
        prompt,
    )
    .with_cancellation(cancel);
    if cli.no_stream {
        input = input.without_streaming();
    }

    let result = if cli.debate {
        use_case.execute_debate(input, max_iterations, sink).await?.result
    } else {
        use_case.execute_single(input, sink).await?
    };

    println!("\n{}", "回答".bold().green());
    println!("{}", result.answer);
    if let Some(tokens) = result.tokens_used {
        eprintln!("{}", format!("(tokens: {tokens})").dimmed());
    }
    Ok(())
}

fn build_question(cli: &Cli) -> Result<Question> {
    if !cli.images.is_empty() {
        let mut attachments = Vec::with_capacity(cli.images.len());
        for path in &cli.images {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read image {}", path.display()))?;
            attachments.push(ImageAttachment::new(data, mime_of(path)));
        }
        return Ok(Question::Images(attachments));
    }
    match &cli.question {
        Some(text) => Ok(Question::try_text(text.clone())?),
        None => bail!("a question or at least one --image is required"),
    }
}

fn mime_of(path: &PathBuf) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

fn print_result(result: &SolveResult) {
    println!("\n{}", "题目".bold().cyan());
    println!("{}", result.question);
    println!("\n{}", "解答".bold().green());
    println!("{}", result.answer);
    if let Some(tokens) = result.tokens_used {
        eprintln!("{}", format!("(tokens: {tokens})").dimmed());
    }
}

/// Renders progress events on the console.
struct ConsoleSink {
    quiet: bool,
}

impl ProgressSink for ConsoleSink {
    fn on_event(&self, event: &StreamEvent) {
        if self.quiet {
            return;
        }
        match event {
            StreamEvent::Start => {}
            StreamEvent::Delta { value } => {
                print!("{value}");
                let _ = std::io::stdout().flush();
            }
            StreamEvent::Complete { .. } => println!(),
            StreamEvent::Error { message } => eprintln!("{}", message.red()),
            StreamEvent::Status { message, iteration } => {
                eprintln!("{}", format!("[第{iteration}轮] {message}").dimmed());
            }
            StreamEvent::Model1 { content, iteration } => {
                eprintln!("{}", format!("── 提议 (第{iteration}轮) ──").blue().bold());
                eprintln!("{content}");
            }
            StreamEvent::Model2 { content, iteration } => {
                eprintln!("{}", format!("── 审查 (第{iteration}轮) ──").yellow().bold());
                eprintln!("{content}");
            }
        }
    }
}
