use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use docqa_core::{
    Answer, ChunkingConfig, CleaningOptions, EmbeddingEndpointConfig, EncodeOptions, HttpEmbedder,
    HuggingFaceTokenizer, Pipeline, PipelineComponents, PipelineContext, PipelineOptions,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_TOP_K,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Source PDF to answer questions about
    #[arg(long, env = "DOCQA_PDF")]
    pdf: PathBuf,

    /// Directory holding cleaned text, chunks, embeddings and index
    #[arg(long, env = "DOCQA_CACHE_DIR", default_value = ".docqa-cache")]
    cache_dir: PathBuf,

    /// tokenizer.json for subword chunk windows (whitespace words otherwise)
    #[arg(long, env = "DOCQA_TOKENIZER")]
    tokenizer: Option<PathBuf>,

    /// Tokens per chunk
    #[arg(long, default_value = "200")]
    chunk_size: usize,

    /// Tokens shared by consecutive chunks
    #[arg(long, default_value = "40")]
    overlap: usize,

    #[command(flatten)]
    cleaning: CleaningArgs,

    #[command(flatten)]
    encoder: EncoderArgs,
}

#[derive(Args)]
struct CleaningArgs {
    /// Lines at the top and bottom of each page checked for running headers/footers
    #[arg(long, default_value = "3")]
    hf_lines: usize,

    /// Keep repeated header and footer lines
    #[arg(long, default_value_t = false)]
    keep_headers_footers: bool,

    /// Keep hyphenated line breaks as they are
    #[arg(long, default_value_t = false)]
    keep_hyphens: bool,

    /// Keep runs of spaces and tabs
    #[arg(long, default_value_t = false)]
    keep_whitespace: bool,
}

#[derive(Args)]
struct EncoderArgs {
    /// OpenAI-compatible base URL; hashed trigram encoders are used when absent
    #[arg(long, env = "DOCQA_EMBEDDING_ENDPOINT", requires = "dimensions")]
    embedding_endpoint: Option<String>,

    /// Bearer token for the embedding endpoint
    #[arg(long, env = "DOCQA_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Model used to embed chunks
    #[arg(long, env = "DOCQA_CONTEXT_MODEL", default_value = "text-embedding-3-small")]
    context_model: String,

    /// Model used to embed questions (defaults to the context model)
    #[arg(long, env = "DOCQA_QUESTION_MODEL")]
    question_model: Option<String>,

    /// Embedding dimensionality; must match the endpoint model when one is set
    #[arg(long, env = "DOCQA_EMBEDDING_DIMENSIONS")]
    dimensions: Option<usize>,

    /// Chunks per encoder call
    #[arg(long, default_value = "32")]
    batch_size: usize,

    /// Maximum tokens passed to the encoder per input
    #[arg(long, default_value = "256")]
    max_length: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Convert, chunk, embed and index the PDF, reusing valid cached artifacts.
    Prepare,
    /// Answer a single question.
    Ask {
        /// Question text
        #[arg(long)]
        question: String,
        /// Number of chunks to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Read questions from stdin, one per line, until EOF or `quit`.
    Interactive {
        /// Number of chunks to return per question.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        pdf = %cli.pdf.display(),
        "docqa boot"
    );

    let pipeline = Pipeline::new(pipeline_options(&cli), build_components(&cli)?);
    let context = pipeline.prepare()?;

    match cli.command {
        Command::Prepare => {
            println!(
                "{} chunks ready in {}",
                context.chunks().len(),
                cli.cache_dir.display()
            );
            for (key, value) in context.metadata() {
                println!("  {key}: {value}");
            }
            if !context.index_build_time().is_zero() {
                println!(
                    "index built in {:.2} seconds",
                    context.index_build_time().as_secs_f64()
                );
            }
        }
        Command::Ask { question, top_k } => {
            let answer = context.answer(&question, top_k)?;
            println!("{}", format_answer(&answer));
        }
        Command::Interactive { top_k } => run_interactive(&context, top_k)?,
    }

    Ok(())
}

fn pipeline_options(cli: &Cli) -> PipelineOptions {
    let mut options = PipelineOptions::new(&cli.pdf, &cli.cache_dir);
    options.cleaning = CleaningOptions {
        hf_lines: cli.cleaning.hf_lines,
        remove_headers_footers: !cli.cleaning.keep_headers_footers,
        cleanup_hyphens: !cli.cleaning.keep_hyphens,
        normalize_whitespace: !cli.cleaning.keep_whitespace,
        ..CleaningOptions::default()
    };
    options.chunking = ChunkingConfig {
        chunk_size: cli.chunk_size,
        overlap: cli.overlap,
    };
    options.encode = EncodeOptions {
        batch_size: cli.encoder.batch_size,
        max_length: cli.encoder.max_length,
    };
    options
}

fn build_components(cli: &Cli) -> anyhow::Result<PipelineComponents> {
    let dimensions = cli
        .encoder
        .dimensions
        .unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS);
    let mut components = PipelineComponents::offline(dimensions);

    if let Some(path) = &cli.tokenizer {
        components.tokenizer = Box::new(HuggingFaceTokenizer::from_file(path)?);
    }

    if let Some(endpoint) = &cli.encoder.embedding_endpoint {
        let endpoint_config = |model: &str| EmbeddingEndpointConfig {
            base_url: endpoint.clone(),
            api_key: cli.encoder.embedding_api_key.clone(),
            model: model.to_string(),
            dimensions,
        };
        let question_model = cli
            .encoder
            .question_model
            .as_deref()
            .unwrap_or(&cli.encoder.context_model);

        components.context_encoder =
            Box::new(HttpEmbedder::new(endpoint_config(&cli.encoder.context_model))?);
        components.question_encoder = Box::new(HttpEmbedder::new(endpoint_config(question_model))?);
    }

    Ok(components)
}

fn run_interactive(context: &PipelineContext, top_k: usize) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "question> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("quit") || question.eq_ignore_ascii_case("exit") {
            break;
        }

        match context.answer(question, top_k) {
            Ok(answer) => writeln!(stdout, "{}\n", format_answer(&answer))?,
            Err(error) => {
                warn!(%error, "question failed");
                writeln!(stdout, "error: {error}\n")?;
            }
        }
    }

    Ok(())
}

fn format_answer(answer: &Answer) -> String {
    let mut lines = Vec::new();
    for hit in &answer.hits {
        lines.push(format!("{}. {}", hit.rank, hit.text));
        lines.push(format!("   distance: {:.2}", hit.distance));
    }

    lines.push(String::new());
    lines.push(format!(
        "retrieval time: {:.2} seconds",
        answer.retrieval_time.as_secs_f64()
    ));
    if !answer.index_build_time.is_zero() {
        lines.push(format!(
            "index build time: {:.2} seconds",
            answer.index_build_time.as_secs_f64()
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::{Embedder, RankedChunk};
    use std::time::Duration;

    fn answer(index_build_time: Duration) -> Answer {
        Answer {
            question: "who is Dulcinea?".to_string(),
            hits: vec![
                RankedChunk {
                    rank: 1,
                    chunk_index: 4,
                    text: "Dulcinea del Toboso".to_string(),
                    distance: 0.123,
                },
                RankedChunk {
                    rank: 2,
                    chunk_index: 0,
                    text: "In a village of La Mancha".to_string(),
                    distance: 1.5,
                },
            ],
            retrieval_time: Duration::from_millis(20),
            index_build_time,
        }
    }

    #[test]
    fn answers_list_rank_text_and_distance() {
        let formatted = format_answer(&answer(Duration::ZERO));
        assert!(formatted.starts_with("1. Dulcinea del Toboso\n   distance: 0.12\n2. In a village"));
        assert!(formatted.contains("retrieval time: 0.02 seconds"));
        assert!(!formatted.contains("index build time"));
    }

    #[test]
    fn fresh_index_build_time_is_reported() {
        let formatted = format_answer(&answer(Duration::from_millis(1500)));
        assert!(formatted.ends_with("index build time: 1.50 seconds"));
    }

    #[test]
    fn cli_flags_map_onto_pipeline_options() {
        let cli = Cli::parse_from([
            "docqa",
            "--pdf",
            "Mancha.pdf",
            "--chunk-size",
            "120",
            "--overlap",
            "20",
            "--keep-hyphens",
            "ask",
            "--question",
            "who?",
        ]);
        let options = pipeline_options(&cli);

        assert_eq!(options.source_pdf, PathBuf::from("Mancha.pdf"));
        assert_eq!(options.chunking.chunk_size, 120);
        assert_eq!(options.chunking.overlap, 20);
        assert!(!options.cleaning.cleanup_hyphens);
        assert!(options.cleaning.remove_headers_footers);
        assert_eq!(options.encode.batch_size, 32);
    }

    #[test]
    fn endpoint_without_dimensions_is_rejected() {
        let result = Cli::try_parse_from([
            "docqa",
            "--pdf",
            "Mancha.pdf",
            "--embedding-endpoint",
            "http://localhost:8080/v1",
            "prepare",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn endpoint_encoders_use_the_given_dimensions() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "docqa",
            "--pdf",
            "Mancha.pdf",
            "--embedding-endpoint",
            "http://localhost:8080/v1",
            "--dimensions",
            "1536",
            "prepare",
        ])?;
        let components = build_components(&cli)?;

        assert_eq!(components.context_encoder.dimensions(), 1536);
        assert_eq!(components.question_encoder.dimensions(), 1536);
        Ok(())
    }

    #[test]
    fn offline_encoders_default_their_dimensions() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["docqa", "--pdf", "Mancha.pdf", "prepare"])?;
        let components = build_components(&cli)?;
        assert_eq!(
            components.context_encoder.dimensions(),
            DEFAULT_EMBEDDING_DIMENSIONS
        );
        Ok(())
    }
}
