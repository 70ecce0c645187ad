use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "panel")]
#[command(about = "Panel - synthetic persona surveys answered by an LLM", long_about = None)]
struct Cli {
    /// Print pipeline events as JSON lines on stdout
    #[arg(long, global = true)]
    events: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Question text given inline or read from a file.
#[derive(Args, Debug, Clone, Default)]
pub struct QuestionsArgs {
    /// Questions, one per line, each optionally followed by `(A / B / C)`
    #[arg(long, conflicts_with = "questions_file")]
    pub questions: Option<String>,

    /// File holding the question text
    #[arg(long)]
    pub questions_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a persona population for a segment
    Generate {
        /// Target segment description
        #[arg(long)]
        segment: String,
        /// Persona fields, one per line (e.g. "age: 18 to 65")
        #[arg(long, conflicts_with = "fields_file")]
        fields: Option<String>,
        /// File listing the persona fields
        #[arg(long)]
        fields_file: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        count: usize,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        /// Output file (.json or .csv)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the response schema for a question list
    Schema {
        #[command(flatten)]
        questions: QuestionsArgs,
    },
    /// Run a survey against a persona population
    Survey {
        /// Persona file (.json or .csv)
        #[arg(long)]
        personas: PathBuf,
        #[command(flatten)]
        questions: QuestionsArgs,
        #[arg(long)]
        participants: Option<usize>,
        /// Number of concurrent batches
        #[arg(long)]
        batches: Option<usize>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        /// Results file (.json or .csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also save the whole session as a snapshot
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Tally results, optionally filtered by persona fields
    Analyze {
        /// Results file (.json or .csv)
        #[arg(long, required_unless_present = "snapshot")]
        results: Option<PathBuf>,
        /// Session snapshot holding questions and results
        #[arg(long, conflicts_with = "results")]
        snapshot: Option<PathBuf>,
        #[command(flatten)]
        questions: QuestionsArgs,
        /// Filter as field=value; repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert personas or results between JSON and CSV
    Export {
        #[arg(long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Treat the input as personas rather than results
        #[arg(long)]
        personas: bool,
    },
    /// Load a demo snapshot and show its analysis without calling a model
    Demo {
        snapshot: PathBuf,
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let events = logging::init(cli.events)?;

    let outcome = match cli.command {
        Commands::Generate {
            segment,
            fields,
            fields_file,
            count,
            model,
            temperature,
            output,
        } => {
            commands::generate::run(commands::generate::GenerateArgs {
                segment,
                fields,
                fields_file,
                count,
                model,
                temperature,
                output,
            })
            .await
        }
        Commands::Schema { questions } => commands::schema::run(&questions).await,
        Commands::Survey {
            personas,
            questions,
            participants,
            batches,
            model,
            temperature,
            output,
            snapshot,
        } => {
            commands::survey::run(commands::survey::SurveyArgs {
                personas,
                questions,
                participants,
                batches,
                model,
                temperature,
                output,
                snapshot,
            })
            .await
        }
        Commands::Analyze {
            results,
            snapshot,
            questions,
            filters,
            json,
        } => commands::analyze::run(results, snapshot, &questions, &filters, json).await,
        Commands::Export {
            input,
            output,
            personas,
        } => commands::export::run(&input, &output, personas).await,
        Commands::Demo { snapshot, filters } => commands::demo::run(&snapshot, &filters).await,
    };

    if let Some(events) = events {
        events.shutdown().await;
    }
    outcome
}
