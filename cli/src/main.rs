//! typeset CLI - manuscript to EPUB and print PDF
//!
//! A command-line tool for turning DOCX manuscripts into publications.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use typeset::config::{self, TypesetConfig};
use typeset::render::{CommandLayout, HtmlLayout};
use typeset::{convert_all, output_stem, OutputFormat, Publisher};

/// DOCX manuscripts to EPUB and print-ready PDF
#[derive(Parser)]
#[command(
    name = "typeset",
    version,
    about = "Transform Word documents into print-ready PDFs and EPUBs",
    long_about = "typeset - Turn word-processor manuscripts into publications.\n\n\
                  Builds a reflowable EPUB package and a paginated print layout\n\
                  from one DOCX source.\n\n\
                  Usage:\n  \
                  typeset convert manuscript.docx\n  \
                  typeset convert book.docx -f epub -o ./dist\n  \
                  typeset convert book.docx -c myconfig.yaml"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a Word document to EPUB and/or PDF
    Convert {
        /// Input Word document (.docx)
        input: PathBuf,

        /// Output directory (default: from configuration, ./output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (YAML); repeat to layer files
        #[arg(short, long)]
        config: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "both")]
        format: FormatChoice,

        /// Override book title
        #[arg(short, long)]
        title: Option<String>,

        /// Override book author
        #[arg(short, long)]
        author: Option<String>,

        /// HTML-to-PDF program, or "html" to write the print HTML only
        #[arg(long, default_value = "weasyprint")]
        pdf_engine: String,

        /// Derive the EPUB identifier from title and authors when no ISBN is set
        #[arg(long)]
        deterministic_id: bool,
    },

    /// Initialize a new configuration file with defaults
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "./typeset.yaml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        config: PathBuf,
    },

    /// Show information about a Word document
    Info {
        /// Input Word document (.docx)
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

/// Output format selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatChoice {
    /// EPUB package only
    Epub,
    /// Print layout only
    Pdf,
    /// Both formats
    Both,
}

impl FormatChoice {
    fn formats(self) -> Vec<OutputFormat> {
        match self {
            FormatChoice::Epub => vec![OutputFormat::Epub],
            FormatChoice::Pdf => vec![OutputFormat::Pdf],
            FormatChoice::Both => OutputFormat::ALL.to_vec(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::builder()
        .filter_module("typeset", level)
        .parse_default_env()
        .try_init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            format,
            title,
            author,
            pdf_engine,
            deterministic_id,
        } => {
            let mut cfg = load_configuration(&config)?;

            if let Some(title) = title {
                cfg.metadata.title = Some(title);
            }
            if let Some(author) = author {
                cfg.metadata.authors = vec![author];
            }
            if let Some(output) = output {
                cfg.output_dir = output;
            }
            if deterministic_id {
                cfg.epub = cfg.epub.deterministic();
            }

            run_convert(&input, cfg, format, &pdf_engine)?;
        }

        Commands::Init { output, force } => {
            config::write_default_config(&output, force)?;
            println!(
                "{} Configuration file created: {}",
                "✓".green().bold(),
                output.display()
            );
            println!();
            println!("Edit this file to customize your book's metadata and formatting.");
        }

        Commands::Validate { config: path } => {
            let cfg = config::load_config(&path)?;
            cfg.validate()?;

            println!("{}", "Configuration is valid".green().bold());
            println!("{}", "─".repeat(40));
            println!(
                "{}: {}",
                "Title".bold(),
                cfg.metadata.title.as_deref().unwrap_or("(from document)")
            );
            println!("{}: {}", "Authors".bold(), authors_or_default(&cfg.metadata.authors));
            println!("{}: {}", "Page size".bold(), cfg.pdf.page_size);
            println!("{}: EPUB {}", "EPUB".bold(), cfg.epub.version.as_str());
            println!("{}: {}", "Output directory".bold(), cfg.output_dir.display());
            print_warnings(&cfg);
        }

        Commands::Info { input, json } => {
            let pb = create_spinner("Analyzing document...");
            let format = typeset::detect_format_from_path(&input)?;
            let doc = typeset::build_file(&input, &TypesetConfig::default())?;
            pb.finish_and_clear();

            let metadata = &doc.metadata;
            if json {
                let chapters: Vec<_> = doc
                    .chapters
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "id": c.id,
                            "title": c.title,
                            "words": c.word_count(),
                        })
                    })
                    .collect();
                let info = serde_json::json!({
                    "format": format.to_string(),
                    "title": metadata.title,
                    "authors": metadata.authors,
                    "language": metadata.language,
                    "word_count": doc.word_count(),
                    "footnotes": doc.footnotes.len(),
                    "images": doc.images.len(),
                    "chapters": chapters,
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
                return Ok(());
            }

            println!("{}", "Document Information".cyan().bold());
            println!("{}", "─".repeat(40));
            println!(
                "{}: {}",
                "File".bold(),
                input.file_name().unwrap_or_default().to_string_lossy()
            );
            println!("{}: {}", "Format".bold(), format);
            println!("{}: {}", "Title".bold(), metadata.title);
            println!("{}: {}", "Authors".bold(), authors_or_default(&metadata.authors));
            println!("{}: {}", "Language".bold(), metadata.language);
            println!("{}: {}", "Chapters".bold(), doc.chapters.len());
            println!("{}: ~{}", "Word count".bold(), doc.word_count());
            println!("{}: {}", "Footnotes".bold(), doc.footnotes.len());
            println!("{}: {}", "Images".bold(), doc.images.len());

            if !doc.chapters.is_empty() {
                println!("\n{}", "Chapters".cyan().bold());
                println!("{}", "─".repeat(40));
                for (i, chapter) in doc.chapters.iter().enumerate() {
                    let title = if chapter.is_untitled() {
                        "(Untitled)"
                    } else {
                        chapter.title.as_str()
                    };
                    println!("  {}. {}", i + 1, title);
                }
            }
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

/// Loads the given configuration layers, or the nearest discovered file.
fn load_configuration(paths: &[PathBuf]) -> Result<TypesetConfig, Box<dyn std::error::Error>> {
    let cfg = if !paths.is_empty() {
        config::load_layered(paths)?
    } else if let Some(found) = config::find_config_file(std::env::current_dir()?) {
        println!(
            "{}",
            format!("Using configuration: {}", found.display()).dimmed()
        );
        config::load_config(&found)?
    } else {
        TypesetConfig::default()
    };

    cfg.validate()?;
    print_warnings(&cfg);
    Ok(cfg)
}

/// Builds the document and writes the requested formats.
///
/// Fails when the document cannot be built or when no format could be written.
fn run_convert(
    input: &Path,
    cfg: TypesetConfig,
    format: FormatChoice,
    pdf_engine: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = create_spinner("Parsing document...");

    let doc = match typeset::build_file(input, &cfg) {
        Ok(doc) => doc,
        Err(e) => {
            pb.finish_and_clear();
            return Err(format!("Parse error: {}", e).into());
        }
    };

    let stem = output_stem(&doc.metadata.title, input);
    let output_dir = cfg.output_dir.clone();
    std::fs::create_dir_all(&output_dir)?;

    let mut publisher = Publisher::new(cfg.epub, cfg.pdf);
    if pdf_engine.eq_ignore_ascii_case("html") {
        publisher = publisher.with_layout(HtmlLayout);
    } else {
        publisher = publisher.with_layout(CommandLayout::new(pdf_engine));
    }

    let formats = format.formats();
    let names: Vec<String> = formats.iter().map(|f| f.to_string()).collect();
    pb.set_message(format!("Generating {}...", names.join(" and ")));
    let report = convert_all(&publisher, &doc, &formats, &output_dir, &stem);
    pb.finish_and_clear();

    println!("{}", "Conversion Results".cyan().bold());
    println!("{}", "─".repeat(40));
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!(
                "  {} {} saved: {}",
                "✓".green(),
                outcome.format,
                outcome.output.display()
            ),
            Err(e) => println!("  {} {}", "✗".red(), e),
        }
    }

    println!("\n{}", "Statistics".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("{}: {}", "Title".bold(), doc.metadata.title);
    println!("{}: {}", "Chapters".bold(), doc.chapters.len());
    println!("{}: ~{}", "Words".bold(), doc.word_count());

    if report.successes().next().is_none() {
        return Err("no output was written".into());
    }

    println!();
    if report.all_succeeded() {
        println!("{}", "Conversion complete!".green().bold());
    } else {
        println!("{}", "Conversion finished with errors".yellow().bold());
    }
    Ok(())
}

fn authors_or_default(authors: &[String]) -> String {
    if authors.is_empty() {
        "Not specified".to_string()
    } else {
        authors.join(", ")
    }
}

fn print_warnings(cfg: &TypesetConfig) {
    for warning in cfg.warnings() {
        eprintln!("{}: {}", "Warning".yellow().bold(), warning);
    }
}

fn print_version() {
    println!("{} {}", "typeset".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Word manuscripts to EPUB and print-ready PDF");
    println!();
    println!("Source formats: DOCX");
    println!("Output formats: EPUB 2.0/3.0, PDF (via an HTML-to-PDF engine)");
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
