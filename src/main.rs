//! html2wordml - HTML to WordprocessingML converter

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use html2wordml::{ConvertConfig, Converter, fetch_location};

#[derive(Parser)]
#[command(name = "html2wordml")]
#[command(version, about = "Convert HTML to WordprocessingML", long_about = None)]
#[command(after_help = "EXAMPLES:
    html2wordml -p http://host/docs -c -o page.docx page.html
                                  Build a .docx, fetching images from http://host/docs
    html2wordml -p . page.html    Print document.xml with image placeholders")]
struct Cli {
    /// HTML file path or URL
    #[arg(value_name = "HTMLFILE")]
    htmlfile: String,

    /// Base path or URL prefixed to every image src
    #[arg(short = 'p', long, value_name = "BASE")]
    basepath: String,

    /// Produce a .docx package instead of raw document markup
    #[arg(short, long)]
    create_package: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Template .docx to build the package from
    #[arg(long, value_name = "DOCX")]
    template: Option<PathBuf>,

    /// Rule table replacing the bundled one
    #[arg(long, value_name = "XML")]
    stylesheet: Option<PathBuf>,

    /// Timeout for each image fetch, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log pipeline stages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> html2wordml::Result<()> {
    let config = ConvertConfig::default()
        .with_create_package(cli.create_package)
        .with_fetch_timeout(Duration::from_secs(cli.timeout));

    let mut builder = Converter::builder().config(config);
    if let Some(path) = &cli.template {
        builder = builder.template_path(path);
    }
    if let Some(path) = &cli.stylesheet {
        builder = builder.stylesheet_path(path);
    }
    let converter = builder.build()?;

    let html = fetch_location(&cli.htmlfile)?;
    let output = converter.convert(&cli.basepath, &html)?;

    match &cli.output {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path)?);
            file.write_all(output.as_bytes())?;
            file.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
