use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rx_desk_core::{
    config::ClientConfig, logging::init_logging, EntityClient, HttpEntityClient, LocalStore,
    PrescriptionDocument,
};
use rx_desk_print::{DocumentRenderer, HtmlRenderer, JsonRenderer};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Print preview page
    Html,
    /// A4 PDF download
    Pdf,
    /// Document view model
    Json,
}

#[derive(Parser)]
#[command(name = "rx-print")]
#[command(about = "Render a saved prescription for printing")]
struct Cli {
    /// Prescription system id
    id: i64,
    /// Output format
    #[arg(long, value_enum, default_value = "html")]
    format: Format,
    /// Output file (defaults to the document's own file name)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Backend base URL (overrides RX_DESK_API_URL)
    #[arg(long)]
    api_url: Option<String>,
    /// Read from a local store instead of the backend
    #[arg(long, conflicts_with = "api_url")]
    store: Option<PathBuf>,
    /// Open the print dialog when the preview loads
    #[arg(long)]
    auto_print: bool,
}

fn client(cli: &Cli) -> Result<Box<dyn EntityClient>> {
    if let Some(path) = &cli.store {
        let store = LocalStore::open(path)
            .with_context(|| format!("opening local store {}", path.display()))?;
        return Ok(Box::new(store));
    }

    let config = match &cli.api_url {
        Some(url) => ClientConfig::for_base_url(url)?,
        None => ClientConfig::from_env()?,
    };
    Ok(Box::new(HttpEntityClient::new(&config)?))
}

fn renderer(cli: &Cli) -> Result<Box<dyn DocumentRenderer>> {
    let renderer: Box<dyn DocumentRenderer> = match cli.format {
        Format::Html => Box::new(HtmlRenderer::new().with_auto_print(cli.auto_print)),
        #[cfg(feature = "pdf")]
        Format::Pdf => Box::new(rx_desk_print::PdfRenderer::new()),
        #[cfg(not(feature = "pdf"))]
        Format::Pdf => anyhow::bail!("rx-print was built without the `pdf` feature"),
        Format::Json => Box::new(JsonRenderer),
    };
    Ok(renderer)
}

fn main() -> Result<()> {
    init_logging(None);
    let cli = Cli::parse();

    let client = client(&cli)?;
    let doc = PrescriptionDocument::load(client.as_ref(), cli.id)
        .with_context(|| format!("loading prescription {}", cli.id))?;
    let rendered = renderer(&cli)?.render(&doc)?;

    let path = cli
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&rendered.file_name));
    std::fs::write(&path, &rendered.bytes)
        .with_context(|| format!("writing {}", path.display()))?;

    tracing::info!(path = %path.display(), media_type = rendered.media_type, "document written");
    println!("{}", path.display());
    Ok(())
}
