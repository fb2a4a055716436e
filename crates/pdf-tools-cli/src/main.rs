mod driver;
mod logger;
mod thumbnails;

use anyhow::{Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use driver::WorkerClient;
use pdf_async_runtime::{PageId, PageSummary, PdfCommand};
use pdf_organize::{AssemblyOptions, ImageOrientation, PaperSize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdft", about = "Merge and reorganize PDF pages and images", version)]
struct Cli {
    /// More output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge PDFs and images into one PDF, in the order given
    Merge {
        /// Input files (PDF, PNG, JPEG, GIF, WebP, ...)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rotate, drop and reorder pages before merging
    Organize {
        /// Input files (PDF, PNG, JPEG, GIF, WebP, ...)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Rotate page N (1-based) a quarter turn clockwise; repeat to turn further
        #[arg(long, value_name = "N")]
        rotate: Vec<usize>,

        /// Drop page N (1-based)
        #[arg(long, value_name = "N")]
        remove: Vec<usize>,

        /// Move these pages to the front, in this order (e.g. 3,1)
        #[arg(long, value_delimiter = ',', value_name = "N,..")]
        order: Vec<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the pages the inputs would contribute
    Pages {
        /// Input files (PDF, PNG, JPEG, GIF, WebP, ...)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Write each page's thumbnail as PNG into this directory
        #[arg(long, value_name = "DIR")]
        thumbnails: Option<PathBuf>,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Output PDF file [default: merged-pdf-<timestamp>.pdf]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stamp page numbers at the bottom of every page
    #[arg(long)]
    page_numbers: bool,

    /// Orientation of pages made from images
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Largest page an image may produce
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Assembly options as JSON; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Auto,
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl From<OrientationArg> for ImageOrientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Auto => Self::Auto,
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

impl OutputArgs {
    async fn options(&self) -> Result<AssemblyOptions> {
        let mut options = match &self.config {
            Some(path) => AssemblyOptions::load(path).await?,
            None => AssemblyOptions::default(),
        };
        if self.page_numbers {
            options.add_page_numbers = true;
        }
        if let Some(orientation) = self.orientation {
            options.image_orientation = orientation.into();
        }
        if let Some(paper) = self.paper {
            options.image_page_limit = paper.into();
        }
        options.validate()?;
        Ok(options)
    }

    fn path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(pdf_organize::default_output_name()))
    }
}

/// Map 1-based positions onto page ids of the freshly ingested list
fn resolve(pages: &[PageSummary], positions: &[usize], flag: &str) -> Result<Vec<PageId>> {
    positions
        .iter()
        .map(|&pos| match pos.checked_sub(1).and_then(|idx| pages.get(idx)) {
            Some(page) => Ok(page.id),
            None => bail!(
                "--{} {}: no such page (inputs have {} page(s))",
                flag,
                pos,
                pages.len()
            ),
        })
        .collect()
}

async fn run_merge(input: Vec<PathBuf>, output: OutputArgs) -> Result<()> {
    let options = output.options().await?;
    let mut client = WorkerClient::spawn();
    client.ingest(input).await?;
    finish(client, options, output.path()).await
}

async fn run_organize(
    input: Vec<PathBuf>,
    rotate: Vec<usize>,
    remove: Vec<usize>,
    order: Vec<usize>,
    output: OutputArgs,
) -> Result<()> {
    let options = output.options().await?;
    let mut client = WorkerClient::spawn();
    let pages = client.ingest(input).await?;

    let rotate = resolve(&pages, &rotate, "rotate")?;
    let remove = resolve(&pages, &remove, "remove")?;
    let order = resolve(&pages, &order, "order")?;

    for page in rotate {
        client.edit(PdfCommand::Rotate { page }).await?;
    }
    for &page in &remove {
        client.edit(PdfCommand::RemovePage { page }).await?;
    }
    let survivors = order.into_iter().filter(|id| !remove.contains(id));
    for (target_index, page) in survivors.enumerate() {
        client
            .edit(PdfCommand::Reorder { page, target_index })
            .await?;
    }

    finish(client, options, output.path()).await
}

async fn finish(mut client: WorkerClient, options: AssemblyOptions, path: PathBuf) -> Result<()> {
    let outcome = client.assemble(options, path.clone()).await?;
    client.shutdown().await?;

    for skipped in &outcome.skipped {
        eprintln!(
            "Skipped {} ({}): {}",
            skipped.file_name, skipped.page, skipped.reason
        );
    }
    println!("Wrote {} page(s) → {}", outcome.page_count, path.display());
    Ok(())
}

async fn run_pages(input: Vec<PathBuf>, thumbnail_dir: Option<PathBuf>) -> Result<()> {
    let outcome = pdf_organize::ingest_files(&input).await?;
    for failure in &outcome.failures {
        eprintln!("Skipped {}: {}", failure.name, failure.error);
    }

    if let Some(dir) = &thumbnail_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let mut position = 0;
    let mut written = 0;
    for ingested in &outcome.ingested {
        for page in &ingested.pages {
            position += 1;
            let (width, height) = page.thumbnail().dimensions();
            println!(
                "{:>4}  {}  page {}  {}x{}",
                position,
                page.file_name(),
                page.page_index(),
                width,
                height
            );
            if let Some(dir) = &thumbnail_dir {
                if thumbnails::write_thumbnail(page.clone(), position, dir.clone()).await? {
                    written += 1;
                }
            }
        }
    }

    if let Some(dir) = &thumbnail_dir {
        if written < position {
            eprintln!(
                "{} page(s) have no rendered preview (pdfium not available)",
                position - written
            );
        }
        println!("Wrote {} thumbnail(s) → {}", written, dir.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::StderrLogger::from_verbosity(cli.verbose).init()?;

    match cli.command {
        Commands::Merge { input, output } => run_merge(input, output).await,
        Commands::Organize {
            input,
            rotate,
            remove,
            order,
            output,
        } => run_organize(input, rotate, remove, order, output).await,
        Commands::Pages { input, thumbnails } => run_pages(input, thumbnails).await,
    }
}
