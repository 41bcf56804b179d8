//! Platemap CLI - reorder plate layouts between 96-well and 384-well ordering
//!
//! # Commands
//!
//! ```bash
//! platemap convert plates.xlsx --mode 384 -o sorted.xlsx   # Convert a file
//! platemap preview plates.csv                              # Show first rows + header guess
//! platemap position --plate 5 --well A1                    # Global 384 position of one well
//! platemap serve                                           # Start HTTP server (port 3000)
//! ```

use clap::{Parser, Subcommand};
use platemap::{
    convert_file, export, global_384_position, parse_file, plate_group, plates_in_group,
    ConvertOptions, FileFormat, Settings, ViewMode,
};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "platemap")]
#[command(about = "Toggle plate layout spreadsheets between 96-well and 384-well ordering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort a CSV or XLSX plate layout and write the result
    Convert {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// View mode (default from PLATEMAP_DEFAULT_MODE, else 96)
        #[arg(short, long, value_enum)]
        mode: Option<ViewMode>,

        /// Header row index (auto-detect if not specified)
        #[arg(long)]
        header_row: Option<usize>,

        /// Input format (taken from the extension if not specified)
        #[arg(long, value_enum)]
        input_format: Option<FileFormat>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: CSV on stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (taken from the output extension if not specified)
        #[arg(short, long, value_enum)]
        format: Option<FileFormat>,
    },

    /// Show the first rows of a file and the detected header row
    Preview {
        /// Input file (.csv or .xlsx)
        input: PathBuf,

        /// Number of rows to show
        #[arg(short, long)]
        rows: Option<usize>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Print the global 384-well position of a plate/well pair
    Position {
        /// Plate number
        #[arg(short, long)]
        plate: f64,

        /// 384-well label (A1..P24)
        #[arg(short, long)]
        well: String,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default from PLATEMAP_PORT, else 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let settings = Settings::from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            mode,
            header_row,
            input_format,
            delimiter,
            output,
            format,
        } => {
            let options = ConvertOptions {
                mode: mode.unwrap_or(settings.default_mode),
                header_row,
                header_scan_rows: settings.header_scan_rows,
                format: input_format,
                delimiter,
            };
            cmd_convert(&input, &options, output.as_deref(), format)
        }

        Commands::Preview {
            input,
            rows,
            delimiter,
        } => cmd_preview(&input, rows.unwrap_or(settings.preview_rows), delimiter, &settings),

        Commands::Position { plate, well } => cmd_position(plate, &well),

        Commands::Serve { port } => {
            let settings = Settings {
                port: port.unwrap_or(settings.port),
                ..settings
            };
            platemap::server::start_server(settings).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &Path,
    options: &ConvertOptions,
    output: Option<&Path>,
    format: Option<FileFormat>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Processing: {}", input.display());

    let result = convert_file(input, options)?;

    eprintln!("   Header row: {}{}", result.header_row, if result.header_detected { " (auto-detected)" } else { "" });
    eprintln!("   Columns: {}", result.sheet_info.headers.join(", "));
    eprintln!("   Rows: {} ({} sortable, {} kept in place)", result.dataset.len(), result.stats.sortable, result.stats.incomplete);
    eprintln!("\n⚙️  Displaying data in {}", result.mode);

    match output {
        Some(path) => {
            let format = match format {
                Some(f) => f,
                None => FileFormat::from_path(path)
                    .ok_or_else(|| format!("Cannot infer output format from {}; use --format", path.display()))?,
            };
            export::write_file(&result.dataset, path, format)?;
            eprintln!("💾 Output written to: {}", path.display());
        }
        None => {
            let format = format.unwrap_or(FileFormat::Csv);
            let bytes = export::to_bytes(&result.dataset, format)?;
            std::io::stdout().write_all(&bytes)?;
        }
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_preview(
    input: &Path,
    rows: usize,
    delimiter: Option<char>,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let sheet = parse_file(input, None, delimiter)?;

    eprintln!("📄 Preview of first {} rows ({} total):", rows.min(sheet.rows.len()), sheet.rows.len());
    if let Some(ref encoding) = sheet.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    for (i, row) in sheet.preview(rows).iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        println!("{:>4} | {}", i, cells.join(" | "));
    }

    eprintln!("\n🔍 Header Row Detection");
    match sheet.find_header_row(settings.header_scan_rows) {
        Some(row) => eprintln!("   ✅ Automatically detected header row at index {}", row),
        None => eprintln!("   ⚠️  No header row detected automatically (use --header-row)"),
    }

    Ok(())
}

fn cmd_position(plate: f64, well: &str) -> Result<(), Box<dyn std::error::Error>> {
    match global_384_position(Some(plate), Some(well)) {
        Some(position) => {
            if let Some(group) = plate_group(plate) {
                match plates_in_group(group) {
                    Some((first, last)) => eprintln!("   384-well plate group: {} (plates {}-{})", group, first, last),
                    None => eprintln!("   384-well plate group: {}", group),
                }
            }
            println!("{}", position);
            Ok(())
        }
        None => Err(format!("No global position for plate {} well {:?}", plate, well).into()),
    }
}
