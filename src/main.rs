// Entry point and terminal front end.
//
// - With a FILE argument: one run, render (or print JSON), optionally export.
// - Without one: a menu to upload files one after another and export the
//   most recent report. Each upload replaces the previous report entirely.
use anyhow::{bail, Result};
use attendance_report::{
    output, pipeline, AttendanceReport, HeaderSkip, ReportConfig, Strictness,
};
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(
    name = "attendance-report",
    version,
    about = "Class-wise attendance summary (Class x Gender) from a .csv or spreadsheet upload",
    long_about = "Reads an attendance sheet, counts present and absent marks per student, \
                  and summarizes them by class and gender.\n\n\
                  EXAMPLES:\n  \
                  attendance-report week3.xlsx --skip 5\n  \
                  attendance-report week3.csv --auto-header --strict --out-dir reports/\n  \
                  attendance-report            # interactive menu"
)]
struct Args {
    /// Attendance file (.csv, .xlsx, .xlsm, .xlsb, .xls, .ods)
    file: Option<PathBuf>,

    /// Banner rows above the header row to discard
    #[arg(long, default_value_t = 0, conflicts_with = "auto_header")]
    skip: usize,

    /// Use the first row naming Student Name, Class and Gender as the header
    #[arg(long)]
    auto_header: bool,

    /// Drop rows with an empty Student Name, Class or Gender
    #[arg(long)]
    strict: bool,

    /// Reject files with more rows than this
    #[arg(long, default_value_t = attendance_report::config::DEFAULT_MAX_ROWS)]
    max_rows: usize,

    /// Normalized rows shown in the preview
    #[arg(long, default_value_t = attendance_report::config::DEFAULT_PREVIEW_ROWS)]
    preview_rows: usize,

    /// Write summary.csv, pivot.csv and report.json into this directory
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> attendance_report::Result<ReportConfig> {
        let header_skip = if self.auto_header {
            HeaderSkip::Auto
        } else {
            HeaderSkip::Fixed(self.skip)
        };
        let strictness = if self.strict {
            Strictness::Strict
        } else {
            Strictness::Lenient
        };
        ReportConfig::builder()
            .header_skip(header_skip)
            .strictness(strictness)
            .max_rows(self.max_rows)
            .preview_rows(self.preview_rows)
            .build()
    }
}

fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "error" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

// The interactive session keeps only the latest report so it can be exported.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { report: None }));

struct AppState {
    report: Option<AttendanceReport>,
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn show(report: &AttendanceReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", output::render_report(report));
    }
    Ok(())
}

fn export(report: &AttendanceReport, dir: &Path) {
    match output::export(report, dir) {
        Ok(paths) => println!(
            "Exported {}, {} and {}\n",
            paths.summary.display(),
            paths.pivot.display(),
            paths.report.display()
        ),
        Err(e) => eprintln!("Write error: {}\n", e),
    }
}

/// Option [1]: run the pipeline on a new file and make it the current report.
fn handle_upload(config: &ReportConfig, json: bool) {
    let path = read_line("Path to attendance file: ");
    if path.is_empty() {
        println!("No file given.\n");
        return;
    }
    let mut state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    state.report = None;
    match pipeline::run_path(Path::new(&path), config) {
        Ok(report) => {
            if let Err(e) = show(&report, json) {
                eprintln!("{}\n", e);
            }
            state.report = Some(report);
        }
        Err(e) => {
            debug!("Run failed: {:?}", e);
            eprintln!("{}\n", pipeline::user_message(&e));
        }
    }
}

/// Option [2]: export the current report.
fn handle_export(default_dir: Option<&Path>) {
    let state = APP_STATE.lock().unwrap_or_else(|e| e.into_inner());
    let Some(report) = state.report.as_ref() else {
        println!("Error: No report yet. Upload a file first (option 1).\n");
        return;
    };
    let dir = match default_dir {
        Some(d) => d.to_path_buf(),
        None => {
            let input = read_line("Output directory [.]: ");
            PathBuf::from(if input.is_empty() { "." } else { input.as_str() })
        }
    };
    export(report, &dir);
}

fn interactive(config: &ReportConfig, args: &Args) {
    loop {
        println!("Class-wise Attendance Summary");
        println!("[1] Upload attendance file");
        println!("[2] Export current report");
        println!("[3] Exit\n");
        match read_line("Enter choice: ").as_str() {
            "1" => handle_upload(config, args.json),
            "2" => handle_export(args.out_dir.as_deref()),
            "3" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    let config = match args.config() {
        Ok(c) => c,
        Err(e) => bail!(pipeline::user_message(&e)),
    };
    debug!("Config: {:?}", config);

    let Some(file) = args.file.as_deref() else {
        interactive(&config, &args);
        return Ok(());
    };

    match pipeline::run_path(file, &config) {
        Ok(report) => {
            show(&report, args.json)?;
            if let Some(dir) = args.out_dir.as_deref() {
                export(&report, dir);
            }
            Ok(())
        }
        Err(e) => {
            error!("{} failed: {}", file.display(), e.error_code());
            eprintln!("{}", pipeline::user_message(&e));
            std::process::exit(1);
        }
    }
}
