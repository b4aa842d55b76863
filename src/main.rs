mod error;
mod fetch;
mod merge;
mod parser;
mod program;
mod record;
mod settings;
mod store;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use error::AppError;
use fetch::{ChromeFetcher, FetchError, FetchedPage, Headers, HttpFetcher, PageFetcher};
use parser::{Extract, PlayerExtractor};
use program::ProgramId;
use settings::AppConfig;
use store::{Format, Output};

#[derive(Parser)]
#[command(name = "radio_ondemand", about = "On-demand radio episode list scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a program page and merge its episodes into the local list
    List {
        /// Program ID (e.g. BR8Z3NX7XM)
        program_id: String,
        /// Output path (default: stdout for csv/table, <ID>.json for json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Timeout in seconds (default: 30, or the configured value)
        #[arg(long)]
        timeout: Option<u64>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Existing collection to merge into (default: <ID>.csv or <ID>.json)
        #[arg(long)]
        existing: Option<PathBuf>,
        /// Plain HTTP GET instead of a headless browser render
        #[arg(long)]
        static_fetch: bool,
    },
    /// Download the rendered HTML of a program page
    Html {
        /// Program ID (e.g. BR8Z3NX7XM)
        program_id: String,
        /// File path to save HTML (default: stdout); always written as UTF-8, whatever charset the server declared
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Timeout in seconds (default: 30, or the configured value)
        #[arg(long)]
        timeout: Option<u64>,
        /// Plain HTTP GET instead of a headless browser render
        #[arg(long)]
        static_fetch: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = run(cli);
    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {:.1}s", elapsed.as_secs_f64());
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::List {
            program_id,
            output,
            timeout,
            format,
            existing,
            static_fetch,
        } => {
            let id = ProgramId::new(&program_id)?;
            let config = AppConfig::load()?;
            let extractor = PlayerExtractor::from_config(&config)?;
            let request = FetchRequest::new(&id, &config, timeout);
            let fetcher = build_fetcher(&config, &request, static_fetch)?;

            let job = ListJob {
                existing: existing.unwrap_or_else(|| id.file_name(format.extension()).into()),
                output: match output {
                    Some(path) => Output::File(path),
                    None if format.writes_file_by_default() => {
                        Output::File(id.file_name(format.extension()).into())
                    }
                    None => Output::Stdout,
                },
                format,
            };
            run_list(fetcher.as_ref(), &extractor, &request, &job)
        }
        Commands::Html {
            program_id,
            output,
            timeout,
            static_fetch,
        } => {
            let id = ProgramId::new(&program_id)?;
            let config = AppConfig::load()?;
            let request = FetchRequest::new(&id, &config, timeout);
            let fetcher = build_fetcher(&config, &request, static_fetch)?;

            let page = fetch_page(fetcher.as_ref(), &request)?;
            if !page.encoding.eq_ignore_ascii_case("utf-8") {
                warn!(
                    "Server declared {}; saving as UTF-8, so any <meta charset> in the markup no longer matches",
                    page.encoding
                );
            }
            let output = output.map(Output::File).unwrap_or(Output::Stdout);
            store::write_output(&output, &page.markup).map_err(|source| AppError::Write {
                target: output.describe(),
                source,
            })?;
            info!("Saved {} ({}) to {}", request.url, page.encoding, output.describe());
            Ok(())
        }
    }
}

/// Everything needed to fetch one program page.
struct FetchRequest {
    url: String,
    timeout: Duration,
    headers: Headers,
}

impl FetchRequest {
    fn new(id: &ProgramId, config: &AppConfig, timeout_secs: Option<u64>) -> Self {
        Self {
            url: id.detail_url(&config.base_url),
            timeout: Duration::from_secs(timeout_secs.unwrap_or(config.timeout_secs)),
            headers: fetch::default_headers(&config.user_agent),
        }
    }
}

/// Where the merged collection comes from and goes to.
struct ListJob {
    existing: PathBuf,
    output: Output,
    format: Format,
}

fn build_fetcher(
    config: &AppConfig,
    request: &FetchRequest,
    static_fetch: bool,
) -> Result<Box<dyn PageFetcher>, AppError> {
    if static_fetch {
        return Ok(Box::new(HttpFetcher));
    }
    let ready = format!("[class*=\"{}\"]", config.marker);
    ChromeFetcher::launch(config.chrome_path.clone(), request.timeout, Some(ready))
        .map(|f| Box::new(f) as Box<dyn PageFetcher>)
        .map_err(|source| AppError::Fetch {
            url: request.url.clone(),
            source,
        })
}

fn fetch_page(fetcher: &dyn PageFetcher, request: &FetchRequest) -> Result<FetchedPage, AppError> {
    info!("Downloading from {}...", request.url);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("rendering page");
    pb.enable_steady_tick(Duration::from_millis(120));

    let result: Result<FetchedPage, FetchError> =
        fetcher.fetch(&request.url, request.timeout, &request.headers);
    pb.finish_and_clear();

    result.map_err(|source| AppError::Fetch {
        url: request.url.clone(),
        source,
    })
}

/// Fetch → extract → merge with the existing collection → write.
fn run_list(
    fetcher: &dyn PageFetcher,
    extractor: &dyn Extract,
    request: &FetchRequest,
    job: &ListJob,
) -> Result<(), AppError> {
    let page = fetch_page(fetcher, request)?;

    let episodes = extractor.extract(&page.markup);
    if episodes.is_empty() {
        return Err(AppError::EmptyExtraction);
    }
    info!("Extracted {} episodes", episodes.len());

    let existing = store::load_existing(&job.existing, job.format);
    let (merged, stats) = merge::merge(&existing, &episodes);
    info!(
        "Merged {} records ({} new, {} updated, {} carried forward)",
        merged.len(),
        stats.added,
        stats.updated,
        stats.carried
    );

    let write_err = |source| AppError::Write {
        target: job.output.describe(),
        source,
    };
    let text = job.format.encode(&merged).map_err(write_err)?;
    store::write_output(&job.output, &text).map_err(write_err)?;

    if let Output::File(path) = &job.output {
        info!("Wrote {} records to {}", merged.len(), path.display());
    }
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::record::Record;

    /// Serves a fixed page, or fails like a timed-out request.
    struct StubFetcher(Option<String>);

    impl PageFetcher for StubFetcher {
        fn fetch(&self, _url: &str, _timeout: Duration, _headers: &Headers) -> Result<FetchedPage, FetchError> {
            match &self.0 {
                Some(markup) => Ok(FetchedPage {
                    markup: markup.clone(),
                    encoding: "utf-8".into(),
                }),
                None => Err(FetchError::Browser("navigation timed out".into())),
            }
        }
    }

    fn fixture(name: &str) -> StubFetcher {
        StubFetcher(Some(fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()))
    }

    fn request() -> FetchRequest {
        let id = ProgramId::new("BR8Z3NX7XM").unwrap();
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "base_url": "https://radio.example/detail.html",
            "user_agent": "TestAgent",
            "timeout_secs": 5,
            "marker": "nol_audio_player",
            "stream_attr": "data-hlsurl",
            "metadata_attr": "data-content",
        }))
        .unwrap();
        FetchRequest::new(&id, &config, None)
    }

    fn extractor() -> PlayerExtractor {
        PlayerExtractor::new("nol_audio_player", "data-hlsurl", "data-content").unwrap()
    }

    #[test]
    fn fetch_request_from_config() {
        let req = request();
        assert_eq!(req.url, "https://radio.example/detail.html?p=BR8Z3NX7XM_01");
        assert_eq!(req.timeout, Duration::from_secs(5));
        assert_eq!(req.headers.get("User-Agent").map(String::as_str), Some("TestAgent"));
    }

    #[test]
    fn list_merges_into_existing_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BR8Z3NX7XM.json");
        fs::write(
            &path,
            r#"[
                {"title": "", "hls_url": "https://vod-stream.example.jp/radioondemand/r/BR8Z3NX7XM/episode1/index.m3u8", "get": 1},
                {"title": "Expired", "hls_url": "https://vod-stream.example.jp/old/index.m3u8", "get": 1}
            ]"#,
        )
        .unwrap();

        let job = ListJob {
            existing: path.clone(),
            output: Output::File(path.clone()),
            format: Format::Json,
        };
        run_list(&fixture("program"), &extractor(), &request(), &job).unwrap();

        let merged = Format::Json.decode(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(merged.len(), 4);
        let first = &merged[0];
        assert_eq!(first.title, "Radio News & Weather");
        assert_eq!(first.get, 1);
        assert_eq!(merged[3].title, "Expired");

        // Second run over its own output changes nothing
        let before = fs::read_to_string(&path).unwrap();
        run_list(&fixture("program"), &extractor(), &request(), &job).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn list_without_existing_writes_new_records() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let job = ListJob {
            existing: dir.path().join("BR8Z3NX7XM.csv"),
            output: Output::File(out.clone()),
            format: Format::Csv,
        };
        run_list(&fixture("program"), &extractor(), &request(), &job).unwrap();

        let written = Format::Csv.decode(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written, extractor().extract(&fixture("program").0.unwrap()));
        assert!(written.iter().all(|r: &Record| r.get == 0));
    }

    #[test]
    fn empty_extraction_is_an_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let job = ListJob {
            existing: dir.path().join("missing.csv"),
            output: Output::File(out.clone()),
            format: Format::Csv,
        };
        let err = run_list(&fixture("no_stream"), &extractor(), &request(), &job).unwrap_err();
        assert!(matches!(err, AppError::EmptyExtraction));
        assert_eq!(err.exit_code(), 1);
        assert!(!out.exists());
    }

    #[test]
    fn fetch_failure_is_reported_with_url() {
        let dir = tempfile::tempdir().unwrap();
        let job = ListJob {
            existing: dir.path().join("missing.csv"),
            output: Output::Stdout,
            format: Format::Csv,
        };
        let err = run_list(&StubFetcher(None), &extractor(), &request(), &job).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("Error downloading https://radio.example/detail.html?p=BR8Z3NX7XM_01"));
    }

    #[test]
    fn parse_list_defaults() {
        let cli = Cli::parse_from(["radio_ondemand", "list", "BR8Z3NX7XM"]);
        match cli.command {
            Commands::List {
                program_id,
                output,
                timeout,
                format,
                existing,
                static_fetch,
            } => {
                assert_eq!(program_id, "BR8Z3NX7XM");
                assert!(output.is_none());
                assert!(timeout.is_none());
                assert_eq!(format, Format::Csv);
                assert!(existing.is_none());
                assert!(!static_fetch);
            }
            _ => panic!("expected list subcommand"),
        }
    }

    #[test]
    fn parse_list_options() {
        let cli = Cli::parse_from([
            "radio_ondemand", "list", "BR8Z3NX7XM", "-o", "out.json", "--timeout", "60", "--format", "json",
            "--static-fetch",
        ]);
        match cli.command {
            Commands::List { output, timeout, format, static_fetch, .. } => {
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert_eq!(timeout, Some(60));
                assert_eq!(format, Format::Json);
                assert!(static_fetch);
            }
            _ => panic!("expected list subcommand"),
        }
    }

    #[test]
    fn parse_html() {
        let cli = Cli::parse_from(["radio_ondemand", "html", "BR8Z3NX7XM", "--output", "page.html"]);
        match cli.command {
            Commands::Html { program_id, output, .. } => {
                assert_eq!(program_id, "BR8Z3NX7XM");
                assert_eq!(output, Some(PathBuf::from("page.html")));
            }
            _ => panic!("expected html subcommand"),
        }
    }

    #[test]
    fn html_output_help_names_the_written_encoding() {
        use clap::CommandFactory;

        let cmd = Cli::command();
        let html = cmd.find_subcommand("html").unwrap();
        let output = html.get_arguments().find(|a| a.get_id() == "output").unwrap();
        assert!(output.get_help().unwrap().to_string().contains("UTF-8"));
    }

    #[test]
    fn bad_timeout_is_a_usage_error() {
        let err = Cli::try_parse_from(["radio_ondemand", "list", "BR8Z3NX7XM", "--timeout", "soon"]);
        assert!(err.is_err());
    }
}
