use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use regex_page_search::config::{OptionsStore, SearchOptions};
use regex_page_search::engine::pipeline::PageLoader;
use regex_page_search::page::{HtmlPage, Target, TargetId};
use regex_page_search::protocol::{Command, Response};
use regex_page_search::session::SessionRegistry;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Regex find & replace over the visible text of a page
#[derive(Parser, Debug)]
#[command(name = "regex-page-search", version)]
struct Cli {
    /// Page to search: http(s) URL, file:// URL or local path
    target: String,

    /// Search once for PATTERN and print every occurrence. Without it,
    /// commands are read as JSON lines from stdin.
    #[arg(short, long, value_name = "PATTERN")]
    query: Option<String>,

    /// Replace every occurrence of the query and print the resulting text
    #[arg(short, long, requires = "query", value_name = "TEXT")]
    replace: Option<String>,

    /// Options file [default: ~/.regex-page-search.json]
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Treat the pattern as literal text
    #[arg(short = 'F', long)]
    literal: bool,

    #[arg(short, long)]
    ignore_case: bool,

    /// Stop after this many occurrences (0 = no cap)
    #[arg(short, long)]
    max_results: Option<usize>,

    /// Text to report as selected in the page
    #[arg(long)]
    selection: Option<String>,

    /// Write the effective options back to the options file
    #[arg(long)]
    save_options: bool,

    /// Characters of context around each printed occurrence
    #[arg(long, default_value_t = 30)]
    context: usize,
}

impl Cli {
    fn search_options(&self, store: &OptionsStore) -> SearchOptions {
        let mut options = store.load();
        if self.literal {
            options = options.literal();
        }
        if self.ignore_case {
            options = options.case_insensitive();
        }
        if let Some(max) = self.max_results {
            options = options.with_max_results(max);
        }
        options
    }
}

fn main() -> CliResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    let store = OptionsStore::new(cli.options.clone().unwrap_or_else(OptionsStore::default_path));
    let options = cli.search_options(&store);
    if cli.save_options {
        store.save(&options)?;
        log::info!("Saved options to {}", store.path().display());
    }

    let page = PageLoader::new()
        .with_selection(cli.selection.clone())
        .load_or_unreachable(&cli.target);
    log::info!("Loaded {:?} from {}", page.title(), page.url());

    let mut registry = SessionRegistry::new(options.clone());
    let id = pollster::block_on(registry.open(Target::new(1, cli.target.as_str()), page));

    let result = match &cli.query {
        Some(query) => one_shot(&cli, &mut registry, id, query, options),
        None => serve(&mut registry, id),
    };

    pollster::block_on(registry.close_all());
    result
}

/// Search once, print each occurrence with context, optionally replace all.
fn one_shot(
    cli: &Cli,
    registry: &mut SessionRegistry<HtmlPage>,
    id: TargetId,
    query: &str,
    options: SearchOptions,
) -> CliResult<()> {
    if let Some(Response::ActionInit { response }) = pollster::block_on(registry.dispatch(id, Command::ActionInit)) {
        if !response.is_reachable {
            let reason = response.reason.map(|r| r.as_str()).unwrap_or("unknown");
            return Err(format!("{} is not searchable ({})", cli.target, reason).into());
        }
    }

    let update = Command::Update {
        regex: query.to_string(),
        options: Some(options.clone()),
    };
    let shown = match pollster::block_on(registry.dispatch(id, update)) {
        Some(Response::IndexUpdate { total, .. }) => total,
        Some(Response::InvalidRegex { error }) => return Err(format!("invalid pattern: {}", error).into()),
        Some(Response::EmptyRegex) => return Err("empty pattern".into()),
        Some(Response::Unreachable { reason, error }) => {
            return Err(format!("{} is not searchable ({}): {}", cli.target, reason.as_str(), error).into())
        }
        other => return Err(format!("unexpected response: {:?}", other).into()),
    };

    let found = registry.session(id).map(|s| s.state().total()).unwrap_or(0);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Some(page) = registry.host(id) {
        for index in 0..shown {
            let excerpt = page.excerpt(index, cli.context).unwrap_or_default();
            writeln!(out, "{:>5}: {}", index + 1, excerpt)?;
        }
    }
    if found > shown {
        writeln!(out, "{} occurrences ({} shown)", found, shown)?;
    } else {
        writeln!(out, "{} occurrences", found)?;
    }

    if let Some(text) = &cli.replace {
        let replace = Command::ReplaceAll {
            replace_with: text.clone(),
            options: Some(options),
        };
        match pollster::block_on(registry.dispatch(id, replace)) {
            Some(Response::Invalidate) => {
                if let Some(page) = registry.host(id) {
                    writeln!(out, "{}", page.text())?;
                }
            }
            other => return Err(format!("replace failed: {:?}", other).into()),
        }
    }
    Ok(())
}

/// Answer JSON commands from stdin, one response line per command line,
/// until input ends or the session closes.
fn serve(registry: &mut SessionRegistry<HtmlPage>, id: TargetId) -> CliResult<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command: Command = match serde_json::from_str(&line) {
            Ok(command) => command,
            Err(e) => {
                log::warn!("Ignoring malformed command: {}", e);
                let reply = serde_json::json!({ "action": "error", "error": e.to_string() });
                writeln!(out, "{}", reply)?;
                out.flush()?;
                continue;
            }
        };

        let Some(response) = pollster::block_on(registry.dispatch(id, command)) else {
            break;
        };
        writeln!(out, "{}", serde_json::to_string(&response)?)?;
        out.flush()?;

        if response == Response::Close {
            break;
        }
    }
    Ok(())
}
