use log::{debug, info};

use review_core::catalog::*;
use review_core::form::FormInput;
use review_core::store::RecordStore;
use review_core::*;
use snafu::{prelude::*, Snafu};

use std::io::Write;
use std::path::Path;

use crate::args::{Args, Command};
use crate::review::config_reader::*;
use crate::review::io_common::*;
use crate::review::prompt::View;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;
pub mod prompt;
pub mod store_json;
pub mod store_sheet;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReviewError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The spreadsheet {path} has no header row"))]
    EmptyExcel { path: String },
    #[snafu(display("The spreadsheet {path} has no worksheet named {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display(
        "The spreadsheet {path} has several worksheets ({names:?}), the worksheet name must be provided"
    ))]
    AmbiguousWorksheet { path: String, names: Vec<String> },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Could not read line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not parse the configuration {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("A filter must look like column=value, got {filter:?}"))]
    InvalidFilter { filter: String },
    #[snafu(display("{source}"))]
    Session { source: SessionError },
    #[snafu(display("Could not talk to the terminal"))]
    Terminal { source: std::io::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ReviewResult<T> = Result<T, ReviewError>;

/// Reads the configuration file, or assembles one from the command line
/// when no file is given. Command line paths override the file.
pub fn load_config(args: &Args) -> ReviewResult<ReviewConfig> {
    let revision_o = match args.revision.as_deref() {
        None => None,
        Some(tag) => match FormRevision::from_tag(tag) {
            Some(r) => Some(r),
            None => whatever!("Unknown form revision {:?}", tag),
        },
    };
    let mut config = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?;
            config.resolve_paths(root_p)
        }
        None => {
            let input = match &args.input {
                Some(x) => x.clone(),
                None => whatever!("Either a configuration file (--config) or a catalog (--input) must be provided"),
            };
            default_config(&input, revision_o.unwrap_or(FormRevision::StatusReview))
        }
    };
    if let (Some(_), Some(input)) = (&args.config, &args.input) {
        config.catalog_source.file_path = input.clone();
    }
    if let Some(revision) = revision_o {
        config.form_revision = revision;
    }
    if let Some(store) = &args.store {
        config.record_store.path = store.clone();
    }
    debug!("load_config: {:?}", config);
    Ok(config)
}

/// Reads the whole catalog. Any failure here ends the session.
pub fn read_catalog(source: &CatalogSource) -> ReviewResult<Vec<Item>> {
    info!(
        "Attempting to read catalog {:?} ({})",
        source.file_path, source.provider
    );
    let items = match source.provider.as_str() {
        "csv" => io_csv::read_csv_catalog(&source.file_path)?,
        "xlsx" => {
            io_excel::read_excel_catalog(&source.file_path, source.excel_worksheet_name.as_deref())?
        }
        x => whatever!("Catalog provider not implemented: {:?}", x),
    };
    info!("Read {} catalog rows", items.len());
    Ok(items)
}

pub fn open_store(settings: &StoreSettings) -> ReviewResult<Box<dyn RecordStore>> {
    let store: Box<dyn RecordStore> = match settings.provider.as_str() {
        "jsonDir" => Box::new(store_json::JsonDirStore::new(&settings.path)),
        "sheet" => Box::new(store_sheet::SheetStore::new(
            &settings.path,
            settings.table_name(),
            settings.sheet_name(),
        )),
        x => whatever!("Record store provider not implemented: {:?}", x),
    };
    info!("Using {}", store.describe());
    Ok(store)
}

/// The filter selected on the command line, on top of the configured level.
pub fn build_filter(config: &ReviewConfig, args: &Args) -> ReviewResult<CatalogFilter> {
    let mut categories: Vec<(String, String)> = Vec::new();
    for f in args.filter.iter() {
        categories.push(parse_filter(f)?);
    }
    Ok(CatalogFilter {
        level: config.catalog_source.level_filter(),
        categories,
        search: args.search.clone(),
        content_column: config.catalog_source.content_column(),
    })
}

/// Loads everything a session needs and reads the store once.
pub fn start_session(
    config: &ReviewConfig,
    args: &Args,
) -> ReviewResult<(Session, Box<dyn RecordStore>)> {
    let catalog = read_catalog(&config.catalog_source)?;
    let filter = build_filter(config, args)?;
    let items = filter_items(&catalog, &filter);
    let reviewer = args.reviewer.clone().unwrap_or_default();
    let mut session =
        Session::new(&reviewer, config.contract(), items).context(SessionSnafu {})?;
    let store = open_store(&config.record_store)?;
    session.refresh(store.as_ref()).context(SessionSnafu {})?;
    Ok((session, store))
}

pub fn run(args: &Args) -> ReviewResult<()> {
    let config = load_config(args)?;
    let view = View::from_config(&config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match &args.command {
        Command::Categories { column } => run_categories(&config, args, column, &mut out),
        Command::Annotate => {
            let (mut session, mut store) = start_session(&config, args)?;
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            prompt::annotate_loop(&mut session, store.as_mut(), &view, &mut input, &mut out)
        }
        Command::Show { offset } => {
            let (mut session, _store) = start_session(&config, args)?;
            session.seek(*offset);
            run_show(&session, &view, &mut out)
        }
        Command::Submit {
            offset,
            status,
            adequacy,
            relevance,
            justification,
            comment,
            new_item_text,
        } => {
            let (mut session, mut store) = start_session(&config, args)?;
            session.seek(*offset);
            let form = FormInput {
                status: status.clone().unwrap_or_default(),
                adequacy: adequacy.clone().unwrap_or_default(),
                relevance: relevance.clone().unwrap_or_default(),
                justification: justification.clone().unwrap_or_default(),
                comment: comment.clone().unwrap_or_default(),
                new_item_text: new_item_text.clone().unwrap_or_default(),
            };
            run_submit(&mut session, store.as_mut(), &form, &mut out)
        }
        Command::Progress => {
            let (session, _store) = start_session(&config, args)?;
            run_progress(&session, &config, &mut out)
        }
    }
}

pub fn run_show<W: Write>(session: &Session, view: &View, out: &mut W) -> ReviewResult<()> {
    match session.current() {
        Some(item) => {
            say(out, &view.render(item))?;
            say(out, &format!("Progress: {}", session.progress()))
        }
        None => say(out, "All items annotated."),
    }
}

pub fn run_submit<W: Write>(
    session: &mut Session,
    store: &mut dyn RecordStore,
    form: &FormInput,
    out: &mut W,
) -> ReviewResult<()> {
    let record = session.submit(form, store).context(SessionSnafu {})?;
    say(
        out,
        &format!(
            "Saved {} for item {} ({})",
            record.judgment.label(),
            record.key(),
            record.timestamp
        ),
    )?;
    say(out, &format!("Progress: {}", session.progress()))
}

pub fn run_progress<W: Write>(
    session: &Session,
    config: &ReviewConfig,
    out: &mut W,
) -> ReviewResult<()> {
    say(out, &format!("Reviewer: {}", session.reviewer()))?;
    say(out, &format!("Progress: {}", session.progress()))?;
    let stats = catalog_stats(session.items(), &config.category_columns());
    let distinct: Vec<String> = stats
        .distinct
        .iter()
        .map(|(c, n)| format!("{}: {}", c, n))
        .collect();
    if distinct.is_empty() {
        say(out, &format!("Items: {}", stats.total))?;
    } else {
        say(out, &format!("Items: {} ({})", stats.total, distinct.join(", ")))?;
    }
    for (label, count) in session.summary() {
        say(out, &format!("  {}: {}", label, count))?;
    }
    Ok(())
}

/// Lists the values offered for a category column, taking into account the
/// filters on the other columns.
pub fn run_categories<W: Write>(
    config: &ReviewConfig,
    args: &Args,
    column: &str,
    out: &mut W,
) -> ReviewResult<()> {
    let catalog = read_catalog(&config.catalog_source)?;
    let mut filter = build_filter(config, args)?.level_only();
    for f in args.filter.iter() {
        let (c, v) = parse_filter(f)?;
        if c != column {
            filter.categories.push((c, v));
        }
    }
    let items = filter_items(&catalog, &filter);
    for value in distinct_values(&items, column) {
        say(out, &value)?;
    }
    Ok(())
}

pub(crate) fn say<W: Write>(out: &mut W, msg: &str) -> ReviewResult<()> {
    writeln!(out, "{}", msg).context(TerminalSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    fn write_catalog(dir: &Path) -> String {
        let p = dir.join("catalog.csv");
        fs::write(
            &p,
            "numero_questao,texto_completo,dimension\n\
             1,Existe un plan de innovación,Capacidades\n\
             2,Se publican datos abiertos,Datos\n\
             3,Se mide el impacto,Resultados\n",
        )
        .unwrap();
        p.display().to_string()
    }

    fn args(dir: &Path, extra: &[&str]) -> Args {
        let catalog = write_catalog(dir);
        let store = dir.join("records").display().to_string();
        let mut v: Vec<String> = vec![
            "surveyrev".to_string(),
            "--input".to_string(),
            catalog,
            "--store".to_string(),
            store,
            "--revision".to_string(),
            "adequacyReview".to_string(),
            "--reviewer".to_string(),
            "ana".to_string(),
        ];
        v.extend(extra.iter().map(|s| s.to_string()));
        Args::parse_from(v)
    }

    #[test]
    fn config_from_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(dir.path(), &["progress"]);
        let config = load_config(&a).unwrap();
        assert_eq!(config.catalog_source.provider, "csv");
        assert_eq!(config.form_revision, FormRevision::AdequacyReview);
        assert_eq!(config.record_store.provider, "jsonDir");
        assert!(config.catalog_source.level_filter().is_none());
    }

    #[test]
    fn revision_overrides_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("review.json");
        fs::write(
            &p,
            r#"{
                "catalogSource": {"provider": "csv", "filePath": "catalog.csv"},
                "recordStore": {"provider": "jsonDir", "path": "out"},
                "formRevision": "statusReview"
            }"#,
        )
        .unwrap();
        let config_path = p.display().to_string();
        let a = Args::parse_from(["surveyrev", "-c", config_path.as_str(), "progress"]);
        assert_eq!(
            load_config(&a).unwrap().form_revision,
            FormRevision::StatusReview
        );

        let a = Args::parse_from([
            "surveyrev",
            "-c",
            config_path.as_str(),
            "--revision",
            "adequacyReview",
            "progress",
        ]);
        let config = load_config(&a).unwrap();
        assert_eq!(config.form_revision, FormRevision::AdequacyReview);
        assert_eq!(config.contract().fields, vec!["numero_questao".to_string()]);

        let a = Args::parse_from(["surveyrev", "-c", config_path.as_str(), "--revision", "v3", "progress"]);
        assert!(load_config(&a).is_err());
    }

    #[test]
    fn missing_catalog_is_fatal() {
        let a = Args::parse_from(["surveyrev", "--input", "/nonexistent/catalog.csv", "-r", "ana", "progress"]);
        let config = load_config(&a).unwrap();
        let res = start_session(&config, &a);
        assert!(matches!(res, Err(ReviewError::CsvOpen { .. })));
    }

    #[test]
    fn submit_then_show_next_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(dir.path(), &["show"]);
        let config = load_config(&a).unwrap();
        let view = View::from_config(&config);

        let (mut session, mut store) = start_session(&config, &a).unwrap();
        session.seek(1);
        let form = FormInput {
            adequacy: "adequate".to_string(),
            relevance: "5".to_string(),
            ..Default::default()
        };
        let mut out: Vec<u8> = Vec::new();
        run_submit(&mut session, store.as_mut(), &form, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Saved adequate for item 2"));

        // A new process sees the record and starts at the first candidate.
        let (session, _store) = start_session(&config, &a).unwrap();
        let mut out: Vec<u8> = Vec::new();
        run_show(&session, &view, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Existe un plan de innovación"));
        assert!(text.contains("Progress: 1/3"));
        let remaining: Vec<String> = session
            .candidates()
            .iter()
            .map(|it| it.display("numero_questao"))
            .collect();
        assert_eq!(remaining, vec!["1", "3"]);
    }

    #[test]
    fn invalid_submission_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(dir.path(), &["progress"]);
        let config = load_config(&a).unwrap();
        let (mut session, mut store) = start_session(&config, &a).unwrap();
        let form = FormInput {
            adequacy: "partial".to_string(),
            relevance: "2".to_string(),
            ..Default::default()
        };
        let mut out: Vec<u8> = Vec::new();
        let err = run_submit(&mut session, store.as_mut(), &form, &mut out).unwrap_err();
        assert!(err.to_string().contains("justification"));
        assert!(store.load_rows().unwrap().is_empty());
    }

    #[test]
    fn progress_and_categories() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(dir.path(), &["--filter", "dimension=Datos", "progress"]);
        let config = load_config(&a).unwrap();
        let (session, _store) = start_session(&config, &a).unwrap();
        let mut out: Vec<u8> = Vec::new();
        run_progress(&session, &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Progress: 0/1 (0.0%)"));
        assert!(text.contains("  partial: 0"));

        let mut out: Vec<u8> = Vec::new();
        run_categories(&config, &a, "dimension", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Capacidades\nDatos\nResultados\n");
    }

    #[test]
    fn bad_filter() {
        let dir = tempfile::tempdir().unwrap();
        let a = args(dir.path(), &["--filter", "dimension", "progress"]);
        let config = load_config(&a).unwrap();
        assert!(matches!(
            build_filter(&config, &a),
            Err(ReviewError::InvalidFilter { .. })
        ));
    }
}
