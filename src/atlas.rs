use log::{debug, info, warn};

use idi_atlas::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::atlas::config_reader::*;

mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_geojson;

/// The sectors shown in the sector share charts. The total is left out.
const SHARE_SECTORS: [&str; 4] = ["BES", "GOV", "HES", "PNP"];

#[derive(Debug, Snafu)]
pub enum AtlasError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error fetching {url}"))]
    FetchingUrl { source: reqwest::Error, url: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file {path} has no worksheet {name:?}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("The Excel file {path} is empty"))]
    EmptyExcel { path: String },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error parsing GeoJSON file {path}"))]
    ParsingGeoJson {
        source: geojson::Error,
        path: String,
    },
    #[snafu(display("The file {path} has no column {column:?}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("No dataset is named {name:?}"))]
    UnknownDataset { name: String },
    #[snafu(display("Input type {provider:?} is not supported (csv or xlsx)"))]
    UnknownProvider { provider: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("{source}"))]
    Library { source: AtlasErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

type AtlasResult<T> = Result<T, AtlasError>;
type BAtlasResult<T> = Result<T, Box<AtlasError>>;

/// The selection, once the defaults are filled in.
#[derive(PartialEq, Debug, Clone)]
struct Selection {
    dataset: String,
    filter: RecordFilter,
    locale: Locale,
    palette: ColorPalette,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct OutputConfig {
    title: Option<String>,
    dataset: String,
    year: Option<String>,
    sector: Option<String>,
    #[serde(rename = "sectorLabel")]
    sector_label: Option<String>,
    measure: Option<String>,
    locale: String,
}

fn locale_code(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "es",
        Locale::En => "en",
    }
}

fn strategy_code(strategy: MatchStrategy) -> &'static str {
    match strategy {
        MatchStrategy::Code => "code",
        MatchStrategy::Exact => "exact",
        MatchStrategy::Alias => "alias",
        MatchStrategy::Substring => "substring",
        MatchStrategy::SpecialCase => "specialCase",
    }
}

/// Applies the command line options on top of the configuration file.
fn apply_args(mut config: AtlasConfig, args: &Args) -> AtlasConfig {
    if let Some(input) = &args.input {
        let (territory, year, sector, value) = match &args.columns {
            Some(cols) => {
                let v: Vec<String> = cols.split(',').map(|s| s.trim().to_string()).collect();
                (v.get(0).cloned(), v.get(1).cloned(), v.get(2).cloned(), v.get(3).cloned())
            }
            None => (None, None, None, None),
        };
        config.datasets = vec![DatasetSource {
            name: "input".to_string(),
            provider: args.input_type.clone(),
            file_path: input.clone(),
            delimiter: args.delimiter.clone(),
            excel_worksheet_name: args.excel_worksheet_name.clone(),
            territory_column: territory,
            year_column: year,
            sector_column: sector,
            value_column: value,
            flag_column: None,
            measure_column: None,
        }];
        config.selection.dataset = Some("input".to_string());
    }
    if let Some(geojson) = &args.geojson {
        config.geojson = Some(GeoJsonSource {
            file_path: geojson.clone(),
            name_property: config.geojson.and_then(|g| g.name_property),
        });
    }
    if args.year.is_some() {
        config.selection.year = args.year.clone();
    }
    if args.sector.is_some() {
        config.selection.sector = args.sector.clone();
    }
    if args.measure.is_some() {
        config.selection.measure = args.measure.clone();
    }
    if args.locale.is_some() {
        config.output_settings.locale = args.locale.clone();
    }
    config
}

fn validate_selection(config: &AtlasConfig, datasets: &[Dataset]) -> AtlasResult<Selection> {
    let first = match datasets.first() {
        Some(ds) => ds,
        None => whatever!("No dataset is configured"),
    };
    let dataset = match &config.selection.dataset {
        Some(name) => datasets
            .iter()
            .find(|ds| &ds.name == name)
            .context(UnknownDatasetSnafu { name: name.clone() })?,
        None => first,
    };

    let locale = match &config.output_settings.locale {
        Some(code) => match Locale::from_code(code) {
            Some(l) => l,
            None => whatever!("Unknown locale {:?}: expected es or en", code),
        },
        None => Locale::Es,
    };

    let year = match &config.selection.year {
        Some(y) => Some(y.clone()),
        None => dataset.years().last().cloned(),
    };
    let sector = match (&config.selection.sector, &dataset.schema.sector) {
        (Some(s), Some(_)) => Some(s.clone()),
        (None, Some(_)) => Some(SECTORS[0].code.to_string()),
        (Some(s), None) => {
            warn!(
                "The dataset {:?} has no sector column, sector {:?} is ignored",
                dataset.name, s
            );
            None
        }
        (None, None) => None,
    };

    let palette = match (&config.output_settings.sector_color, &sector) {
        (Some(hex), _) => ColorPalette::from_base(Rgb::from_hex(hex).context(LibrarySnafu {})?),
        (None, Some(s)) => match ColorPalette::for_sector(s) {
            Ok(p) => p,
            Err(e) => {
                warn!("{}: using the color of the total", e);
                ColorPalette::from_base(SECTORS[0].color)
            }
        },
        (None, None) => ColorPalette::from_base(SECTORS[0].color),
    };

    let mut filter = RecordFilter::default().with_year(year);
    if let Some(s) = &sector {
        filter = filter.with_sector(s);
    }
    if let Some(m) = &config.selection.measure {
        filter = filter.with_measure(m);
    }
    Ok(Selection {
        dataset: dataset.name.clone(),
        filter,
        locale,
        palette,
    })
}

/// Loads all the datasets, each one on its own thread. The first failure wins.
fn load_datasets(root: &str, sources: &[DatasetSource]) -> BAtlasResult<Vec<Dataset>> {
    let results: Vec<BAtlasResult<Dataset>> = std::thread::scope(|s| {
        let handles: Vec<_> = sources
            .iter()
            .map(|src| s.spawn(move || read_dataset(root, src)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(res) => res,
                Err(_) => Err(Box::new(AtlasError::Whatever {
                    message: "A dataset reader panicked".to_string(),
                    source: None,
                })),
            })
            .collect()
    });
    results.into_iter().collect()
}

fn read_dataset(root: &str, source: &DatasetSource) -> BAtlasResult<Dataset> {
    let path = io_common::resolve_path(root, &source.file_path);
    let provider = source.provider.clone().unwrap_or_else(|| "csv".to_string());
    info!(
        "read_dataset: {:?} from {:?} ({})",
        source.name, path, provider
    );
    let dataset = match provider.as_str() {
        "csv" => io_csv::read_csv_dataset(path, source)?,
        "xlsx" | "excel" => io_excel::read_excel_dataset(path, source)?,
        x => return Err(Box::new(AtlasError::UnknownProvider { provider: x.to_string() })),
    };
    info!(
        "read_dataset: {:?}: {} records, years {:?}",
        dataset.name,
        dataset.records.len(),
        dataset.years()
    );
    Ok(dataset)
}

fn build_lookups(root: &str, config: &AtlasConfig) -> BAtlasResult<Lookups> {
    let mut lookups = Lookups::builtin();
    if let Some(p) = &config.aliases_path {
        let aliases = read_aliases(io_common::resolve_path(root, p))?;
        debug!("build_lookups: {} aliases", aliases.len());
        lookups = lookups.with_aliases(aliases);
    }
    if let Some(p) = &config.flags_path {
        let flags = read_flags(io_common::resolve_path(root, p))?;
        debug!("build_lookups: {} flags", flags.len());
        lookups = lookups.with_flags(&flags);
    }
    Ok(lookups)
}

/// The names of the map features. Without a map, every territory of the selection is a feature.
fn feature_names(
    root: &str,
    config: &AtlasConfig,
    dataset: &Dataset,
    filter: &RecordFilter,
) -> BAtlasResult<Vec<String>> {
    if let Some(gj) = &config.geojson {
        let path = io_common::resolve_path(root, &gj.file_path);
        return io_geojson::read_feature_names(path, gj);
    }
    if let Some(names) = &config.features {
        return Ok(names.clone());
    }
    let mut names: Vec<String> = Vec::new();
    for r in dataset.records.iter().filter(|r| dataset.matches(r, filter)) {
        if let Some(t) = dataset.territory(r).filter(|t| !t.is_empty()) {
            if !names.iter().any(|n| n == t) {
                names.push(t.to_string());
            }
        }
    }
    Ok(names)
}

fn feature_to_json(
    fc: &FeatureColor,
    dataset: &Dataset,
    selection: &Selection,
    lookups: &Lookups,
) -> JSValue {
    let label = lookups.display_name(&fc.feature, selection.locale);
    let mut js: JSMap<String, JSValue> = JSMap::new();
    js.insert("feature".to_string(), json!(fc.feature));
    js.insert("label".to_string(), json!(label));
    js.insert("territory".to_string(), json!(fc.territory));
    js.insert("match".to_string(), json!(fc.strategy.map(strategy_code)));
    js.insert("value".to_string(), json!(fc.value));
    js.insert("flag".to_string(), json!(fc.flag));
    js.insert("previousValue".to_string(), json!(fc.previous_value));
    js.insert("delta".to_string(), json!(fc.delta));
    js.insert("rank".to_string(), json!(fc.rank));
    js.insert("color".to_string(), json!(fc.color.to_string()));
    js.insert("flagUrl".to_string(), json!(lookups.flag(&fc.feature)));

    if fc.territory.is_some() {
        let series: Vec<JSValue> = resolve_series(&fc.feature, dataset, &selection.filter, lookups)
            .iter()
            .map(|p| json!({"year": p.year, "value": p.value, "flag": p.flag}))
            .collect();
        js.insert("series".to_string(), json!(series));
        if dataset.schema.sector.is_some() {
            let shares: Vec<JSValue> = sector_shares(
                &fc.feature,
                dataset,
                &selection.filter,
                &SHARE_SECTORS,
                lookups,
            )
            .iter()
            .map(|s| json!({"sector": s.sector, "value": s.value, "share": s.share}))
            .collect();
            js.insert("shares".to_string(), json!(shares));
        }
    }
    JSValue::Object(js)
}

fn build_summary_js(
    config: &AtlasConfig,
    selection: &Selection,
    dataset: &Dataset,
    map: &Choropleth,
    lookups: &Lookups,
) -> JSValue {
    let sector_label = selection
        .filter
        .sector
        .as_deref()
        .and_then(|s| sector(s).ok())
        .map(|s| s.label(selection.locale).to_string());
    let c = OutputConfig {
        title: config.output_settings.title.clone(),
        dataset: selection.dataset.clone(),
        year: selection.filter.year.clone(),
        sector: selection.filter.sector.clone(),
        sector_label,
        measure: selection.filter.measure.clone(),
        locale: locale_code(selection.locale).to_string(),
    };
    let range = map.range.map(|r| {
        json!({"min": r.min, "max": r.max, "q1": r.q1, "median": r.median, "q3": r.q3, "count": r.count})
    });
    let mode = map.mode.map(|m| match m {
        ScaleMode::Logarithmic => "logarithmic",
        ScaleMode::Quartile => "quartile",
    });
    let p = &map.palette;
    let palette = json!({
        "null": p.null.to_string(),
        "zero": p.zero.to_string(),
        "stops": p.stops().iter().map(|c| c.to_string()).collect::<Vec<String>>(),
    });
    let features: Vec<JSValue> = map
        .features
        .iter()
        .map(|fc| feature_to_json(fc, dataset, selection, lookups))
        .collect();
    let ranking: Vec<JSValue> = map
        .ranking
        .iter()
        .map(|e| {
            json!({
                "position": e.position,
                "territory": e.territory,
                "label": lookups.display_name(&e.territory, selection.locale),
                "value": e.value,
            })
        })
        .collect();
    json!({
        "config": c,
        "scale": {"mode": mode, "range": range, "palette": palette},
        "features": features,
        "ranking": ranking,
    })
}

/// Reads the configuration file, if any, and applies the command line on top of it.
/// Also returns the directory against which relative paths are resolved.
fn load_config(config_path: &Option<String>, args: &Args) -> BAtlasResult<(AtlasConfig, String)> {
    let (config, root) = match config_path {
        Some(p) => {
            let config = read_config(p.clone())?;
            let root = Path::new(p.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_string_lossy()
                .to_string();
            (config, root)
        }
        None => (AtlasConfig::default(), ".".to_string()),
    };
    let config = apply_args(config, args);
    info!("config: {:?}", config);
    Ok((config, root))
}

/// Loads everything the configuration points to and computes the summary.
fn build_atlas(config: &AtlasConfig, root: &str) -> BAtlasResult<JSValue> {
    let datasets = load_datasets(root, &config.datasets)?;
    let selection = validate_selection(config, &datasets)?;
    info!("selection: {:?}", selection);
    let dataset = datasets
        .iter()
        .find(|ds| ds.name == selection.dataset)
        .context(UnknownDatasetSnafu {
            name: selection.dataset.clone(),
        })?;

    let lookups = build_lookups(root, config)?;
    let features = feature_names(root, config, dataset, &selection.filter)?;
    let map = build_choropleth(
        &features,
        dataset,
        &selection.filter,
        &selection.palette,
        &lookups,
    );
    Ok(build_summary_js(config, &selection, dataset, &map, &lookups))
}

fn output_path(args: &Args, config: &AtlasConfig, root: &str) -> Option<String> {
    if let Some(out) = &args.out {
        return match out.as_str() {
            "" | "stdout" => None,
            x => Some(x.to_string()),
        };
    }
    config
        .output_settings
        .output_directory
        .as_ref()
        .map(|d| {
            Path::new(&io_common::resolve_path(root, d))
                .join("summary.json")
                .to_string_lossy()
                .to_string()
        })
}

/// Compares a summary with a reference file. Differences are printed and are an error.
fn check_reference(reference_path: String, pretty_js_stats: &str) -> BAtlasResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        return Err(Box::new(AtlasError::Whatever {
            message: "Difference detected between calculated summary and reference summary"
                .to_string(),
            source: None,
        }));
    }
    Ok(())
}

pub fn run(args: &Args) -> BAtlasResult<()> {
    let (config, root) = load_config(&args.config, args)?;
    let result_js = build_atlas(&config, &root)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match output_path(args, &config, &root) {
        Some(path) => {
            info!("Writing the summary to {:?}", path);
            fs::write(&path, &pretty_js_stats).context(WritingFileSnafu { path: path.clone() })?;
        }
        None => println!("{}", pretty_js_stats),
    }

    if let Some(reference_p) = &args.reference {
        check_reference(reference_p.clone(), &pretty_js_stats)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn test_dir() -> String {
        format!("{}/testdata", env!("CARGO_MANIFEST_DIR"))
    }

    fn atlas(config: &str, extra: &[&str]) -> JSValue {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut argv: Vec<String> = vec!["idiatlas".to_string()];
        argv.extend(extra.iter().map(|s| s.to_string()));
        let args = Args::parse_from(argv);
        let config_path = Some(format!("{}/{}", test_dir(), config));
        let res = load_config(&config_path, &args).and_then(|(c, root)| build_atlas(&c, &root));
        match res {
            Ok(js) => js,
            Err(e) => panic!("error: {}", e),
        }
    }

    fn feature<'a>(js: &'a JSValue, name: &str) -> &'a JSValue {
        js["features"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["feature"] == name)
            .unwrap()
    }

    #[test]
    fn regional_map() {
        let js = atlas("gasto_config.json", &[]);
        assert_eq!(js["config"]["year"], "2023");
        assert_eq!(js["config"]["sector"], "_T");
        assert_eq!(js["config"]["sectorLabel"], "Todos los sectores");
        assert_eq!(js["scale"]["mode"], "quartile");
        // Total Nacional is left out of the range.
        assert_eq!(js["scale"]["range"]["count"], 6);

        let madrid = feature(&js, "Comunidad de Madrid");
        assert_eq!(madrid["territory"], "Madrid, Comunidad de");
        assert_eq!(madrid["value"], 1.85);
        assert_eq!(madrid["previousValue"], 1.7);
        let delta = madrid["delta"].as_f64().unwrap();
        assert!((delta - 8.8235).abs() < 1e-3);
        assert_eq!(madrid["rank"], 2);
        assert_eq!(madrid["match"], "code");
        assert_eq!(madrid["label"], "Madrid");
        assert_eq!(madrid["series"].as_array().unwrap().len(), 2);

        let euskadi = feature(&js, "Euskadi");
        assert_eq!(euskadi["territory"], "País Vasco");
        assert_eq!(euskadi["rank"], 1);
        assert_eq!(euskadi["color"], js["scale"]["palette"]["stops"][4]);

        // Only known through the alias file.
        let catalunya = feature(&js, "Principat de Catalunya");
        assert_eq!(catalunya["match"], "alias");
        assert_eq!(catalunya["territory"], "Cataluña");

        let ceuta = feature(&js, "Ceuta");
        assert_eq!(ceuta["value"], JSValue::Null);
        assert_eq!(ceuta["color"], js["scale"]["palette"]["null"]);

        let melilla = feature(&js, "Melilla");
        assert_eq!(melilla["value"], 0.0);
        assert_eq!(melilla["color"], js["scale"]["palette"]["zero"]);

        // Not in the dataset: no data, not an error.
        let galicia = feature(&js, "Galicia");
        assert_eq!(galicia["territory"], JSValue::Null);
        assert_eq!(galicia["color"], "#d9d9d9");
    }

    #[test]
    fn sector_shares_in_summary() {
        let js = atlas("gasto_config.json", &[]);
        let madrid = feature(&js, "Comunidad de Madrid");
        let shares = madrid["shares"].as_array().unwrap();
        assert_eq!(shares.len(), 4);
        assert_eq!(shares[0]["sector"], "BES");
        assert_eq!(shares[0]["value"], 1.1);
        let total: f64 = shares.iter().filter_map(|s| s["share"].as_f64()).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn command_line_overrides() {
        let js = atlas(
            "gasto_config.json",
            &["--year", "2022", "--sector", "BES", "--locale", "en"],
        );
        assert_eq!(js["config"]["year"], "2022");
        assert_eq!(js["config"]["sectorLabel"], "Business enterprise");
        assert_eq!(js["config"]["locale"], "en");
        let madrid = feature(&js, "Comunidad de Madrid");
        assert_eq!(madrid["value"], 1.0);
        assert_eq!(madrid["delta"], JSValue::Null);
        assert_eq!(madrid["label"], "Community of Madrid");
    }

    #[test]
    fn european_map() {
        let js = atlas("europe_config.json", &[]);
        assert_eq!(js["config"]["measure"], "PC_GDP");
        // The EU and euro area rows are aggregates.
        assert_eq!(js["scale"]["range"]["count"], 4);
        let germany = feature(&js, "Germany");
        assert_eq!(germany["territory"], "DE");
        assert_eq!(germany["match"], "code");
        assert_eq!(germany["value"], 3.11);
        assert_eq!(germany["flag"], "p");
        assert_eq!(germany["flagUrl"], "https://flagcdn.com/w40/de.png");
        let greece = feature(&js, "Greece");
        assert_eq!(greece["territory"], "EL");
        assert_eq!(greece["flagUrl"], "https://example.org/flags/greece.svg");
        assert_eq!(
            js["ranking"][0]["territory"], "SE",
            "ranking: {}",
            js["ranking"]
        );
    }

    #[test]
    fn unknown_provider() {
        let args = Args::parse_from(["idiatlas", "--input-type", "parquet", "--input", "x.parquet"]);
        let config_path = Some(format!("{}/gasto_config.json", test_dir()));
        let (config, root) = load_config(&config_path, &args).unwrap();
        assert_eq!(config.datasets.len(), 1);
        match build_atlas(&config, &root) {
            Err(e) => assert!(matches!(*e, AtlasError::UnknownProvider { .. })),
            Ok(_) => panic!("parquet is not a supported input"),
        }
    }

    #[test]
    fn reference_comparison() {
        let js = atlas("gasto_config.json", &[]);
        let pretty = serde_json::to_string_pretty(&js).unwrap();
        let path = std::env::temp_dir().join("idiatlas_reference_comparison.json");
        fs::write(&path, &pretty).unwrap();
        let p = path.to_string_lossy().to_string();
        assert!(check_reference(p.clone(), &pretty).is_ok());
        let other = atlas("gasto_config.json", &["--year", "2022"]);
        let other = serde_json::to_string_pretty(&other).unwrap();
        assert!(check_reference(p, &other).is_err());
    }
}
