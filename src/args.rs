use clap::Parser;

/// This program builds the choropleth summary of an R&D statistics dataset: one color per map
/// feature, the ranking of the territories and the change against the previous year.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the datasets, the map and the selection.
    /// For more information about the file format, read the manual of the idi_atlas library.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference summary in JSON format. If provided, idiatlas will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, URL or empty) If specified, the dataset to read. Setting this option replaces the datasets
    /// of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (single character, default: detected) The delimiter of a CSV input.
    #[clap(long, value_parser)]
    pub delimiter: Option<String>,

    /// (default Eurostat columns) The columns of the input, as comma-separated
    /// territory,year,sector,value. An empty sector means that the dataset has no sector breakdown.
    #[clap(long, value_parser)]
    pub columns: Option<String>,

    /// (file path, URL or empty) The GeoJSON file with the map features.
    #[clap(short, long, value_parser)]
    pub geojson: Option<String>,

    /// (default: the last year of the dataset) The year to show.
    #[clap(short, long, value_parser)]
    pub year: Option<String>,

    /// (default _T) The sector to show: _T, BES, GOV, HES or PNP.
    #[clap(short, long, value_parser)]
    pub sector: Option<String>,

    /// (optional) The measure to show, when the dataset has several (PC_GDP, MIO_EUR...).
    #[clap(short, long, value_parser)]
    pub measure: Option<String>,

    /// (es or en, default es) The language of the labels.
    #[clap(short, long, value_parser)]
    pub locale: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
