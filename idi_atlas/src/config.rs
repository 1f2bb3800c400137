// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use crate::parsing::parse_value;

/// A row of a dataset, as read from the source file.
///
/// Every cell is kept as the raw string. Numbers, years and codes are only
/// interpreted at lookup time, through the schema of the dataset.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DatasetRecord {
    fields: BTreeMap<String, String>,
}

impl DatasetRecord {
    pub fn new(fields: BTreeMap<String, String>) -> DatasetRecord {
        DatasetRecord { fields }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> DatasetRecord {
        DatasetRecord {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(|s| s.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|s| s.as_str())
    }
}

/// Which columns of a dataset carry which meaning.
///
/// The defaults follow the SDMX-CSV layout used by Eurostat exports.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DatasetSchema {
    pub territory: String,
    pub year: String,
    /// Datasets without a sector breakdown ignore the sector filter.
    pub sector: Option<String>,
    pub value: String,
    /// Observation flags (`p` provisional, `e` estimated, ...).
    pub flag: Option<String>,
    pub measure: Option<String>,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        DatasetSchema {
            territory: "geo".to_string(),
            year: "TIME_PERIOD".to_string(),
            sector: Some("sectperf".to_string()),
            value: "OBS_VALUE".to_string(),
            flag: Some("OBS_FLAG".to_string()),
            measure: Some("unit".to_string()),
        }
    }
}

/// A loaded dataset. Records keep the order of the source file, which is also
/// the order in which they are matched.
#[derive(PartialEq, Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub schema: DatasetSchema,
    pub records: Vec<DatasetRecord>,
}

impl Dataset {
    pub fn territory<'a>(&self, record: &'a DatasetRecord) -> Option<&'a str> {
        record.get(&self.schema.territory).map(|s| s.trim())
    }

    pub fn year<'a>(&self, record: &'a DatasetRecord) -> Option<&'a str> {
        record.get(&self.schema.year).map(|s| s.trim())
    }

    pub fn sector<'a>(&self, record: &'a DatasetRecord) -> Option<&'a str> {
        self.schema
            .sector
            .as_ref()
            .and_then(|c| record.get(c))
            .map(|s| s.trim())
    }

    pub fn measure<'a>(&self, record: &'a DatasetRecord) -> Option<&'a str> {
        self.schema
            .measure
            .as_ref()
            .and_then(|c| record.get(c))
            .map(|s| s.trim())
    }

    /// The observation flag, if the column exists and is not blank.
    pub fn flag<'a>(&self, record: &'a DatasetRecord) -> Option<&'a str> {
        self.schema
            .flag
            .as_ref()
            .and_then(|c| record.get(c))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// The numeric value of a record. `None` means "no data", which is not the same as zero.
    pub fn value(&self, record: &DatasetRecord) -> Option<f64> {
        record.get(&self.schema.value).and_then(parse_value)
    }

    /// All the distinct years present in the dataset, in increasing order.
    pub fn years(&self) -> Vec<String> {
        let mut years: Vec<String> = self
            .records
            .iter()
            .filter_map(|r| self.year(r))
            .filter(|y| !y.is_empty())
            .map(|y| y.to_string())
            .collect();
        years.sort_by_key(|y| (y.parse::<i64>().unwrap_or(i64::MAX), y.clone()));
        years.dedup();
        years
    }

    pub fn matches(&self, record: &DatasetRecord, filter: &RecordFilter) -> bool {
        if let Some(year) = &filter.year {
            if self.year(record) != Some(year.trim()) {
                return false;
            }
        }
        if let (Some(sector), Some(_)) = (&filter.sector, &self.schema.sector) {
            if self.sector(record) != Some(sector.trim()) {
                return false;
            }
        }
        if let (Some(measure), Some(_)) = (&filter.measure, &self.schema.measure) {
            if self.measure(record) != Some(measure.trim()) {
                return false;
            }
        }
        true
    }
}

/// The slice of a dataset to look at.
///
/// A filter without a year is used for time series.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RecordFilter {
    pub year: Option<String>,
    pub sector: Option<String>,
    pub measure: Option<String>,
}

impl RecordFilter {
    pub fn year(year: &str) -> RecordFilter {
        RecordFilter {
            year: Some(year.to_string()),
            sector: None,
            measure: None,
        }
    }

    pub fn with_sector(self, sector: &str) -> RecordFilter {
        RecordFilter {
            sector: Some(sector.to_string()),
            ..self
        }
    }

    pub fn with_measure(self, measure: &str) -> RecordFilter {
        RecordFilter {
            measure: Some(measure.to_string()),
            ..self
        }
    }

    pub fn with_year(self, year: Option<String>) -> RecordFilter {
        RecordFilter { year, ..self }
    }
}

/// A canonical entity name with its Spanish and English display forms.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct EntityAlias {
    /// The name in the original language (Catalan, Basque, German...).
    pub key: String,
    pub es: String,
    pub en: String,
}

impl EntityAlias {
    pub fn new(key: &str, es: &str, en: &str) -> EntityAlias {
        EntityAlias {
            key: key.to_string(),
            es: es.to_string(),
            en: en.to_string(),
        }
    }

    pub fn variants(&self) -> [&str; 3] {
        [self.key.as_str(), self.es.as_str(), self.en.as_str()]
    }

    pub fn localized(&self, locale: Locale) -> &str {
        match locale {
            Locale::Es => &self.es,
            Locale::En => &self.en,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum EntityKind {
    /// A Spanish autonomous community or city.
    Region,
    Country,
    /// Supranational or national totals. Never part of a peer group.
    Aggregate,
}

/// A territory code (ISO 3166-2, NUTS, or Eurostat geo code) and the alias key
/// of the entity it designates.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RegionCode {
    pub code: String,
    pub name: String,
    pub kind: EntityKind,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Locale {
    Es,
    En,
}

impl Locale {
    pub fn from_code(code: &str) -> Option<Locale> {
        match code.trim().to_lowercase().as_str() {
            "es" | "es-es" | "spa" => Some(Locale::Es),
            "en" | "en-gb" | "en-us" | "eng" => Some(Locale::En),
            _ => None,
        }
    }
}

// ******** Colors *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// The colors used by a choropleth.
///
/// `null` and `zero` sit outside the gradient: missing data and a reported
/// zero must never be confused with each other or with a low value.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ColorPalette {
    pub null: Rgb,
    pub zero: Rgb,
    pub min: Rgb,
    pub low: Rgb,
    pub mid: Rgb,
    pub high: Rgb,
    pub max: Rgb,
}

impl ColorPalette {
    /// The five gradient stops, from the lowest to the highest value.
    pub fn stops(&self) -> [Rgb; 5] {
        [self.min, self.low, self.mid, self.high, self.max]
    }
}

/// A performance sector, as coded by Eurostat and INE.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Sector {
    pub code: &'static str,
    pub label_es: &'static str,
    pub label_en: &'static str,
    pub color: Rgb,
}

impl Sector {
    pub fn label(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::Es => self.label_es,
            Locale::En => self.label_en,
        }
    }
}

// ******** Output data structures *********

/// Summary statistics of a peer group.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub count: usize,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ScaleMode {
    /// Heavily skewed peer groups (max / min > 15).
    Logarithmic,
    /// Five bands delimited by the quartiles and the maximum.
    Quartile,
}

/// The strategy of the resolution cascade that found a record.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum MatchStrategy {
    Code,
    Exact,
    Alias,
    Substring,
    SpecialCase,
}

/// A resolved record.
#[derive(PartialEq, Debug, Clone)]
pub struct Observation<'a> {
    pub record: &'a DatasetRecord,
    pub territory: &'a str,
    pub year: Option<&'a str>,
    pub value: Option<f64>,
    pub flag: Option<&'a str>,
    pub strategy: MatchStrategy,
}

#[derive(PartialEq, Debug, Clone)]
pub struct YearComparison<'a> {
    pub current: Observation<'a>,
    pub previous: Option<Observation<'a>>,
    /// Percentage change against the previous year.
    pub delta: Option<f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SeriesPoint {
    pub year: String,
    pub value: Option<f64>,
    pub flag: Option<String>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RankedEntry {
    /// 1-based. Equal values share the same position.
    pub position: usize,
    pub territory: String,
    pub value: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SectorShare {
    pub sector: String,
    pub value: Option<f64>,
    /// Percentage of the sum of the sectors with data.
    pub share: Option<f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct FeatureColor {
    pub feature: String,
    /// The territory of the matched record, if any.
    pub territory: Option<String>,
    pub strategy: Option<MatchStrategy>,
    pub value: Option<f64>,
    pub flag: Option<String>,
    pub previous_value: Option<f64>,
    pub delta: Option<f64>,
    pub rank: Option<usize>,
    pub color: Rgb,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Choropleth {
    pub mode: Option<ScaleMode>,
    pub range: Option<ValueRange>,
    pub palette: ColorPalette,
    pub features: Vec<FeatureColor>,
    pub ranking: Vec<RankedEntry>,
}

/// Errors that prevent the library from completing an operation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AtlasErrors {
    InvalidColor(String),
    UnknownSector(String),
    /// A record is missing a column required by the schema.
    MissingColumn(String),
}

impl Error for AtlasErrors {}

impl Display for AtlasErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtlasErrors::InvalidColor(s) => write!(f, "invalid color: {:?}", s),
            AtlasErrors::UnknownSector(s) => write!(f, "unknown sector: {:?}", s),
            AtlasErrors::MissingColumn(s) => write!(f, "missing column: {:?}", s),
        }
    }
}
