use crate::atlas::io_common::read_source_text;
use crate::atlas::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    pub title: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    pub locale: Option<String>,
    /// Overrides the color of the sector, as `#rrggbb`.
    #[serde(rename = "sectorColor")]
    pub sector_color: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSource {
    pub name: String,
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub delimiter: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "territoryColumn")]
    pub territory_column: Option<String>,
    #[serde(rename = "yearColumn")]
    pub year_column: Option<String>,
    /// An empty string means that the dataset has no sector breakdown.
    #[serde(rename = "sectorColumn")]
    pub sector_column: Option<String>,
    #[serde(rename = "valueColumn")]
    pub value_column: Option<String>,
    #[serde(rename = "flagColumn")]
    pub flag_column: Option<String>,
    #[serde(rename = "measureColumn")]
    pub measure_column: Option<String>,
}

fn optional_column(configured: &Option<String>, default: Option<String>) -> Option<String> {
    match configured {
        Some(c) if c.trim().is_empty() => None,
        Some(c) => Some(c.clone()),
        None => default,
    }
}

impl DatasetSource {
    /// The schema of the dataset: the configured columns, or the Eurostat ones.
    pub fn schema(&self) -> DatasetSchema {
        let d = DatasetSchema::default();
        DatasetSchema {
            territory: self.territory_column.clone().unwrap_or(d.territory),
            year: self.year_column.clone().unwrap_or(d.year),
            sector: optional_column(&self.sector_column, d.sector),
            value: self.value_column.clone().unwrap_or(d.value),
            flag: optional_column(&self.flag_column, d.flag),
            measure: optional_column(&self.measure_column, d.measure),
        }
    }

    /// The configured delimiter, if any. `\t` and `tab` stand for a tabulation.
    pub fn delimiter_byte(&self) -> AtlasResult<Option<u8>> {
        match self.delimiter.as_deref() {
            None | Some("") => Ok(None),
            Some("\\t") | Some("tab") => Ok(Some(b'\t')),
            Some(d) if d.len() == 1 => Ok(d.bytes().next()),
            Some(d) => whatever!("The delimiter must be a single character, got {:?}", d),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GeoJsonSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// The feature property holding the display name (default `name`).
    #[serde(rename = "nameProperty")]
    pub name_property: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct SelectionSettings {
    pub dataset: Option<String>,
    pub year: Option<String>,
    pub sector: Option<String>,
    pub measure: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct AtlasConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(default)]
    pub datasets: Vec<DatasetSource>,
    pub geojson: Option<GeoJsonSource>,
    /// Feature names to use when there is no GeoJSON file.
    pub features: Option<Vec<String>>,
    #[serde(rename = "aliasesPath")]
    pub aliases_path: Option<String>,
    #[serde(rename = "flagsPath")]
    pub flags_path: Option<String>,
    #[serde(default)]
    pub selection: SelectionSettings,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct AliasEntry {
    key: String,
    es: String,
    en: String,
}

pub fn read_config(path: String) -> BAtlasResult<AtlasConfig> {
    let contents = fs::read_to_string(&path).context(OpeningFileSnafu { path })?;
    let config: AtlasConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

/// Reads an alias table: `[{"key": ..., "es": ..., "en": ...}]`.
pub fn read_aliases(path: String) -> BAtlasResult<Vec<EntityAlias>> {
    let contents = read_source_text(&path)?;
    let entries: Vec<AliasEntry> = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(entries
        .iter()
        .map(|e| EntityAlias::new(&e.key, &e.es, &e.en))
        .collect())
}

/// Reads a flag table: `{"<name>": "<url>"}`.
pub fn read_flags(path: String) -> BAtlasResult<Vec<(String, String)>> {
    let contents = read_source_text(&path)?;
    let js: JSMap<String, JSValue> = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    let mut res: Vec<(String, String)> = Vec::new();
    for (name, url) in js.into_iter() {
        match url {
            JSValue::String(u) => res.push((name, u)),
            x => warn!("read_flags: ignoring {:?}: not a URL: {}", name, x),
        }
    }
    Ok(res)
}

pub fn read_summary(path: String) -> BAtlasResult<JSValue> {
    let contents = fs::read_to_string(&path).context(OpeningFileSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config() {
        let config: AtlasConfig =
            serde_json::from_str(r#"{"datasets": [{"name": "gasto", "filePath": "g.csv"}]}"#)
                .unwrap();
        assert_eq!(config.selection, SelectionSettings::default());
        assert_eq!(config.datasets[0].schema(), DatasetSchema::default());
        assert_eq!(config.datasets[0].delimiter_byte().unwrap(), None);
    }

    #[test]
    fn configured_schema() {
        let source: DatasetSource = serde_json::from_str(
            r#"{
                "name": "ine",
                "filePath": "ine.csv",
                "delimiter": ";",
                "territoryColumn": "Comunidades y Ciudades Autónomas",
                "yearColumn": "Periodo",
                "sectorColumn": "",
                "valueColumn": "Total"
            }"#,
        )
        .unwrap();
        let schema = source.schema();
        assert_eq!(schema.territory, "Comunidades y Ciudades Autónomas");
        assert_eq!(schema.sector, None);
        assert_eq!(schema.flag, Some("OBS_FLAG".to_string()));
        assert_eq!(source.delimiter_byte().unwrap(), Some(b';'));
    }

    #[test]
    fn bad_delimiter() {
        let source = DatasetSource {
            name: "x".to_string(),
            provider: None,
            file_path: "x.csv".to_string(),
            delimiter: Some(";;".to_string()),
            excel_worksheet_name: None,
            territory_column: None,
            year_column: None,
            sector_column: None,
            value_column: None,
            flag_column: None,
            measure_column: None,
        };
        assert!(source.delimiter_byte().is_err());
    }
}
