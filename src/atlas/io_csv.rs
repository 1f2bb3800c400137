// Primitives for reading CSV files.

use idi_atlas::builder::Builder;

use crate::atlas::io_common::{check_value, read_source_text, sniff_delimiter};
use crate::atlas::*;

/// Fits the schema to the header of a file: the territory, year and value
/// columns must exist, the optional ones are dropped when missing.
pub fn fit_schema(
    headers: &[String],
    schema: DatasetSchema,
    path: &str,
) -> AtlasResult<DatasetSchema> {
    let has = |c: &String| headers.iter().any(|h| h == c);
    for c in [&schema.territory, &schema.year, &schema.value] {
        ensure!(
            has(c),
            MissingColumnSnafu {
                column: c.clone(),
                path
            }
        );
    }
    let keep = |c: Option<String>, what: &str| match c {
        Some(c) if !has(&c) => {
            debug!("fit_schema: no {} column {:?} in {}", what, c, path);
            None
        }
        x => x,
    };
    Ok(DatasetSchema {
        sector: keep(schema.sector, "sector"),
        flag: keep(schema.flag, "flag"),
        measure: keep(schema.measure, "measure"),
        ..schema
    })
}

pub fn read_csv_dataset(path: String, source: &DatasetSource) -> BAtlasResult<Dataset> {
    let text = read_source_text(&path)?;
    let delimiter = match source.delimiter_byte()? {
        Some(d) => d,
        None => sniff_delimiter(&text),
    };
    debug!(
        "read_csv_dataset: {:?} delimiter {:?}",
        path, delimiter as char
    );

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .context(CsvOpenSnafu { path: path.clone() })?
        .iter()
        .map(|h| h.to_string())
        .collect();
    debug!("read_csv_dataset: header: {:?}", headers);
    let schema = fit_schema(&headers, source.schema(), &path)?;
    let value_column = schema.value.clone();

    let mut builder = Builder::new(&source.name)
        .and_then(|b| b.schema(schema))
        .context(LibrarySnafu {})?;
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {
            path: path.clone(),
            lineno,
        })?;
        let fields: Vec<(&str, &str)> = headers
            .iter()
            .map(|h| h.as_str())
            .zip(line.iter())
            .collect();
        if let Some((_, raw)) = fields.iter().find(|(h, _)| *h == value_column) {
            check_value(&path, lineno, raw);
        }
        if let Err(e) = builder.add_record(&fields) {
            warn!("read_csv_dataset: {}:{}: skipping line: {}", path, lineno, e);
        }
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> DatasetSource {
        DatasetSource {
            name: name.to_string(),
            provider: None,
            file_path: format!("{}.csv", name),
            delimiter: None,
            excel_worksheet_name: None,
            territory_column: Some("Comunidad autónoma".to_string()),
            year_column: Some("Periodo".to_string()),
            sector_column: Some("Sector".to_string()),
            value_column: Some("Total".to_string()),
            flag_column: None,
            measure_column: None,
        }
    }

    #[test]
    fn regional_csv() {
        let path = format!("{}/testdata/gasto_ccaa.csv", env!("CARGO_MANIFEST_DIR"));
        let ds = read_csv_dataset(path, &source("gasto")).unwrap();
        assert_eq!(ds.name, "gasto");
        assert_eq!(ds.years(), vec!["2022", "2023"]);
        assert_eq!(ds.schema.flag, None);
        assert_eq!(ds.schema.sector, Some("Sector".to_string()));
        let madrid = ds
            .records
            .iter()
            .find(|r| ds.territory(r) == Some("Madrid, Comunidad de") && ds.year(r) == Some("2023"))
            .unwrap();
        assert_eq!(ds.value(madrid), Some(1.85));
    }

    #[test]
    fn missing_column() {
        let schema = DatasetSchema::default();
        let headers = vec!["geo".to_string(), "OBS_VALUE".to_string()];
        let err = fit_schema(&headers, schema, "x.csv").unwrap_err();
        assert!(matches!(err, AtlasError::MissingColumn { column, .. } if column == "TIME_PERIOD"));
    }

    #[test]
    fn optional_columns() {
        let headers: Vec<String> = ["geo", "TIME_PERIOD", "OBS_VALUE", "unit"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let schema = fit_schema(&headers, DatasetSchema::default(), "x.csv").unwrap();
        assert_eq!(schema.sector, None);
        assert_eq!(schema.flag, None);
        assert_eq!(schema.measure, Some("unit".to_string()));
    }
}
