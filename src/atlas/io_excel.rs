// Reading datasets from Excel worksheets. The first row is the header.

use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use idi_atlas::builder::Builder;

use crate::atlas::io_common::{check_value, read_source_bytes};
use crate::atlas::io_csv::fit_schema;
use crate::atlas::*;

/// The text of a cell, as it would appear in a CSV export.
fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Empty => "".to_string(),
        // Years and integral values are stored as floats.
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        // #N/A, #DIV/0!... are "no data".
        DataType::Error(_) => "".to_string(),
        other => other.to_string(),
    }
}

pub fn read_excel_dataset(path: String, source: &DatasetSource) -> BAtlasResult<Dataset> {
    let bytes = read_source_bytes(&path)?;
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).context(OpeningExcelSnafu { path: path.clone() })?;
    let wrange = match &source.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                name: name.clone(),
                path: path.clone(),
            })?
            .context(OpeningExcelSnafu { path: path.clone() })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?,
    };

    let mut rows = wrange.rows();
    let header: Vec<String> = rows
        .next()
        .context(EmptyExcelSnafu { path: path.clone() })?
        .iter()
        .map(cell_to_string)
        .collect();
    debug!("read_excel_dataset: header: {:?}", header);
    let schema = fit_schema(&header, source.schema(), &path)?;
    let value_column = schema.value.clone();

    let mut builder = Builder::new(&source.name)
        .and_then(|b| b.schema(schema))
        .context(LibrarySnafu {})?;
    for (idx, row) in rows.enumerate() {
        // The header is row 1.
        let lineno = idx + 2;
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let fields: Vec<(&str, &str)> = header
            .iter()
            .map(|h| h.as_str())
            .zip(cells.iter().map(|c| c.as_str()))
            .collect();
        if let Some((_, raw)) = fields.iter().find(|(h, _)| *h == value_column) {
            check_value(&path, lineno, raw);
        }
        if let Err(e) = builder.add_record(&fields) {
            warn!(
                "read_excel_dataset: {}: row {}: skipping: {}",
                path, lineno, e
            );
        }
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(cell_to_string(&DataType::Float(2023.0)), "2023");
        assert_eq!(cell_to_string(&DataType::Float(1.85)), "1.85");
        assert_eq!(cell_to_string(&DataType::Int(7)), "7");
        assert_eq!(cell_to_string(&DataType::String(" Galicia ".to_string())), "Galicia");
        assert_eq!(cell_to_string(&DataType::Empty), "");
    }

    fn workbook_source(worksheet: Option<&str>) -> (String, DatasetSource) {
        let path = format!("{}/testdata/gasto_ccaa.xlsx", env!("CARGO_MANIFEST_DIR"));
        let source = DatasetSource {
            name: "gasto".to_string(),
            provider: Some("xlsx".to_string()),
            file_path: path.clone(),
            delimiter: None,
            excel_worksheet_name: worksheet.map(|s| s.to_string()),
            territory_column: Some("Comunidad autónoma".to_string()),
            year_column: Some("Periodo".to_string()),
            sector_column: Some("Sector".to_string()),
            value_column: Some("Total".to_string()),
            flag_column: None,
            measure_column: None,
        };
        (path, source)
    }

    #[test]
    fn named_worksheet() {
        let (path, source) = workbook_source(Some("gasto"));
        let ds = read_excel_dataset(path, &source).unwrap();
        assert_eq!(ds.records.len(), 4);
        assert_eq!(ds.schema.sector, Some("Sector".to_string()));
        assert_eq!(ds.schema.flag, None);
        // Years are stored as numbers and read back without decimals.
        assert_eq!(ds.years(), vec!["2022", "2023"]);
        let first = &ds.records[0];
        assert_eq!(ds.territory(first), Some("Madrid, Comunidad de"));
        assert_eq!(ds.year(first), Some("2023"));
        assert_eq!(ds.sector(first), Some("_T"));
        assert_eq!(ds.value(first), Some(1.85));
        assert_eq!(ds.value(&ds.records[1]), Some(1.7));
        // ":" and a blank cell are both "no data".
        assert_eq!(ds.value(&ds.records[2]), None);
        assert_eq!(ds.value(&ds.records[3]), None);
    }

    #[test]
    fn first_worksheet_and_missing_worksheet() {
        // The first worksheet only holds notes: no territory column.
        let (path, source) = workbook_source(None);
        let err = read_excel_dataset(path, &source).unwrap_err();
        assert!(matches!(*err, AtlasError::MissingColumn { .. }));

        let (path, source) = workbook_source(Some("datos"));
        let err = read_excel_dataset(path, &source).unwrap_err();
        assert!(matches!(*err, AtlasError::MissingWorksheet { .. }));
    }

    #[test]
    fn not_a_workbook() {
        let path = format!("{}/testdata/gasto_ccaa.csv", env!("CARGO_MANIFEST_DIR"));
        let source = DatasetSource {
            name: "gasto".to_string(),
            provider: Some("xlsx".to_string()),
            file_path: path.clone(),
            delimiter: None,
            excel_worksheet_name: None,
            territory_column: None,
            year_column: None,
            sector_column: None,
            value_column: None,
            flag_column: None,
            measure_column: None,
        };
        let err = read_excel_dataset(path, &source).unwrap_err();
        assert!(matches!(*err, AtlasError::OpeningExcel { .. }));
    }
}
