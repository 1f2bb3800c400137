pub use crate::config::*;

/// A builder for assembling datasets.
///
/// Readers push the rows of a file as they come; tests and small programs can
/// add observations directly.
///
/// ```
/// pub use idi_atlas::builder::Builder;
/// pub use idi_atlas::DatasetSchema;
/// # use idi_atlas::AtlasErrors;
///
/// let mut builder = Builder::new("gasto_idi")?.schema(DatasetSchema::default())?;
///
/// builder.add_observation("Madrid", "2023", "_T", "1,85")?;
/// builder.add_record(&[("geo", "Galicia"), ("TIME_PERIOD", "2023"), ("OBS_VALUE", "")])?;
///
/// let dataset = builder.build();
/// assert_eq!(dataset.records.len(), 2);
/// assert_eq!(dataset.value(&dataset.records[0]), Some(1.85));
/// assert_eq!(dataset.value(&dataset.records[1]), None);
///
/// # Ok::<(), AtlasErrors>(())
/// ```
pub struct Builder {
    pub(crate) _name: String,
    pub(crate) _schema: DatasetSchema,
    pub(crate) _records: Vec<DatasetRecord>,
}

impl Builder {
    pub fn new(name: &str) -> Result<Builder, AtlasErrors> {
        Ok(Builder {
            _name: name.to_string(),
            _schema: DatasetSchema::default(),
            _records: Vec::new(),
        })
    }

    pub fn schema(self, schema: DatasetSchema) -> Result<Builder, AtlasErrors> {
        Ok(Builder {
            _name: self._name,
            _schema: schema,
            _records: Vec::new(),
        })
    }

    /// Adds one observation, using the columns of the schema.
    ///
    /// The sector is dropped when the schema has no sector column.
    pub fn add_observation(
        &mut self,
        territory: &str,
        year: &str,
        sector: &str,
        value: &str,
    ) -> Result<(), AtlasErrors> {
        let mut fields: Vec<(&str, &str)> = vec![
            (self._schema.territory.as_str(), territory),
            (self._schema.year.as_str(), year),
            (self._schema.value.as_str(), value),
        ];
        if let Some(col) = self._schema.sector.as_deref() {
            fields.push((col, sector));
        }
        let record = DatasetRecord::from_pairs(&fields);
        self.add_record_2(record)
    }

    /// Adds a row given as (column, cell) pairs.
    ///
    /// The territory and year columns of the schema must be present.
    pub fn add_record(&mut self, fields: &[(&str, &str)]) -> Result<(), AtlasErrors> {
        self.add_record_2(DatasetRecord::from_pairs(fields))
    }

    pub fn add_record_2(&mut self, record: DatasetRecord) -> Result<(), AtlasErrors> {
        for col in [&self._schema.territory, &self._schema.year] {
            if record.get(col).is_none() {
                return Err(AtlasErrors::MissingColumn(col.clone()));
            }
        }
        self._records.push(record);
        Ok(())
    }

    pub fn build(self) -> Dataset {
        Dataset {
            name: self._name,
            schema: self._schema,
            records: self._records,
        }
    }
}
