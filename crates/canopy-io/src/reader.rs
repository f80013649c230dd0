//! CSV table reader with full input validation.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::domain::{ColumnLayout, ColumnSelector, FeatureTable, SampleId, Table};
use crate::IoError;

/// Reads a regression dataset from a CSV file with a header row.
///
/// Columns are picked by a [`ColumnLayout`]; the default layout reads the
/// id from column 0, the target from column 1, and treats every other
/// column as a feature.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::DuplicateColumn`] | Header repeats a column name |
/// | [`IoError::MissingColumn`] | A named column is not in the header |
/// | [`IoError::ColumnOutOfRange`] | A positional column is past the header |
/// | [`IoError::ConflictingColumns`] | One column is selected for two roles |
/// | [`IoError::NoFeatureColumns`] | No feature column is left |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptySampleId`] | Id cell is blank |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::DuplicateSampleId`] | Same id appears twice |
pub struct TableReader {
    path: PathBuf,
    layout: ColumnLayout,
}

/// Ids and parsed numeric cells of every data row.
struct ParsedRows {
    ids: Vec<SampleId>,
    values: Vec<Vec<f64>>,
}

impl TableReader {
    /// Create a new reader for the given CSV file path with the positional layout.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            layout: ColumnLayout::positional(),
        }
    }

    /// Use a different column layout.
    #[must_use]
    pub fn with_layout(mut self, layout: ColumnLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Read and validate the CSV file, returning a [`Table`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Table, IoError> {
        let (mut rdr, header) = self.open()?;

        let id_col = self.resolve(&self.layout.id, &header)?;
        let target_col = self.resolve(&self.layout.target, &header)?;
        if id_col == target_col {
            return Err(IoError::ConflictingColumns {
                column: header[id_col].clone(),
            });
        }

        let feature_cols: Vec<usize> = match &self.layout.features {
            Some(names) => self.resolve_features(names, &header, &[id_col, target_col])?,
            None => (0..header.len())
                .filter(|&c| c != id_col && c != target_col)
                .collect(),
        };
        if feature_cols.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }

        let mut value_cols = Vec::with_capacity(feature_cols.len() + 1);
        value_cols.push(target_col);
        value_cols.extend_from_slice(&feature_cols);

        let parsed = self.parse_rows(&mut rdr, &header, id_col, &value_cols)?;

        let mut targets = Vec::with_capacity(parsed.values.len());
        let mut features = Vec::with_capacity(parsed.values.len());
        for mut row in parsed.values {
            let rest = row.split_off(1);
            targets.push(row[0]);
            features.push(rest);
        }
        let feature_names: Vec<String> = feature_cols.iter().map(|&c| header[c].clone()).collect();

        info!(
            n_samples = parsed.ids.len(),
            n_features = feature_names.len(),
            target = %header[target_col],
            "table loaded"
        );

        Table::new(parsed.ids, header[target_col].clone(), targets, feature_names, features)
    }

    /// Read only the id column and the named feature columns, in the given order.
    ///
    /// The target column need not be present. Used to load prediction inputs
    /// in the column order a model was trained with.
    #[instrument(skip(self, names), fields(path = %self.path.display(), n_features = names.len()))]
    pub fn read_features(&self, names: &[String]) -> Result<FeatureTable, IoError> {
        let (mut rdr, header) = self.open()?;

        let id_col = self.resolve(&self.layout.id, &header)?;
        let feature_cols = self.resolve_features(names, &header, &[id_col])?;
        if feature_cols.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }

        let parsed = self.parse_rows(&mut rdr, &header, id_col, &feature_cols)?;
        info!(n_samples = parsed.ids.len(), "feature table loaded");

        FeatureTable::new(parsed.ids, names.to_vec(), parsed.values)
    }

    fn open(&self) -> Result<(csv::Reader<File>, Vec<String>), IoError> {
        let file = File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets InconsistentRowLength fire instead of a
        // low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(String::from)
            .collect();
        debug!(n_columns = header.len(), "read CSV header");

        let mut seen = HashMap::new();
        for (i, name) in header.iter().enumerate() {
            if seen.insert(name.as_str(), i).is_some() {
                return Err(IoError::DuplicateColumn {
                    path: self.path.clone(),
                    column: name.clone(),
                });
            }
        }

        Ok((rdr, header))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn resolve(&self, selector: &ColumnSelector, header: &[String]) -> Result<usize, IoError> {
        match selector {
            ColumnSelector::Named(name) => header.iter().position(|h| h == name).ok_or_else(|| {
                IoError::MissingColumn {
                    path: self.path.clone(),
                    column: name.clone(),
                }
            }),
            ColumnSelector::Position(position) if *position < header.len() => Ok(*position),
            ColumnSelector::Position(position) => Err(IoError::ColumnOutOfRange {
                path: self.path.clone(),
                position: *position,
                n_columns: header.len(),
            }),
        }
    }

    fn resolve_features(
        &self,
        names: &[String],
        header: &[String],
        reserved: &[usize],
    ) -> Result<Vec<usize>, IoError> {
        let mut cols: Vec<usize> = Vec::with_capacity(names.len());
        for name in names {
            let col = self.resolve(&ColumnSelector::Named(name.clone()), header)?;
            if reserved.contains(&col) || cols.contains(&col) {
                return Err(IoError::ConflictingColumns {
                    column: name.clone(),
                });
            }
            cols.push(col);
        }
        Ok(cols)
    }

    fn parse_rows(
        &self,
        rdr: &mut csv::Reader<File>,
        header: &[String],
        id_col: usize,
        value_cols: &[usize],
    ) -> Result<ParsedRows, IoError> {
        let mut ids = Vec::new();
        let mut values = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            let id = record.get(id_col).unwrap_or("").to_string();

            if record.len() != header.len() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    sample_id: id,
                    expected: header.len(),
                    got: record.len(),
                });
            }
            if id.is_empty() {
                return Err(IoError::EmptySampleId {
                    path: self.path.clone(),
                    row_index,
                });
            }
            if let Some(&first_row) = seen.get(&id) {
                return Err(IoError::DuplicateSampleId {
                    path: self.path.clone(),
                    sample_id: id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(id.clone(), row_index);

            let mut row = Vec::with_capacity(value_cols.len());
            for &col in value_cols {
                let raw = record.get(col).unwrap_or("");
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        column: header[col].clone(),
                        raw: raw.to_string(),
                    })?;
                row.push(value);
            }

            ids.push(SampleId::new(id));
            values.push(row);
        }

        if ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        Ok(ParsedRows { ids, values })
    }
}
