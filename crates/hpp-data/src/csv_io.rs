//! Split CSV IO.
//!
//! Split files carry the eight feature columns followed by the target column.
//! Readers locate columns by header name, so column order in a hand-edited
//! file does not matter; extra columns are ignored.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use hpp_core::{FEATURE_NAMES, N_FEATURES, TARGET_COLUMN};

use crate::dataset::Dataset;
use crate::error::DataError;

/// Read a split CSV from disk.
pub fn read_split_csv(path: &Path) -> Result<Dataset, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::io(path, e))?;
    read_split(file, &path.display().to_string())
}

/// Read a split CSV from any reader. `source_name` labels errors.
pub fn read_split<R: Read>(reader: R, source_name: &str) -> Result<Dataset, DataError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let locate = |column: &str| {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| DataError::MissingColumn {
                column: column.to_string(),
                source_name: source_name.to_string(),
            })
    };

    let mut feature_idx = [0usize; N_FEATURES];
    for (slot, name) in feature_idx.iter_mut().zip(FEATURE_NAMES) {
        *slot = locate(name)?;
    }
    let target_idx = locate(TARGET_COLUMN)?;

    let mut features = Vec::new();
    let mut targets = Vec::new();
    for (row_no, record) in rdr.records().enumerate() {
        let record = record?;
        let cell = |idx: usize, column: &str| -> Result<f64, DataError> {
            let raw = record.get(idx).unwrap_or("").trim();
            raw.parse::<f64>().map_err(|_| DataError::Parse {
                row: row_no + 1,
                column: column.to_string(),
                value: raw.to_string(),
            })
        };
        let mut row = [0.0; N_FEATURES];
        for ((slot, &idx), name) in row.iter_mut().zip(feature_idx.iter()).zip(FEATURE_NAMES) {
            *slot = cell(idx, name)?;
        }
        features.push(row);
        targets.push(cell(target_idx, TARGET_COLUMN)?);
    }
    Dataset::new(features, targets)
}

/// Write a split CSV, creating parent directories as needed.
pub fn write_split_csv(path: &Path, dataset: &Dataset) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }
    let file = fs::File::create(path).map_err(|e| DataError::io(path, e))?;
    write_split(file, dataset)
}

/// Write a split CSV to any writer.
pub fn write_split<W: Write>(writer: W, dataset: &Dataset) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
    header.push(TARGET_COLUMN);
    wtr.write_record(&header)?;
    for (row, target) in dataset.rows() {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(target.to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| DataError::io("<csv writer>", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec![
                [8.3252, 41.0, 6.984127, 1.02381, 322.0, 2.555556, 37.88, -122.23],
                [5.6431, 52.0, 5.817352, 1.073059, 558.0, 2.547945, 37.85, -122.25],
            ],
            vec![4.526, 3.413],
        )
        .unwrap()
    }

    #[test]
    fn written_file_reads_back_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/train.csv");
        write_split_csv(&path, &sample()).unwrap();
        assert_eq!(read_split_csv(&path).unwrap(), sample());
    }

    #[test]
    fn header_lists_features_then_target() {
        let mut buf = Vec::new();
        write_split(&mut buf, &sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "MedInc,HouseAge,AveRooms,AveBedrms,Population,AveOccup,Latitude,Longitude,median_house_value"
        );
    }

    #[test]
    fn columns_are_located_by_name() {
        let csv = "median_house_value,Longitude,Latitude,AveOccup,Population,AveBedrms,AveRooms,HouseAge,MedInc,extra\n\
                   2.5,-120,35,3,1000,1,5,20,4,ignored\n";
        let ds = read_split(csv.as_bytes(), "inline").unwrap();
        assert_eq!(ds.targets(), &[2.5]);
        assert_eq!(ds.features()[0], [4.0, 20.0, 5.0, 1.0, 1000.0, 3.0, 35.0, -120.0]);
    }

    #[test]
    fn missing_column_is_named() {
        let csv = "MedInc,HouseAge\n1,2\n";
        let err = read_split(csv.as_bytes(), "inline").unwrap_err();
        match err {
            DataError::MissingColumn { column, source_name } => {
                assert_eq!(column, "AveRooms");
                assert_eq!(source_name, "inline");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_cell_reports_row_and_column() {
        let csv = "MedInc,HouseAge,AveRooms,AveBedrms,Population,AveOccup,Latitude,Longitude,median_house_value\n\
                   1,2,3,1,100,2,35,-120,1.5\n\
                   1,two,3,1,100,2,35,-120,1.5\n";
        let err = read_split(csv.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, DataError::Parse { row: 2, ref column, .. } if column == "HouseAge"));
    }
}
