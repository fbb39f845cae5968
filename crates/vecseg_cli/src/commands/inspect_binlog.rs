//! Inspect-binlog command implementation.

use super::{open_file, read_file};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::debug;
use vecseg_codec::{decode_column, DataType, Endian, FieldData, FieldValues};
use vecseg_core::{fill_field_data, BinlogFormat};

/// Rows shown when the whole file is decoded.
const PREVIEW_ROWS: usize = 10;

/// Column element types a binlog can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColumnType {
    /// One byte, 0 or 1.
    Bool,
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Length-framed UTF-8 strings.
    Varchar,
    /// `dim` 32-bit floats per row.
    FloatVector,
    /// `dim` bits per row.
    BinaryVector,
}

impl From<ColumnType> for DataType {
    fn from(t: ColumnType) -> Self {
        match t {
            ColumnType::Bool => Self::Bool,
            ColumnType::Int8 => Self::Int8,
            ColumnType::Int16 => Self::Int16,
            ColumnType::Int32 => Self::Int32,
            ColumnType::Int64 => Self::Int64,
            ColumnType::Float => Self::Float,
            ColumnType::Double => Self::Double,
            ColumnType::Varchar => Self::VarChar,
            ColumnType::FloatVector => Self::FloatVector,
            ColumnType::BinaryVector => Self::BinaryVector,
        }
    }
}

/// Options of the inspect-binlog command.
#[derive(Debug, Clone)]
pub struct BinlogArgs {
    /// Element type.
    pub column_type: ColumnType,
    /// Vector dimension, 0 for scalars.
    pub dim: usize,
    /// Bytes before the first row.
    pub header: u64,
    /// Values are big-endian.
    pub big_endian: bool,
    /// Decode only this row.
    pub row: Option<usize>,
}

impl BinlogArgs {
    fn format(&self) -> BinlogFormat {
        let endian = if self.big_endian {
            Endian::Big
        } else {
            Endian::Little
        };
        BinlogFormat::new(self.header, endian)
    }
}

/// Binlog inspection result.
#[derive(Debug, Serialize)]
pub struct BinlogReport {
    /// Binlog path.
    pub path: String,
    /// Element type.
    pub data_type: DataType,
    /// Rows in the file, if the whole file was decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    /// The requested row, if one was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Decoded values: the requested row, or the leading rows.
    pub values: FieldValues,
}

impl fmt::Display for BinlogReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Binlog: {}", self.path)?;
        writeln!(f, "  Type: {}", self.data_type)?;
        if let Some(rows) = self.rows {
            writeln!(f, "  Rows: {rows}")?;
        }
        match self.row {
            Some(row) => write!(f, "  Row {row}: {:?}", self.values),
            None => write!(f, "  First {} rows: {:?}", self.values.len(), self.values),
        }
    }
}

/// Runs the inspect-binlog command.
pub fn run(path: &Path, args: &BinlogArgs) -> Result<BinlogReport, Box<dyn std::error::Error>> {
    let data_type = DataType::from(args.column_type);
    data_type.check_dim(args.dim)?;
    let format = args.format();

    let Some(row) = args.row else {
        let bytes = read_file(path)?;
        let header = usize::try_from(args.header)?;
        let body = bytes
            .get(header..)
            .ok_or_else(|| format!("file is shorter than its {header}-byte header"))?;
        let column = decode_column(data_type, args.dim, body, format.endian)?;
        let rows = column.len();
        debug!(rows, "decoded binlog");
        let preview: Vec<usize> = (0..rows.min(PREVIEW_ROWS)).collect();
        return Ok(BinlogReport {
            path: path.display().to_string(),
            data_type,
            rows: Some(rows),
            row: None,
            values: column.gather(&preview)?,
        });
    };

    let (chunk_manager, name) = open_file(path)?;
    let values = FieldValues::with_rows(data_type, args.dim, 1)?;
    let mut field = FieldData::new(0, "binlog", data_type, values);
    fill_field_data(&chunk_manager, &name, &mut field, 0, i64::try_from(row)?, format)?;
    Ok(BinlogReport {
        path: path.display().to_string(),
        data_type,
        rows: None,
        row: Some(row),
        values: field.values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vecseg_codec::{encode_column, encode_strings};

    fn write(dir: &Path, name: &str, header: usize, body: Vec<u8>) -> std::path::PathBuf {
        let mut bytes = vec![0u8; header];
        bytes.extend(body);
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn args(column_type: ColumnType, row: Option<usize>) -> BinlogArgs {
        BinlogArgs {
            column_type,
            dim: 0,
            header: 4,
            big_endian: false,
            row,
        }
    }

    #[test]
    fn whole_file_preview() {
        let dir = tempfile::tempdir().unwrap();
        let values = FieldValues::Int64((0..25).collect());
        let path = write(dir.path(), "ints", 4, encode_column(&values, Endian::Little));
        let report = run(&path, &args(ColumnType::Int64, None)).unwrap();
        assert_eq!(report.rows, Some(25));
        assert_eq!(report.values, FieldValues::Int64((0..10).collect()));
    }

    #[test]
    fn single_row_reads_through_fill() {
        let dir = tempfile::tempdir().unwrap();
        let strings = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
        let path = write(dir.path(), "names", 4, encode_strings(&strings, Endian::Little));
        let report = run(&path, &args(ColumnType::Varchar, Some(2))).unwrap();
        assert_eq!(report.values, FieldValues::VarChar(vec!["ccc".into()]));
        assert!(report.to_string().contains("Row 2"));
    }

    #[test]
    fn vectors_need_a_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "vecs", 0, vec![0; 16]);
        assert!(run(&path, &args(ColumnType::FloatVector, None)).is_err());
    }
}
