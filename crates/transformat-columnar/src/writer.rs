//! Buffered, lazily-opened Parquet writer.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arrow::array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use transformat_data::FieldDefinition;
use transformat_parse::{Record, Value};

use crate::error::{ColumnarError, Result};
use crate::schema::build_schema;

/// Default number of rows buffered per batch before a row group is
/// flushed. Mirrors `STREAM_BATCH_SIZE`'s spec default.
pub const DEFAULT_BATCH_SIZE: usize = 30_000;

/// Tracks the most recent IO error observed by the writer's underlying
/// file handle, so a disk-space condition can be distinguished from a
/// generic write failure after the error has passed through
/// [`parquet::errors::ParquetError`]'s string-only variants.
#[derive(Clone, Default)]
struct LastIoError(Arc<Mutex<Option<io::Error>>>);

impl LastIoError {
    fn record(&self, error: &io::Error) {
        let cloned = error
            .raw_os_error()
            .map_or_else(|| io::Error::new(error.kind(), error.to_string()), io::Error::from_raw_os_error);
        *self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(cloned);
    }

    fn take(&self) -> Option<io::Error> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take()
    }
}

struct TrackedFile {
    file: File,
    last_error: LastIoError,
}

impl Write for TrackedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf).inspect_err(|source| self.last_error.record(source))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush().inspect_err(|source| self.last_error.record(source))
    }
}

/// Consumes a lazy record stream and writes one Parquet file containing
/// every record, in arrival order, buffered into fixed-size batches.
///
/// The writer is opened lazily on the first full batch: an input that
/// yields no records (or fewer than `batch_size`, flushed once at stream
/// end) produces a file only if at least one record was seen, so a
/// zero-record input never touches the filesystem.
pub struct ColumnarWriter {
    batch_size: usize,
}

impl ColumnarWriter {
    /// Build a writer with the given batch size.
    #[must_use]
    pub const fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Build a writer using [`DEFAULT_BATCH_SIZE`].
    #[must_use]
    pub const fn default_batch_size() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }

    /// Write every record the stream yields to `output_path`, returning the
    /// total row count written.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnarError::Io`] if the output directory or file cannot
    /// be created, [`ColumnarError::DiskSpace`] if the device runs out of
    /// space or quota while writing, or [`ColumnarError::Write`] for any
    /// other Arrow/Parquet failure. If `records` itself yields an error, it
    /// is forwarded unchanged as [`ColumnarError::Upstream`] rather than
    /// reclassified as a write failure. The writer is flushed and closed on
    /// every exit path, including errors.
    pub fn write_stream<I>(
        &self,
        records: I,
        output_path: &Path,
        field_defs: &[FieldDefinition],
    ) -> Result<usize>
    where
        I: Iterator<Item = transformat_errors::Result<Record>>,
    {
        let schema = Arc::new(build_schema(field_defs));

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| io_error(source, output_path))?;
        }

        let mut writer: Option<(ArrowWriter<TrackedFile>, LastIoError)> = None;
        let mut total_rows = 0usize;
        let mut batch: Vec<Record> = Vec::with_capacity(self.batch_size);

        let result = (|| -> Result<()> {
            for record in records {
                let record = record.map_err(ColumnarError::Upstream)?;
                batch.push(record);

                if batch.len() >= self.batch_size {
                    self.flush_batch(&mut writer, &mut batch, &schema, output_path)?;
                    total_rows += self.batch_size;
                }
            }

            if !batch.is_empty() {
                let remaining = batch.len();
                self.flush_batch(&mut writer, &mut batch, &schema, output_path)?;
                total_rows += remaining;
            }

            Ok(())
        })();

        if let Some((arrow_writer, last_error)) = writer {
            let close_result = arrow_writer.close();
            if result.is_ok() {
                close_result.map_err(|source| classify(source, &last_error, output_path))?;
            }
        }

        result?;
        tracing::info!(path = %output_path.display(), total_rows, "parquet write complete");
        Ok(total_rows)
    }

    fn flush_batch(
        &self,
        writer: &mut Option<(ArrowWriter<TrackedFile>, LastIoError)>,
        batch: &mut Vec<Record>,
        schema: &Arc<Schema>,
        output_path: &Path,
    ) -> Result<()> {
        if writer.is_none() {
            let last_error = LastIoError::default();
            let file = File::create(output_path).map_err(|source| io_error(source, output_path))?;
            let tracked = TrackedFile {
                file,
                last_error: last_error.clone(),
            };
            let arrow_writer =
                ArrowWriter::try_new(tracked, Arc::clone(schema), None).map_err(|source| {
                    classify(source, &last_error, output_path)
                })?;
            *writer = Some((arrow_writer, last_error));
        }

        let (arrow_writer, last_error) = writer.as_mut().expect("writer opened above");
        let record_batch = to_record_batch(batch, schema);
        batch.clear();

        arrow_writer
            .write(&record_batch)
            .map_err(|source| classify(source, last_error, output_path))
    }
}

fn io_error(source: io::Error, output_path: &Path) -> ColumnarError {
    if crate::error::is_disk_space_exhausted(&source) {
        return ColumnarError::DiskSpace {
            path: output_path.to_path_buf(),
        };
    }
    ColumnarError::Io {
        path: output_path.to_path_buf(),
        source,
    }
}

fn classify(
    source: parquet::errors::ParquetError,
    last_error: &LastIoError,
    output_path: &Path,
) -> ColumnarError {
    if let Some(io_error) = last_error.take() {
        if crate::error::is_disk_space_exhausted(&io_error) {
            return ColumnarError::DiskSpace {
                path: output_path.to_path_buf(),
            };
        }
    }
    ColumnarError::Write {
        path: output_path.to_path_buf(),
        source,
    }
}

fn to_record_batch(records: &[Record], schema: &Arc<Schema>) -> RecordBatch {
    let columns: Vec<ArrayRef> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(index, field)| build_column(records, index, field.data_type()))
        .collect();

    RecordBatch::try_new(Arc::clone(schema), columns).expect("column arrays match schema arity")
}

fn build_column(records: &[Record], field_index: usize, data_type: &DataType) -> ArrayRef {
    match data_type {
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(records.len());
            for record in records {
                match value_at(record, field_index) {
                    Value::Int(value) => builder.append_value(*value),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(records.len());
            for record in records {
                match value_at(record, field_index) {
                    Value::Double(value) => builder.append_value(*value),
                    _ => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::with_capacity(records.len(), records.len() * 16);
            for record in records {
                match value_at(record, field_index) {
                    Value::String(value) => builder.append_value(value),
                    Value::Timestamp(value) => {
                        builder.append_value(value.format("%Y-%m-%d %H:%M:%S").to_string());
                    }
                    Value::Int(value) => builder.append_value(value.to_string()),
                    Value::Double(value) => builder.append_value(value.to_string()),
                    Value::Null => builder.append_null(),
                }
            }
            Arc::new(builder.finish())
        }
    }
}

fn value_at(record: &Record, index: usize) -> &Value {
    record
        .iter()
        .nth(index)
        .map(|(_, value)| value)
        .unwrap_or(&Value::Null)
}

/// Output path for the columnar file produced from an input file's
/// basename: `<output_dir>/<basename-without-extension>.parquet`.
#[must_use]
pub fn output_path_for(output_dir: &Path, input_file_name: &str) -> PathBuf {
    let stem = Path::new(input_file_name)
        .file_stem()
        .map_or_else(|| input_file_name.to_string(), |stem| stem.to_string_lossy().to_string());
    output_dir.join(format!("{stem}.parquet"))
}

/// Masked variant of a columnar output path: `…_masked.parquet`.
#[must_use]
pub fn masked_path_for(output_path: &Path) -> PathBuf {
    let stem = output_path.file_stem().map_or_else(String::new, |stem| stem.to_string_lossy().to_string());
    output_path.with_file_name(format!("{stem}_masked.parquet"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use transformat_data::{FieldType, TransformType};

    fn field(name: &str, field_type: FieldType) -> FieldDefinition {
        FieldDefinition {
            id: 1,
            file_name: "sample.txt".to_string(),
            field_name: name.to_string(),
            sequence: 1,
            field_type,
            start_position: 0,
            field_length: 0,
            transform_type: TransformType::Plain,
        }
    }

    fn record(values: &[Value]) -> Record {
        let mut record = Record::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            record.push(format!("f{index}"), value.clone());
        }
        record
    }

    #[test]
    fn zero_record_input_never_creates_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("empty.parquet");
        let defs = vec![field("f0", FieldType::Int)];
        let writer = ColumnarWriter::new(DEFAULT_BATCH_SIZE);

        let rows = writer
            .write_stream(std::iter::empty(), &output, &defs)
            .unwrap();

        assert_eq!(rows, 0);
        assert!(!output.exists());
    }

    #[test]
    fn writes_all_records_across_a_partial_final_batch() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.parquet");
        let defs = vec![field("id", FieldType::Int), field("name", FieldType::String)];
        let writer = ColumnarWriter::new(2);

        let records = vec![
            Ok(record(&[Value::Int(1), Value::String("a".into())])),
            Ok(record(&[Value::Int(2), Value::String("b".into())])),
            Ok(record(&[Value::Int(3), Value::String("c".into())])),
        ];

        let rows = writer
            .write_stream(records.into_iter(), &output, &defs)
            .unwrap();

        assert_eq!(rows, 3);
        assert!(output.exists());
    }

    #[test]
    fn output_path_strips_input_extension() {
        let dir = Path::new("/tmp/out");
        let path = output_path_for(dir, "statement.txt");
        assert_eq!(path, dir.join("statement.parquet"));
    }

    #[test]
    fn masked_path_suffixes_before_the_extension() {
        let path = masked_path_for(Path::new("/tmp/out/statement.parquet"));
        assert_eq!(path, Path::new("/tmp/out/statement_masked.parquet"));
    }
}
