use anyhow::Result;
use csv::{Writer, WriterBuilder};
use tracing::{debug, info};

use crate::config::{PART_FILE_NAME, SUCCESS_MARKER};
use crate::models::Record;
use crate::store::ObjectStore;

const HEADER: [&str; 3] = ["name", "age", "city"];

/// Buffers the output rows and writes them as one part under `prefix`,
/// replacing whatever was there before.
///
/// Cells are quoted only when needed, empty cells are written as `""` so they
/// do not read back as nulls, and embedded quotes are escaped as `\"`.
pub struct CsvPartWriter {
    bucket: String,
    prefix: String,
    current_rows: usize,
    buf: Vec<u8>,
    field: Writer<Vec<u8>>,
}

impl CsvPartWriter {
    pub fn new(bucket: &str, prefix: &str) -> Result<Self> {
        let field = WriterBuilder::new()
            .has_headers(false)
            .double_quote(false)
            .escape(b'\\')
            .from_writer(Vec::new());

        let mut part = Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            current_rows: 0,
            buf: Vec::new(),
            field,
        };
        part.push_row(&HEADER)?;
        Ok(part)
    }

    fn part_key(&self) -> String {
        format!("{}{}", self.prefix, PART_FILE_NAME)
    }

    // A one-field record is quoted exactly like a cell, and an empty one
    // comes out as `""`.
    fn push_field(&mut self, value: &str) -> Result<()> {
        self.field.write_record([value])?;
        self.field.flush()?;
        let encoded = std::mem::take(self.field.get_mut());
        self.buf
            .extend_from_slice(encoded.strip_suffix(b"\n").unwrap_or(&encoded[..]));
        Ok(())
    }

    fn push_row(&mut self, cells: &[&str]) -> Result<()> {
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                self.buf.push(b',');
            }
            self.push_field(cell)?;
        }
        self.buf.push(b'\n');
        Ok(())
    }

    pub fn write_record(&mut self, rec: &Record) -> Result<()> {
        // text cells lose surrounding whitespace on write
        let age = rec.age.to_string();
        self.push_row(&[rec.name.trim(), age.as_str(), rec.city.trim()])?;
        self.current_rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.current_rows
    }

    /// Clears the prefix, uploads the part and then the success marker.
    /// Returns the part's key.
    pub async fn finalize<S: ObjectStore + ?Sized>(self, store: &S) -> Result<String> {
        let key = self.part_key();
        let marker = format!("{}{}", self.prefix, SUCCESS_MARKER);
        let data = self.buf;

        let stale = store.list_keys(&self.bucket, &self.prefix).await?;
        if !stale.is_empty() {
            debug!(count = stale.len(), prefix = %self.prefix, "removing previous output");
            store.delete_objects(&self.bucket, &stale).await?;
        }

        let bytes = data.len();
        store.put_object(&self.bucket, &key, data).await?;
        store.put_object(&self.bucket, &marker, Vec::new()).await?;

        info!(bucket = %self.bucket, key = %key, rows = self.current_rows, bytes, "wrote output part");
        Ok(key)
    }
}
