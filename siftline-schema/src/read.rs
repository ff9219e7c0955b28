//! The `readDatum` command.
//!
//! Parses a byte input attached to the inbound record's
//! [`ATTACHMENT_BODY`](fields::ATTACHMENT_BODY) attribute. For every
//! decoded container the command synthesizes an outbound record — a copy of
//! the inbound record with the container as its attachment — and forwards
//! it to the child. The schema the bytes were written under must be
//! supplied explicitly; the schema used for reading is optional.

use crate::decoder::{Framing, ResolvingDecoder};
use crate::resolve;
use crate::schema::Schema;
use serde_json::Value as Json;
use siftline_core::command::{Command, Notification};
use siftline_core::context::{CommandBuilder, Context};
use siftline_core::error::{ConfigError, DecodeError, Result};
use siftline_core::record::{Record, Value};
use siftline_core::settings::Settings;
use siftline_core::fields;
use std::fs;
use tracing::{debug, trace};

/// MIME-like tag identifying an in-memory decoded container attachment.
pub const MEMORY_MIME_TYPE: &str = "application/x-datum+memory";

/// Builder for [`ReadDatum`] commands.
pub struct ReadDatumBuilder;

impl CommandBuilder for ReadDatumBuilder {
    fn names(&self) -> Vec<&'static str> {
        vec!["readDatum"]
    }

    fn build(
        &self,
        config: &Json,
        parent: Option<&str>,
        child: Box<dyn Command>,
        _context: &Context,
    ) -> Result<Box<dyn Command>> {
        Ok(Box::new(ReadDatum::from_config(config, parent, child)?))
    }
}

/// Command that decodes schema-described containers from an attached byte
/// stream and emits one outbound record per container.
pub struct ReadDatum {
    writer: Schema,
    reader: Option<Schema>,
    framing: Framing,
    parent: Option<String>,
    child: Box<dyn Command>,
}

impl std::fmt::Debug for ReadDatum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadDatum")
            .field("writer", &self.writer)
            .field("reader", &self.reader)
            .field("framing", &self.framing)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl ReadDatum {
    /// Build the command from its configuration slice.
    ///
    /// Recognized settings: `writerSchemaString` or `writerSchemaFile`
    /// (exactly one required), `readerSchemaString` or `readerSchemaFile`
    /// (optional, defaults to the writer schema), and `isJson` (default
    /// false). All validation happens here, before any record is processed.
    pub fn from_config(
        config: &Json,
        parent: Option<&str>,
        child: Box<dyn Command>,
    ) -> Result<Self> {
        let mut settings = Settings::new(config)?;

        let writer = load_schema(&mut settings, "writerSchemaString", "writerSchemaFile")?
            .ok_or_else(|| ConfigError::MissingSetting {
                key: "writerSchemaString".to_string(),
            })?;
        let reader = load_schema(&mut settings, "readerSchemaString", "readerSchemaFile")?;
        let framing = if settings.bool_or("isJson", false)? {
            Framing::Json
        } else {
            Framing::Binary
        };
        settings.reject_unknown()?;

        resolve::check_resolvable(&writer, reader.as_ref().unwrap_or(&writer))?;

        Ok(Self {
            writer,
            reader,
            framing,
            parent: parent.map(str::to_string),
            child,
        })
    }

    /// The schema the attached bytes are expected to be written under.
    pub fn writer_schema(&self) -> &Schema {
        &self.writer
    }

    /// The shape of the containers this command emits.
    pub fn reader_schema(&self) -> &Schema {
        self.reader.as_ref().unwrap_or(&self.writer)
    }

    fn decode_loop(&mut self, inbound: &Record, decoder: &mut ResolvingDecoder) -> Result<bool> {
        loop {
            let Some(datum) = decoder.next()? else {
                return Ok(true);
            };
            trace!("decoded one container");
            let mut outbound = inbound.copy();
            outbound.replace(fields::ATTACHMENT_BODY, datum);
            outbound.replace(
                fields::ATTACHMENT_MIME_TYPE,
                Value::String(MEMORY_MIME_TYPE.to_string()),
            );
            if !self.child.process(outbound)? {
                return Ok(false);
            }
        }
    }
}

impl Command for ReadDatum {
    fn notify(&mut self, notification: &Notification) {
        self.child.notify(notification);
    }

    fn process(&mut self, record: Record) -> Result<bool> {
        let stream = record
            .get_first(fields::ATTACHMENT_BODY)
            .and_then(Value::as_stream)
            .cloned()
            .ok_or_else(|| DecodeError::MissingAttachment {
                field: fields::ATTACHMENT_BODY.to_string(),
            })?;

        debug!(
            parent = self.parent.as_deref(),
            framing = ?self.framing,
            "decoding attached byte stream"
        );

        // The stream is released exactly once on every exit path: normal
        // completion, soft stop, and decode failure.
        let result = match ResolvingDecoder::new(
            self.writer.clone(),
            self.reader.clone(),
            self.framing,
            stream.clone(),
        ) {
            Ok(mut decoder) => self.decode_loop(&record, &mut decoder),
            Err(e) => Err(e),
        };
        stream.close();
        result
    }
}

fn load_schema(
    settings: &mut Settings<'_>,
    string_key: &'static str,
    file_key: &'static str,
) -> Result<Option<Schema>> {
    let inline = settings.string(string_key)?;
    let path = settings.string(file_key)?;
    match (inline, path) {
        (Some(_), Some(_)) => Err(ConfigError::ConflictingSettings {
            first: string_key.to_string(),
            second: file_key.to_string(),
        }
        .into()),
        (Some(text), None) => Ok(Some(Schema::parse_str(&text)?)),
        (None, Some(path)) => {
            let text = fs::read_to_string(&path).map_err(|e| ConfigError::InvalidSetting {
                key: file_key.to_string(),
                message: format!("cannot read schema file {path}: {e}"),
            })?;
            Ok(Some(Schema::parse_str(&text)?))
        }
        (None, None) => Ok(None),
    }
}
