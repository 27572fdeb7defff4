//! File uploads for message and comment attachments.
//!
//! An upload is a raw `POST /upload` of the file bytes. The server answers
//! with an opaque upload id, which is then referenced from the `attachments`
//! of a message or comment.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::WireFormat;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::http::HttpResponse;
use crate::node::ParsedNode;
use crate::typecast::{typecast, Value};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    id: Option<String>,
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            filename: filename.into(),
            content: content.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Upload id; `None` until a save succeeds.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Upload the content. On failure the attachment keeps no id and the
    /// error carries the server's status.
    pub fn save(&mut self, conn: &Connection) -> Result<()> {
        let response = conn.post(
            "/upload",
            Some(self.content.clone()),
            &[("Content-Type", self.content_type.as_str()), ("Accept", WireFormat::Xml.media_type())],
        )?;

        if !response.is_success() {
            warn!(status = response.status, filename = %self.filename, "upload rejected");
            self.id = None;
            return Err(Error::Save {
                status: response.status,
                message: response.reason,
            });
        }

        self.id = None;
        self.id = upload_id(&response)?;
        debug!(id = ?self.id, filename = %self.filename, "uploaded attachment");
        if self.id.is_none() {
            return Err(Error::Decode("upload response carried no id".to_string()));
        }
        Ok(())
    }

    /// The `attachments` entry referencing this upload:
    /// `{file: {file: <id>, original_filename, content_type}}`.
    pub fn to_value(&self) -> Value {
        let mut file = IndexMap::new();
        file.insert(
            "file".to_string(),
            self.id.clone().map(Value::String).unwrap_or(Value::Nil),
        );
        file.insert("original_filename".to_string(), Value::from(self.filename.as_str()));
        file.insert("content_type".to_string(), Value::from(self.content_type.as_str()));

        let mut outer = IndexMap::new();
        outer.insert("file".to_string(), Value::Map(file));
        Value::Map(outer)
    }
}

/// Build and upload an attachment in one step.
pub fn create(conn: &Connection, filename: &str, content: impl Into<Vec<u8>>) -> Result<Attachment> {
    let mut attachment = Attachment::new(filename, content);
    attachment.save(conn)?;
    Ok(attachment)
}

/// Id from an `<upload><id>..</id></upload>` body, else from `Location`.
fn upload_id(response: &HttpResponse) -> Result<Option<String>> {
    if !response.body.trim().is_empty() {
        let node = ParsedNode::decode(&response.body, WireFormat::Xml)?;
        let id = match typecast(&node)? {
            Value::Map(top) => top
                .get("upload")
                .and_then(Value::as_map)
                .and_then(|upload| upload.get("id"))
                .and_then(scalar_id),
            _ => None,
        };
        if id.is_some() {
            return Ok(id);
        }
    }
    Ok(response
        .header("location")
        .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
        .filter(|last| !last.is_empty() && *last != "upload")
        .map(str::to_string))
}

fn scalar_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}
