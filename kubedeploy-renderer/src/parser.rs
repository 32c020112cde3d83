//! Split rendered manifest text into [`ResourceObject`]s.
//!
//! Input is a YAML stream (JSON documents are valid YAML). Documents are
//! decoded one at a time; empty documents, e.g. a trailing `---`, are skipped.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use kubedeploy_core::ResourceObject;

use crate::error::{DocumentError, RenderError};

/// Lazy iterator over the objects in a manifest stream.
///
/// Yields at most one error, after which it is exhausted.
pub struct ObjectStream<'de> {
    file: PathBuf,
    documents: serde_yaml::Deserializer<'de>,
    index: usize,
    done: bool,
}

impl<'de> ObjectStream<'de> {
    fn fail(&mut self, source: DocumentError) -> RenderError {
        self.done = true;
        RenderError::Parse {
            file: self.file.clone(),
            source,
        }
    }
}

impl Iterator for ObjectStream<'_> {
    type Item = Result<ResourceObject, RenderError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let document = self.documents.next()?;
            let index = self.index;
            self.index += 1;

            match decode(document, index) {
                Ok(Some(obj)) => return Some(Ok(obj)),
                Ok(None) => continue,
                Err(e) => return Some(Err(self.fail(e))),
            }
        }
        None
    }
}

fn decode(
    document: serde_yaml::Deserializer<'_>,
    index: usize,
) -> Result<Option<ResourceObject>, DocumentError> {
    let value =
        Value::deserialize(document).map_err(|source| DocumentError::Decode { index, source })?;
    if value.is_null() {
        return Ok(None);
    }
    if !value.is_object() {
        return Err(DocumentError::NotAMapping { index });
    }

    let obj = ResourceObject::new(value);
    let required = [
        ("apiVersion", obj.api_version()),
        ("kind", obj.kind()),
        ("metadata.name", obj.name()),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.is_empty()) {
        return Err(DocumentError::MissingField {
            index,
            field: *field,
        });
    }
    Ok(Some(obj))
}

/// Start decoding `data`; `file` identifies the source in errors.
pub fn parse_objects<'de>(file: &Path, data: &'de [u8]) -> ObjectStream<'de> {
    ObjectStream {
        file: file.to_path_buf(),
        documents: serde_yaml::Deserializer::from_slice(data),
        index: 0,
        done: false,
    }
}

/// Decode every object in `data`, or fail without a partial result.
pub fn parse_all(file: &Path, data: &[u8]) -> Result<Vec<ResourceObject>, RenderError> {
    parse_objects(file, data).collect()
}
