//! Loading a document and its buffers from `.gltf` or `.glb` bytes.

use std::path::{Path, PathBuf};

use base64::Engine;

use crate::error::FormatError;

use super::document::Document;
use super::resolver::SceneBinaryResolver;

const GLB_MAGIC: &[u8; 4] = b"glTF";

/// Supplies bytes for buffers referenced by external URI.
pub trait BufferSource {
    fn load(&self, uri: &str) -> Result<Vec<u8>, FormatError>;
}

/// Resolves external buffer URIs relative to a directory.
#[derive(Debug, Clone)]
pub struct FsBufferSource {
    base: PathBuf,
}

impl FsBufferSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Source rooted at the directory containing `file`.
    pub fn beside(file: &Path) -> Self {
        Self::new(file.parent().unwrap_or_else(|| Path::new(".")))
    }
}

impl BufferSource for FsBufferSource {
    fn load(&self, uri: &str) -> Result<Vec<u8>, FormatError> {
        let path = self.base.join(uri);
        std::fs::read(&path)
            .map_err(|e| FormatError::Container(format!("{}: {e}", path.display())))
    }
}

/// Rejects every external URI; for self-contained assets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternalBuffers;

impl BufferSource for NoExternalBuffers {
    fn load(&self, uri: &str) -> Result<Vec<u8>, FormatError> {
        Err(FormatError::Container(format!(
            "external buffer '{uri}' not available"
        )))
    }
}

/// A parsed document together with the bytes of every buffer.
#[derive(Debug, Clone)]
pub struct GltfAsset {
    pub document: Document,
    pub buffers: Vec<Vec<u8>>,
}

impl GltfAsset {
    /// Load from `.gltf` JSON or a `.glb` container.
    pub fn from_slice(bytes: &[u8], source: &dyn BufferSource) -> Result<Self, FormatError> {
        let (document, mut bin) = if bytes.starts_with(GLB_MAGIC) {
            let (json, bin) = split_glb(bytes)?;
            (Document::from_slice(&json)?, bin)
        } else {
            (Document::from_slice(bytes)?, None)
        };

        let mut buffers = Vec::with_capacity(document.buffers.len());
        for (i, buffer) in document.buffers.iter().enumerate() {
            let mut data = match buffer.uri.as_deref() {
                Some(uri) if uri.starts_with("data:") => {
                    parse_data_uri(uri).ok_or_else(|| FormatError::MalformedBuffer {
                        buffer: i,
                        reason: "invalid base64 data URI".into(),
                    })?
                }
                Some(uri) => source.load(uri)?,
                None if i == 0 => bin.take().ok_or_else(|| FormatError::MalformedBuffer {
                    buffer: i,
                    reason: "no uri and no binary chunk".into(),
                })?,
                None => {
                    return Err(FormatError::MalformedBuffer {
                        buffer: i,
                        reason: "no uri".into(),
                    })
                }
            };
            if data.len() < buffer.byte_length {
                return Err(FormatError::MalformedBuffer {
                    buffer: i,
                    reason: format!(
                        "{} bytes available, byteLength is {}",
                        data.len(),
                        buffer.byte_length
                    ),
                });
            }
            // GLB chunks carry up to 3 padding bytes; they are not part of the buffer.
            data.truncate(buffer.byte_length);
            buffers.push(data);
        }

        log::info!(
            "Loaded glTF document: {} buffers, {} accessors, {} meshes",
            buffers.len(),
            document.accessors.len(),
            document.meshes.len()
        );

        Ok(Self { document, buffers })
    }

    /// Load a file, resolving external buffers beside it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| FormatError::Container(format!("{}: {e}", path.display())))?;
        Self::from_slice(&bytes, &FsBufferSource::beside(path))
    }

    pub fn resolver(&self) -> SceneBinaryResolver<'_> {
        SceneBinaryResolver::new(&self.document, &self.buffers)
    }
}

#[cfg(feature = "glb")]
fn split_glb(bytes: &[u8]) -> Result<(Vec<u8>, Option<Vec<u8>>), FormatError> {
    let glb = gltf_dep::Glb::from_slice(bytes).map_err(|e| FormatError::Container(e.to_string()))?;
    Ok((glb.json.into_owned(), glb.bin.map(|b| b.into_owned())))
}

#[cfg(not(feature = "glb"))]
fn split_glb(_bytes: &[u8]) -> Result<(Vec<u8>, Option<Vec<u8>>), FormatError> {
    Err(FormatError::Container(
        "binary glTF support is disabled (enable the `glb` feature)".into(),
    ))
}

/// Decode a `data:<mime>;base64,<payload>` URI.
fn parse_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let start = rest.find(";base64,")?;
    base64::engine::general_purpose::STANDARD
        .decode(&rest[start + 8..])
        .ok()
}
