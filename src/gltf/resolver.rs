//! Accessor resolution against buffer views and buffers.
//!
//! [`SceneBinaryResolver::resolve`] validates every byte range up front and
//! returns an [`AccessorView`]: a borrowed, `Copy` window over the buffer bytes
//! that decodes elements on demand. Views never own memory.

use crate::error::{ConsistencyError, FormatError};

use super::component::{ComponentType, ElementType};
use super::document::{Accessor, Document};

/// Resolves accessors of one document against its loaded buffers.
#[derive(Debug, Clone, Copy)]
pub struct SceneBinaryResolver<'a> {
    document: &'a Document,
    buffers: &'a [Vec<u8>],
}

impl<'a> SceneBinaryResolver<'a> {
    pub fn new(document: &'a Document, buffers: &'a [Vec<u8>]) -> Self {
        Self { document, buffers }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Validate accessor `index` and return a typed view over its bytes.
    pub fn resolve(&self, index: usize) -> Result<AccessorView<'a>, FormatError> {
        let accessor = self
            .document
            .accessors
            .get(index)
            .ok_or(FormatError::MissingReference {
                kind: "accessor",
                index,
            })?;

        let unsupported = |reason: &str| FormatError::UnsupportedComponentType {
            accessor: index,
            component_type: accessor.component_type,
            element_type: accessor.element_type.clone(),
            reason: reason.to_string(),
        };
        let malformed = |reason: String| FormatError::MalformedAccessor {
            accessor: index,
            reason,
        };

        let component_type = ComponentType::from_code(accessor.component_type)
            .ok_or_else(|| unsupported("unknown component type"))?;
        let element_type = ElementType::parse(&accessor.element_type)
            .ok_or_else(|| unsupported("unknown element type"))?;
        let element_size = element_type.element_size(component_type.size());

        let Some(view_index) = accessor.buffer_view else {
            return Ok(AccessorView {
                index,
                accessor,
                data: &[],
                component_type,
                element_type,
                stride: element_size,
                zeroed: true,
            });
        };

        let view = self
            .document
            .buffer_views
            .get(view_index)
            .ok_or(FormatError::MissingReference {
                kind: "bufferView",
                index: view_index,
            })?;
        let buffer = self
            .buffers
            .get(view.buffer)
            .ok_or(FormatError::MissingReference {
                kind: "buffer",
                index: view.buffer,
            })?;

        // The declared byteLength bounds views even when more bytes were loaded.
        let available = match self.document.buffers.get(view.buffer) {
            Some(declared) => declared.byte_length.min(buffer.len()),
            None => buffer.len(),
        };
        let view_end = view
            .byte_offset
            .checked_add(view.byte_length)
            .filter(|&end| end <= available)
            .ok_or_else(|| FormatError::MalformedBufferView {
                view: view_index,
                reason: format!(
                    "range {}+{} exceeds buffer {} of {} bytes",
                    view.byte_offset,
                    view.byte_length,
                    view.buffer,
                    available
                ),
            })?;

        let stride = match view.byte_stride {
            Some(stride) if !(4..=252).contains(&stride) || stride % 4 != 0 => {
                return Err(FormatError::MalformedBufferView {
                    view: view_index,
                    reason: format!("byteStride {stride} outside 4..=252 or not a multiple of 4"),
                });
            }
            Some(stride) if stride < element_size => {
                return Err(malformed(format!(
                    "byteStride {stride} is smaller than the {element_size}-byte element"
                )));
            }
            Some(stride) => stride,
            None => element_size,
        };

        if (view.byte_offset + accessor.byte_offset) % component_type.size() != 0 {
            return Err(malformed(format!(
                "offset {} is not aligned to {}",
                view.byte_offset + accessor.byte_offset,
                component_type
            )));
        }

        let required = match accessor.count {
            0 => Some(accessor.byte_offset),
            count => (count - 1)
                .checked_mul(stride)
                .and_then(|span| span.checked_add(element_size))
                .and_then(|span| span.checked_add(accessor.byte_offset)),
        };
        match required {
            Some(required) if required <= view.byte_length => {}
            _ => {
                return Err(malformed(format!(
                    "{} elements of {} bytes at offset {} exceed buffer view {} of {} bytes",
                    accessor.count,
                    element_size,
                    accessor.byte_offset,
                    view_index,
                    view.byte_length
                )));
            }
        }

        let start = view.byte_offset + accessor.byte_offset;
        Ok(AccessorView {
            index,
            accessor,
            data: &buffer[start..view_end],
            component_type,
            element_type,
            stride,
            zeroed: false,
        })
    }
}

/// A validated, read-only view over one accessor's elements.
#[derive(Debug, Clone, Copy)]
pub struct AccessorView<'a> {
    index: usize,
    accessor: &'a Accessor,
    /// Bytes from the first element to the end of the buffer view.
    data: &'a [u8],
    component_type: ComponentType,
    element_type: ElementType,
    stride: usize,
    zeroed: bool,
}

impl<'a> AccessorView<'a> {
    /// Accessor index in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.accessor.count
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn components(&self) -> usize {
        self.element_type.components()
    }

    /// Effective stride in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn normalized(&self) -> bool {
        self.accessor.normalized
    }

    pub fn min(&self) -> Option<&'a [f64]> {
        self.accessor.min.as_deref()
    }

    pub fn max(&self) -> Option<&'a [f64]> {
        self.accessor.max.as_deref()
    }

    fn out_of_bounds(&self, element: usize) -> FormatError {
        FormatError::MalformedAccessor {
            accessor: self.index,
            reason: format!(
                "element {element} out of bounds (count {})",
                self.accessor.count
            ),
        }
    }

    pub(crate) fn component_mismatch(&self, wanted: usize) -> FormatError {
        FormatError::UnsupportedComponentType {
            accessor: self.index,
            component_type: self.component_type.code(),
            element_type: self.accessor.element_type.clone(),
            reason: format!("{} components cannot be read as {wanted}", self.components()),
        }
    }

    /// Decode component `c` of element `i`. Both must be in range.
    fn component(&self, i: usize, c: usize) -> f64 {
        if self.zeroed {
            return 0.0;
        }
        let size = self.component_type.size();
        let at = i * self.stride + self.element_type.component_offset(c, size);
        let raw = self.component_type.decode(&self.data[at..at + size]);
        if self.accessor.normalized {
            self.component_type.normalize(raw)
        } else {
            raw
        }
    }

    /// Decode element `i` into `out`, returning the number of components written.
    ///
    /// Writes at most `out.len()` components.
    pub fn read_into(&self, i: usize, out: &mut [f32]) -> Result<usize, FormatError> {
        if i >= self.accessor.count {
            return Err(self.out_of_bounds(i));
        }
        let n = self.components().min(out.len());
        for (c, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.component(i, c) as f32;
        }
        Ok(n)
    }

    /// Decode element `i` as `N` floats. `N` must equal the element's component count.
    pub fn get<const N: usize>(&self, i: usize) -> Result<[f32; N], FormatError> {
        if N != self.components() {
            return Err(self.component_mismatch(N));
        }
        let mut out = [0.0; N];
        self.read_into(i, &mut out)?;
        Ok(out)
    }

    /// Iterate all elements as `N`-float vectors.
    pub fn vectors<const N: usize>(&self) -> Result<Vectors<'a, N>, FormatError> {
        if N != self.components() {
            return Err(self.component_mismatch(N));
        }
        Ok(Vectors {
            view: *self,
            next: 0,
        })
    }

    /// Iterate every component of every element.
    pub fn floats(&self) -> impl Iterator<Item = f32> + 'a {
        let view = *self;
        let components = view.components();
        (0..view.count() * components).map(move |k| view.component(k / components, k % components) as f32)
    }

    /// Iterate the accessor as an index list for a mesh of `vertex_count` vertices.
    ///
    /// Only the element type is checked here; each value is range-checked as
    /// it is decoded.
    pub fn indices(&self, vertex_count: usize) -> Result<Indices<'a>, FormatError> {
        if self.element_type != ElementType::Scalar || !self.component_type.is_unsigned_integer() {
            return Err(FormatError::UnsupportedComponentType {
                accessor: self.index,
                component_type: self.component_type.code(),
                element_type: self.accessor.element_type.clone(),
                reason: "indices must be unsigned integer SCALAR".into(),
            });
        }
        Ok(Indices {
            view: *self,
            next: 0,
            vertex_count,
        })
    }
}

/// Lazy iterator over accessor elements.
#[derive(Debug, Clone)]
pub struct Vectors<'a, const N: usize> {
    view: AccessorView<'a>,
    next: usize,
}

impl<const N: usize> Iterator for Vectors<'_, N> {
    type Item = [f32; N];

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.view.count() {
            return None;
        }
        let mut out = [0.0; N];
        for (c, slot) in out.iter_mut().enumerate() {
            *slot = self.view.component(self.next, c) as f32;
        }
        self.next += 1;
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.count() - self.next;
        (remaining, Some(remaining))
    }
}

impl<const N: usize> ExactSizeIterator for Vectors<'_, N> {}

/// Lazy iterator over index values.
#[derive(Debug, Clone)]
pub struct Indices<'a> {
    view: AccessorView<'a>,
    next: usize,
    vertex_count: usize,
}

impl Iterator for Indices<'_> {
    type Item = Result<u32, ConsistencyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.view.count() {
            return None;
        }
        let position = self.next;
        self.next += 1;
        let index = self.view.component(position, 0) as u32;
        if index as usize >= self.vertex_count {
            return Some(Err(ConsistencyError::IndexOutOfRange {
                accessor: Some(self.view.index),
                position,
                index,
                vertex_count: self.vertex_count,
            }));
        }
        Some(Ok(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.count() - self.next;
        (remaining, Some(remaining))
    }
}
