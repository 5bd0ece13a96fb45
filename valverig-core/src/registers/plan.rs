//! Register read planning
//!
//! Selected fields are sorted by register offset and swept once. A field
//! that starts exactly where the open read ends extends it; anything else
//! opens a new read. The result is one read per maximal run of
//! byte-adjacent fields, so no read touches an unselected register and no
//! two reads could have been merged.

use core::fmt;

use heapless::Vec;

use super::field::{Field, FieldCatalog, FieldSpec, MAX_FIELDS};
use super::reading::Reading;

/// Upper bound on the number of reads a plan can contain
pub const MAX_READS: usize = MAX_FIELDS;

/// Longest burst read the drivers will issue
pub const MAX_READ_LEN: usize = 32;

/// Errors from building or applying a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanError {
    /// No fields were selected
    Empty,
    /// A field has zero width
    ZeroLength(Field),
    /// Two selected fields share register bytes
    Overlap(Field, Field),
    /// A merged read is longer than [`MAX_READ_LEN`]
    ReadTooLong { start: u8, len: usize },
    /// A field ends past the last register
    OutOfRange(Field),
    /// Fewer bytes were supplied than the read covers
    ShortBuffer { expected: usize, actual: usize },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Empty => write!(f, "no fields selected"),
            PlanError::ZeroLength(field) => write!(f, "field {} has zero length", field.name()),
            PlanError::Overlap(a, b) => {
                write!(f, "fields {} and {} overlap", a.name(), b.name())
            }
            PlanError::ReadTooLong { start, len } => {
                write!(f, "read at 0x{:02X} spans {} bytes (max {})", start, len, MAX_READ_LEN)
            }
            PlanError::OutOfRange(field) => {
                write!(f, "field {} extends past register 0xFF", field.name())
            }
            PlanError::ShortBuffer { expected, actual } => {
                write!(f, "expected {} bytes, got {}", expected, actual)
            }
        }
    }
}

/// One contiguous bus read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    /// First register address
    pub start: u8,
    /// Number of bytes to read
    pub len: u8,
    fields: Vec<Field, MAX_FIELDS>,
}

impl Read {
    /// Fields covered by this read, in register order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// One past the last register read
    pub fn end(&self) -> u16 {
        self.start as u16 + self.len as u16
    }
}

/// Minimal set of contiguous reads covering a field selection
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterPlan {
    catalog: FieldCatalog,
    reads: Vec<Read, MAX_READS>,
}

impl RegisterPlan {
    /// Build a plan for `selected` fields of `catalog`
    ///
    /// Duplicates in `selected` are ignored. Overlapping fields are an
    /// error rather than being silently merged.
    pub fn build(catalog: FieldCatalog, selected: &[Field]) -> Result<Self, PlanError> {
        let mut fields: Vec<Field, MAX_FIELDS> = Vec::new();
        for &field in selected {
            if !fields.contains(&field) {
                // At most MAX_FIELDS distinct fields exist
                let _ = fields.push(field);
            }
        }
        if fields.is_empty() {
            return Err(PlanError::Empty);
        }

        fields.sort_unstable_by_key(|f| (catalog.spec(*f).offset, f.index()));

        let mut reads: Vec<Read, MAX_READS> = Vec::new();
        let mut last: Option<Field> = None;

        for field in fields {
            let spec = catalog.spec(field);
            if spec.len == 0 {
                return Err(PlanError::ZeroLength(field));
            }
            if spec.end() > 0x100 {
                return Err(PlanError::OutOfRange(field));
            }

            let open_end = reads.last().map(Read::end);
            match (open_end, last) {
                (Some(end), Some(prev)) if (spec.offset as u16) < end => {
                    return Err(PlanError::Overlap(prev, field));
                }
                (Some(end), _) if spec.offset as u16 == end => {
                    if let Some(open) = reads.last_mut() {
                        let len = open.len as usize + spec.len as usize;
                        if len > MAX_READ_LEN {
                            return Err(PlanError::ReadTooLong {
                                start: open.start,
                                len,
                            });
                        }
                        open.len = len as u8;
                        let _ = open.fields.push(field);
                    }
                }
                _ => {
                    if spec.len as usize > MAX_READ_LEN {
                        return Err(PlanError::ReadTooLong {
                            start: spec.offset,
                            len: spec.len as usize,
                        });
                    }
                    let mut covered = Vec::new();
                    let _ = covered.push(field);
                    let _ = reads.push(Read {
                        start: spec.offset,
                        len: spec.len,
                        fields: covered,
                    });
                }
            }
            last = Some(field);
        }

        Ok(Self { catalog, reads })
    }

    /// Reads in ascending register order
    pub fn reads(&self) -> &[Read] {
        &self.reads
    }

    /// Number of bus transactions per sample
    pub fn transaction_count(&self) -> usize {
        self.reads.len()
    }

    /// Catalog entry for a field
    pub fn spec(&self, field: Field) -> &FieldSpec {
        self.catalog.spec(field)
    }

    /// Whether the plan samples `field`
    pub fn contains(&self, field: Field) -> bool {
        self.reads.iter().any(|r| r.fields.contains(&field))
    }

    /// Every planned field in register order
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.reads.iter().flat_map(|r| r.fields.iter().copied())
    }

    /// Read index and byte offset within that read for a field
    pub fn locate(&self, field: Field) -> Option<(usize, usize)> {
        let spec = self.catalog.spec(field);
        self.reads
            .iter()
            .position(|r| r.fields.contains(&field))
            .map(|i| (i, (spec.offset - self.reads[i].start) as usize))
    }

    /// Decode the bytes returned for `read` into `reading`
    pub fn decode(&self, read: &Read, bytes: &[u8], reading: &mut Reading) -> Result<(), PlanError> {
        let expected = read.len as usize;
        if bytes.len() < expected {
            return Err(PlanError::ShortBuffer {
                expected,
                actual: bytes.len(),
            });
        }

        for &field in read.fields() {
            let spec = self.catalog.spec(field);
            let at = (spec.offset - read.start) as usize;
            reading.set(field, spec.decode(&bytes[at..at + spec.len as usize]));
        }
        Ok(())
    }
}
