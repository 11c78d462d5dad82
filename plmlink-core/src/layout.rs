//! Frame layout tables
//!
//! A layout describes one frame type: its command byte, its total length on
//! the wire, whether it is a solicited reply to a host command or an
//! unsolicited report, and the named fields it carries. The codec only needs
//! the length; field definitions drive [`Message`](crate::Message) decoding.

use std::collections::HashMap;
use std::sync::Arc;

use plmlink_types::Address;

use crate::error::{Error, Result};
use crate::HEADER_SIZE;

/// Type of a single frame field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// One byte
    Byte,

    /// Three-byte bus address
    Address,
}

impl FieldType {
    /// Encoded size in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Address => 3,
        }
    }
}

/// Decoded field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Byte(u8),
    Address(Address),
}

/// Definition of one named field within a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name, unique within its layout
    pub name: &'static str,

    /// Byte offset from the start of the frame (offset 0 is the start marker)
    pub offset: usize,

    /// Field type
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: &'static str, offset: usize, field_type: FieldType) -> Self {
        Self {
            name,
            offset,
            field_type,
        }
    }
}

/// Layout of one frame type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    /// Command byte this layout applies to
    pub command: u8,

    /// Total frame length in bytes, including the two header bytes
    pub length: usize,

    /// True if this frame is a direct reply to a host command,
    /// false for unsolicited reports from the bus
    pub solicited: bool,

    /// Named fields, by wire offset
    pub fields: Vec<FieldDef>,
}

impl FrameLayout {
    pub fn new(command: u8, length: usize, solicited: bool, fields: Vec<FieldDef>) -> Self {
        Self {
            command,
            length,
            solicited,
            fields,
        }
    }

    /// Look up a field definition by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn validate(&self) -> Result<()> {
        if self.length < HEADER_SIZE {
            return Err(Error::InvalidLength(self.length));
        }

        for field in &self.fields {
            let end = field.offset + field.field_type.size();
            if field.offset < HEADER_SIZE || end > self.length {
                return Err(Error::FieldOutOfBounds {
                    field: field.name.to_string(),
                    offset: field.offset,
                    length: self.length,
                });
            }
        }

        Ok(())
    }
}

/// Table mapping command bytes to frame layouts
///
/// Supplied to the codec by whoever defines the concrete protocol; the core
/// never hardcodes a command set.
pub trait LayoutTable: Send + Sync {
    /// Layout registered for a command byte, if any
    fn layout_for(&self, command: u8) -> Option<Arc<FrameLayout>>;

    /// Total frame length for a command byte, if known
    fn frame_len(&self, command: u8) -> Option<usize> {
        self.layout_for(command).map(|l| l.length)
    }
}

/// In-memory layout table
#[derive(Debug, Default, Clone)]
pub struct LayoutRegistry {
    layouts: HashMap<u8, Arc<FrameLayout>>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame layout
    ///
    /// # Errors
    ///
    /// Returns an error if the command byte already has a layout, the length
    /// is shorter than the header, or a field falls outside the frame.
    pub fn register(&mut self, layout: FrameLayout) -> Result<()> {
        layout.validate()?;

        if self.layouts.contains_key(&layout.command) {
            return Err(Error::DuplicateLayout(layout.command));
        }

        self.layouts.insert(layout.command, Arc::new(layout));
        Ok(())
    }

    /// Number of registered layouts
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

impl LayoutTable for LayoutRegistry {
    fn layout_for(&self, command: u8) -> Option<Arc<FrameLayout>> {
        self.layouts.get(&command).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = LayoutRegistry::new();
        registry
            .register(FrameLayout::new(
                0x60,
                9,
                true,
                vec![FieldDef::new("address", 2, FieldType::Address)],
            ))
            .unwrap();

        assert_eq!(registry.frame_len(0x60), Some(9));
        assert_eq!(registry.frame_len(0x61), None);

        let layout = registry.layout_for(0x60).unwrap();
        assert_eq!(layout.field("address").unwrap().offset, 2);
        assert!(layout.field("missing").is_none());
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = LayoutRegistry::new();
        registry
            .register(FrameLayout::new(0x60, 9, true, vec![]))
            .unwrap();

        let result = registry.register(FrameLayout::new(0x60, 11, true, vec![]));
        assert!(matches!(result, Err(Error::DuplicateLayout(0x60))));
    }

    #[test]
    fn test_register_field_out_of_bounds() {
        let mut registry = LayoutRegistry::new();

        // Address field needs 3 bytes but only 2 remain
        let result = registry.register(FrameLayout::new(
            0x50,
            9,
            false,
            vec![FieldDef::new("from", 7, FieldType::Address)],
        ));
        assert!(matches!(result, Err(Error::FieldOutOfBounds { .. })));

        // Fields cannot overlap the header
        let result = registry.register(FrameLayout::new(
            0x50,
            9,
            false,
            vec![FieldDef::new("cmd", 1, FieldType::Byte)],
        ));
        assert!(matches!(result, Err(Error::FieldOutOfBounds { .. })));
    }

    #[test]
    fn test_register_invalid_length() {
        let mut registry = LayoutRegistry::new();
        let result = registry.register(FrameLayout::new(0x50, 1, false, vec![]));
        assert!(matches!(result, Err(Error::InvalidLength(1))));
    }
}
