//! Typed read access to stored documents.
//!
//! An [`AccessorTable`] is derived from a blueprint when it is registered.
//! For each attribute it knows the value slot and the codec, so a search hit
//! can answer `hit.get("born_on")` with a decoded [`Value`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use quill_core::{Error, INDEXED_CLASS, Result, Value};

use crate::blueprint::Blueprint;
use crate::codec::{CodecRegistry, TypeCodec, TypeTag};
use crate::document::Document;

/// Slot and codec of one attribute.
#[derive(Clone)]
pub struct Accessor {
    slot: u32,
    type_tag: TypeTag,
    codec: Arc<dyn TypeCodec>,
}

impl Accessor {
    /// Value slot the attribute is stored in.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Declared type of the attribute.
    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    /// Decode the attribute from `doc`.
    ///
    /// An empty slot is null for every type, `string` included: the codec
    /// only sees non-empty slots, so an empty string stored in a `string`
    /// attribute reads back as [`Value::Null`].
    pub fn read(&self, doc: &Document) -> Result<Value> {
        match doc.get_value(self.slot) {
            "" => Ok(Value::Null),
            encoded => self.codec.decode(encoded),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("slot", &self.slot)
            .field("type_tag", &self.type_tag)
            .finish()
    }
}

/// Attribute accessors of one class.
#[derive(Debug, Clone)]
pub struct AccessorTable {
    class: String,
    accessors: BTreeMap<String, Accessor>,
}

impl AccessorTable {
    /// Build the table for `blueprint`.
    ///
    /// `slot_of` maps attribute names to their global value slot.
    pub(crate) fn build<F>(blueprint: &Blueprint, codecs: &CodecRegistry, slot_of: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<u32>,
    {
        let mut accessors = BTreeMap::new();
        for attribute in blueprint.attribute_list() {
            let accessor = Accessor {
                slot: slot_of(attribute.name())?,
                type_tag: attribute.type_tag().clone(),
                codec: codecs.codec_for(attribute.type_tag())?,
            };
            accessors.insert(attribute.name().to_string(), accessor);
        }
        Ok(Self {
            class: blueprint.class().to_string(),
            accessors,
        })
    }

    /// Class whose blueprint produced the table.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Look up an accessor.
    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.accessors.get(name)
    }

    /// Attribute names, sorted.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.accessors.keys().map(String::as_str)
    }

    /// Class name stored in slot 0 of `doc`.
    pub fn indexed_class<'d>(&self, doc: &'d Document) -> &'d str {
        doc.get_value(0)
    }

    /// Decode attribute `name` from `doc`. `indexed_class` reads slot 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttribute`] if the class has no such attribute,
    /// or the codec's error if the stored value is malformed.
    pub fn get(&self, doc: &Document, name: &str) -> Result<Value> {
        if name == INDEXED_CLASS {
            return Ok(Value::from(self.indexed_class(doc)));
        }
        self.accessors
            .get(name)
            .ok_or_else(|| Error::UnknownAttribute {
                name: name.to_string(),
            })?
            .read(doc)
    }

    /// Decode every attribute of `doc`.
    pub fn read_all(&self, doc: &Document) -> Result<BTreeMap<String, Value>> {
        self.accessors
            .iter()
            .map(|(name, accessor)| Ok((name.clone(), accessor.read(doc)?)))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
