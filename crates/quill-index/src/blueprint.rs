//! Per-class index configuration.
//!
//! A [`Blueprint`] declares, for one class:
//!
//! - attributes: stored in value slots, typed, and searchable by default
//! - indexed methods: searchable text that is not stored
//! - an optional ignore predicate
//! - dependencies: other objects to reindex when fields of this class change
//!
//! Blueprints are built inside [`BlueprintRegistry::setup`](crate::BlueprintRegistry::setup):
//!
//! ```rust
//! use quill_index::{AttributeOptions, BlueprintRegistry, TypeTag};
//!
//! let registry = BlueprintRegistry::new();
//! registry
//!     .setup("Person", |bp| {
//!         bp.attribute("name", AttributeOptions::default().weight(3))?
//!             .attribute("born_on", AttributeOptions::typed(TypeTag::Date))?
//!             .index("notes", Default::default());
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use quill_core::{Error, INDEXED_CLASS, Result, Value};

use crate::adapter::Indexable;
use crate::codec::TypeTag;

/// Names that collide with document or hit accessors.
pub const RESERVED_NAMES: &[&str] = &[
    INDEXED_CLASS,
    "score",
    "percent",
    "data",
    "document",
    "values",
    "terms",
];

/// Computes a value from an object instead of reading a field.
pub type ValueFn = Arc<dyn Fn(&dyn Indexable) -> Value + Send + Sync>;

/// Decides whether an object stays out of the index.
pub type IgnorePredicate = Arc<dyn Fn(&dyn Indexable) -> bool + Send + Sync>;

/// Finds the objects that depend on a changed object.
pub type DependentsFn = Arc<dyn Fn(&dyn Indexable) -> Vec<Arc<dyn Indexable>> + Send + Sync>;

/// Options for [`Blueprint::attribute`].
#[derive(Clone)]
pub struct AttributeOptions {
    weight: u32,
    index: bool,
    type_tag: TypeTag,
    derive: Option<ValueFn>,
}

impl Default for AttributeOptions {
    fn default() -> Self {
        Self {
            weight: 1,
            index: true,
            type_tag: TypeTag::Generic,
            derive: None,
        }
    }
}

impl AttributeOptions {
    /// Default options with a type tag.
    pub fn typed(type_tag: impl Into<TypeTag>) -> Self {
        Self::default().as_type(type_tag)
    }

    /// Term weight when the attribute is also indexed.
    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Whether the attribute produces searchable terms.
    pub fn index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    /// Declare the attribute's type.
    pub fn as_type(mut self, type_tag: impl Into<TypeTag>) -> Self {
        self.type_tag = type_tag.into();
        self
    }

    /// Compute the value instead of reading the field of the same name.
    pub fn derive<F>(mut self, derive: F) -> Self
    where
        F: Fn(&dyn Indexable) -> Value + Send + Sync + 'static,
    {
        self.derive = Some(Arc::new(derive));
        self
    }
}

impl fmt::Debug for AttributeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeOptions")
            .field("weight", &self.weight)
            .field("index", &self.index)
            .field("type_tag", &self.type_tag)
            .field("derived", &self.derive.is_some())
            .finish()
    }
}

/// Options for [`Blueprint::index`].
#[derive(Clone)]
pub struct IndexOptions {
    weight: u32,
    derive: Option<ValueFn>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            weight: 1,
            derive: None,
        }
    }
}

impl IndexOptions {
    /// Term weight.
    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Compute the indexed text instead of reading a field.
    pub fn derive<F>(mut self, derive: F) -> Self
    where
        F: Fn(&dyn Indexable) -> Value + Send + Sync + 'static,
    {
        self.derive = Some(Arc::new(derive));
        self
    }
}

impl fmt::Debug for IndexOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexOptions")
            .field("weight", &self.weight)
            .field("derived", &self.derive.is_some())
            .finish()
    }
}

fn read_value(object: &dyn Indexable, name: &str, derive: Option<&ValueFn>) -> Result<Value> {
    match derive {
        Some(derive) => Ok(derive(object)),
        None => object.field(name).ok_or_else(|| {
            Error::value(format!(
                "{} has no field '{name}'",
                object.class_name()
            ))
        }),
    }
}

/// A stored attribute.
#[derive(Clone)]
pub struct Attribute {
    name: String,
    type_tag: TypeTag,
    weight: u32,
    index: bool,
    derive: Option<ValueFn>,
}

impl Attribute {
    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    /// Term weight.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Whether the attribute is also an indexed method.
    pub fn is_indexed(&self) -> bool {
        self.index
    }

    /// Read the attribute's value from `object`.
    pub fn value_of(&self, object: &dyn Indexable) -> Result<Value> {
        read_value(object, &self.name, self.derive.as_ref())
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type_tag", &self.type_tag)
            .field("weight", &self.weight)
            .field("index", &self.index)
            .finish()
    }
}

/// Searchable text that is not stored.
#[derive(Clone)]
pub struct IndexedMethod {
    name: String,
    weight: u32,
    derive: Option<ValueFn>,
}

impl IndexedMethod {
    /// Method name, also the field prefix source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Term weight.
    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Read the method's value from `object`.
    pub fn value_of(&self, object: &dyn Indexable) -> Result<Value> {
        read_value(object, &self.name, self.derive.as_ref())
    }
}

impl fmt::Debug for IndexedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedMethod")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish()
    }
}

/// A reindexing rule: when `when_changed` fields of an object change, the
/// objects returned by the rule must be reindexed too.
#[derive(Clone)]
pub struct Dependency {
    class: String,
    when_changed: Vec<String>,
    dependents: DependentsFn,
}

impl Dependency {
    /// The class whose changes trigger the rule.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Fields that trigger the rule.
    pub fn when_changed(&self) -> &[String] {
        &self.when_changed
    }

    /// Returns `true` if any of `changed` triggers the rule.
    pub fn applies_to(&self, changed: &[&str]) -> bool {
        self.when_changed
            .iter()
            .any(|field| changed.contains(&field.as_str()))
    }

    /// The objects to reindex after `object` changed.
    pub fn dependents(&self, object: &dyn Indexable) -> Vec<Arc<dyn Indexable>> {
        (self.dependents)(object)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("class", &self.class)
            .field("when_changed", &self.when_changed)
            .finish()
    }
}

/// Index configuration of one class.
#[derive(Clone)]
pub struct Blueprint {
    class: String,
    attributes: BTreeMap<String, Attribute>,
    indexed_methods: BTreeMap<String, IndexedMethod>,
    ignore_if: Option<IgnorePredicate>,
    dependencies: Vec<Dependency>,
    searchable_prefixes: Option<Vec<String>>,
}

impl Blueprint {
    /// Create an empty blueprint for `class`.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            attributes: BTreeMap::new(),
            indexed_methods: BTreeMap::new(),
            ignore_if: None,
            dependencies: Vec::new(),
            searchable_prefixes: None,
        }
    }

    /// The configured class.
    pub fn class(&self) -> &str {
        &self.class
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    /// Declare a stored attribute.
    ///
    /// Redeclaring an attribute replaces the earlier declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedName`] for names in [`RESERVED_NAMES`].
    pub fn attribute(&mut self, name: &str, options: AttributeOptions) -> Result<&mut Self> {
        if RESERVED_NAMES.contains(&name) {
            return Err(Error::ReservedName {
                name: name.to_string(),
            });
        }

        if options.index {
            self.indexed_methods.insert(
                name.to_string(),
                IndexedMethod {
                    name: name.to_string(),
                    weight: options.weight,
                    derive: options.derive.clone(),
                },
            );
        } else {
            self.indexed_methods.remove(name);
        }

        self.attributes.insert(
            name.to_string(),
            Attribute {
                name: name.to_string(),
                type_tag: options.type_tag,
                weight: options.weight,
                index: options.index,
                derive: options.derive,
            },
        );
        Ok(self)
    }

    /// Declare several generic attributes with default options.
    pub fn attributes(&mut self, names: &[&str]) -> Result<&mut Self> {
        for name in names {
            self.attribute(name, AttributeOptions::default())?;
        }
        Ok(self)
    }

    /// Declare searchable text that is not stored.
    pub fn index(&mut self, name: &str, options: IndexOptions) -> &mut Self {
        self.indexed_methods.insert(
            name.to_string(),
            IndexedMethod {
                name: name.to_string(),
                weight: options.weight,
                derive: options.derive,
            },
        );
        self
    }

    /// Declare several indexed methods with default options.
    pub fn index_all(&mut self, names: &[&str]) -> &mut Self {
        for name in names {
            self.index(name, IndexOptions::default());
        }
        self
    }

    /// Keep objects for which `predicate` holds out of the index.
    pub fn ignore_if<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&dyn Indexable) -> bool + Send + Sync + 'static,
    {
        self.ignore_if = Some(Arc::new(predicate));
        self
    }

    /// Reindex the objects returned by `dependents` whenever one of
    /// `when_changed` changes on an object of `class`.
    pub fn dependency<F>(&mut self, class: &str, when_changed: &[&str], dependents: F) -> &mut Self
    where
        F: Fn(&dyn Indexable) -> Vec<Arc<dyn Indexable>> + Send + Sync + 'static,
    {
        self.dependencies.push(Dependency {
            class: class.to_string(),
            when_changed: when_changed.iter().map(|s| s.to_string()).collect(),
            dependents: Arc::new(dependents),
        });
        self
    }

    /// Restrict the field names usable as `field:term` in queries.
    ///
    /// Without an override the indexed methods are searchable, which includes
    /// every attribute not declared with `index(false)`.
    pub fn with_searchable_prefixes(&mut self, names: &[&str]) -> &mut Self {
        self.searchable_prefixes = Some(names.iter().map(|s| s.to_string()).collect());
        self
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// Look up an attribute declaration.
    pub fn attribute_named(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Attributes in name order.
    pub fn attribute_list(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Attribute names, sorted.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    /// Indexed methods in name order.
    pub fn indexed_methods(&self) -> impl Iterator<Item = &IndexedMethod> {
        self.indexed_methods.values()
    }

    /// Indexed method names, sorted.
    pub fn indexed_method_names(&self) -> Vec<&str> {
        self.indexed_methods.keys().map(String::as_str).collect()
    }

    /// Attribute name to type tag.
    pub fn type_map(&self) -> BTreeMap<&str, &TypeTag> {
        self.attributes
            .iter()
            .map(|(name, attr)| (name.as_str(), &attr.type_tag))
            .collect()
    }

    /// Field names usable as query prefixes.
    pub fn searchable_prefixes(&self) -> Vec<String> {
        match &self.searchable_prefixes {
            Some(names) => names.clone(),
            None => self.indexed_methods.keys().cloned().collect(),
        }
    }

    /// Returns `true` if `object` must stay out of the index.
    pub fn should_ignore(&self, object: &dyn Indexable) -> bool {
        self.ignore_if
            .as_ref()
            .is_some_and(|predicate| predicate(object))
    }

    /// Declared dependencies.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("class", &self.class)
            .field("attributes", &self.attributes.values().collect::<Vec<_>>())
            .field("indexed_methods", &self.indexed_method_names())
            .field("ignore_if", &self.ignore_if.is_some())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
