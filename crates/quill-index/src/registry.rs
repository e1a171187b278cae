//! Blueprint registry.
//!
//! The registry owns every registered [`Blueprint`] together with the
//! schema derived from them:
//!
//! - the global, alphabetically sorted attribute list that fixes value slots
//! - the searchable query prefixes
//! - one [`AccessorTable`] per class
//! - the codec registry
//!
//! Setup replaces the whole derived state at once. Readers take a
//! [`RegistrySnapshot`], an immutable `Arc` that stays valid (and
//! consistent) while another thread registers new blueprints.
//!
//! # Value slots
//!
//! Slot 0 holds the class name. Every attribute gets `1 + rank` in the
//! sorted list of all attribute names across all blueprints. Registering a
//! blueprint that introduces an attribute sorting before existing ones
//! renumbers their slots; documents indexed earlier must be reindexed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use quill_core::{Error, INDEXED_CLASS, Result};

use crate::accessors::AccessorTable;
use crate::adapter::{Adapter, GenericAdapter};
use crate::blueprint::{Blueprint, Dependency};
use crate::codec::{CodecRegistry, TypeCodec, TypeTag};

#[derive(Debug, Clone)]
struct RegisteredClass {
    blueprint: Arc<Blueprint>,
    accessors: Arc<AccessorTable>,
}

/// Immutable view of all registered blueprints.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    classes: BTreeMap<String, RegisteredClass>,
    parents: BTreeMap<String, String>,
    attributes: Vec<String>,
    prefixes: BTreeSet<String>,
    codecs: CodecRegistry,
}

impl RegistrySnapshot {
    fn build(
        blueprints: BTreeMap<String, Arc<Blueprint>>,
        parents: BTreeMap<String, String>,
        codecs: CodecRegistry,
    ) -> Result<Self> {
        let attributes: Vec<String> = blueprints
            .values()
            .flat_map(|bp| bp.attribute_names())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut prefixes: BTreeSet<String> = blueprints
            .values()
            .flat_map(|bp| bp.searchable_prefixes())
            .collect();
        prefixes.insert(INDEXED_CLASS.to_string());

        let mut classes = BTreeMap::new();
        for (class, blueprint) in blueprints {
            let accessors = AccessorTable::build(&blueprint, &codecs, |name| {
                slot_in(&attributes, name)
            })?;
            classes.insert(
                class,
                RegisteredClass {
                    blueprint,
                    accessors: Arc::new(accessors),
                },
            );
        }

        Ok(Self {
            classes,
            parents,
            attributes,
            prefixes,
            codecs,
        })
    }

    fn blueprints(&self) -> BTreeMap<String, Arc<Blueprint>> {
        self.classes
            .iter()
            .map(|(class, registered)| (class.clone(), Arc::clone(&registered.blueprint)))
            .collect()
    }

    /// Walk from `class` up its declared ancestors to the first registered one.
    fn resolve(&self, class: &str) -> Result<&RegisteredClass> {
        let mut current = class;
        let mut visited = BTreeSet::new();
        loop {
            if let Some(registered) = self.classes.get(current) {
                return Ok(registered);
            }
            if !visited.insert(current) {
                break;
            }
            match self.parents.get(current) {
                Some(parent) => current = parent.as_str(),
                None => break,
            }
        }
        Err(Error::blueprint_not_found(class))
    }

    /// Blueprint of `class` or its nearest registered ancestor.
    pub fn blueprint_for(&self, class: &str) -> Result<Arc<Blueprint>> {
        self.resolve(class)
            .map(|registered| Arc::clone(&registered.blueprint))
    }

    /// Accessor table of `class` or its nearest registered ancestor.
    pub fn accessors_for(&self, class: &str) -> Result<Arc<AccessorTable>> {
        self.resolve(class)
            .map(|registered| Arc::clone(&registered.accessors))
    }

    /// Returns `true` if `class` resolves to a blueprint.
    pub fn is_registered(&self, class: &str) -> bool {
        self.resolve(class).is_ok()
    }

    /// Registered class names, sorted.
    pub fn classes(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    /// Value slot of an attribute. `indexed_class` is slot 0.
    pub fn value_slot_for(&self, attribute: &str) -> Result<u32> {
        if attribute == INDEXED_CLASS {
            return Ok(0);
        }
        slot_in(&self.attributes, attribute)
    }

    /// Type tag of the first blueprint declaring `attribute`.
    pub fn type_info_for(&self, attribute: &str) -> Option<TypeTag> {
        self.classes
            .values()
            .find_map(|registered| registered.blueprint.attribute_named(attribute))
            .map(|attr| attr.type_tag().clone())
    }

    /// All attribute names across blueprints, sorted.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Field names accepted as `field:term` query prefixes.
    pub fn searchable_prefixes(&self) -> &BTreeSet<String> {
        &self.prefixes
    }

    /// Dependencies triggered by a change of `changed` on an object of `class`.
    pub fn dependencies_for(&self, class: &str, changed: &[&str]) -> Vec<Dependency> {
        self.classes
            .values()
            .flat_map(|registered| registered.blueprint.dependencies())
            .filter(|dep| dep.class() == class && dep.applies_to(changed))
            .cloned()
            .collect()
    }

    /// Resolve a codec.
    pub fn codec_for(&self, tag: &TypeTag) -> Result<Arc<dyn TypeCodec>> {
        self.codecs.codec_for(tag)
    }
}

fn slot_in(attributes: &[String], name: &str) -> Result<u32> {
    attributes
        .binary_search_by(|probe| probe.as_str().cmp(name))
        .map(|rank| rank as u32 + 1)
        .map_err(|_| Error::UnknownAttribute {
            name: name.to_string(),
        })
}

/// Process-wide registry of blueprints.
pub struct BlueprintRegistry {
    state: RwLock<Arc<RegistrySnapshot>>,
    adapter: Arc<dyn Adapter>,
}

impl Default for BlueprintRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlueprintRegistry {
    /// Create an empty registry using the [`GenericAdapter`].
    pub fn new() -> Self {
        Self::with_adapter(Arc::new(GenericAdapter))
    }

    /// Create an empty registry with a specific adapter.
    pub fn with_adapter(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            state: RwLock::new(Arc::new(RegistrySnapshot::default())),
            adapter,
        }
    }

    /// The adapter blueprints are attached to.
    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    /// Current state. Later setups do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&state)
    }

    /// Register (or replace) the blueprint of `class`.
    ///
    /// `configure` receives an empty blueprint. The new schema is validated
    /// before it becomes visible; on error the registry is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::AmbiguousType`] if an attribute's type conflicts with
    ///   another class's declaration
    /// - [`Error::UnknownTypeTag`] if a custom type has no codec
    /// - any error returned by `configure` or by the adapter
    pub fn setup<F>(&self, class: &str, configure: F) -> Result<Arc<Blueprint>>
    where
        F: FnOnce(&mut Blueprint) -> Result<()>,
    {
        let mut blueprint = Blueprint::new(class);
        configure(&mut blueprint)?;
        let blueprint = Arc::new(blueprint);

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        check_types(&state, &blueprint)?;

        let mut blueprints = state.blueprints();
        blueprints.insert(class.to_string(), Arc::clone(&blueprint));
        let snapshot =
            RegistrySnapshot::build(blueprints, state.parents.clone(), state.codecs.clone())?;

        self.adapter.attach(class, &blueprint)?;
        *state = Arc::new(snapshot);

        log::debug!(
            "registered blueprint for '{class}' ({} attributes in schema)",
            state.attributes.len()
        );
        Ok(blueprint)
    }

    /// Declare `child` a subclass of `parent` for blueprint lookup.
    pub fn declare_subclass(&self, child: &str, parent: &str) -> Result<()> {
        if child == parent {
            return Err(Error::config(format!("'{child}' cannot be its own parent")));
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = RegistrySnapshot::clone(&state);
        snapshot
            .parents
            .insert(child.to_string(), parent.to_string());
        *state = Arc::new(snapshot);
        Ok(())
    }

    /// Register a codec for a custom type tag.
    ///
    /// Accessor tables are rebuilt so existing blueprints pick up the codec.
    pub fn register_codec(&self, name: &str, codec: Arc<dyn TypeCodec>) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut codecs = state.codecs.clone();
        codecs.register(name, codec);
        let snapshot = RegistrySnapshot::build(state.blueprints(), state.parents.clone(), codecs)?;
        *state = Arc::new(snapshot);
        log::debug!("registered codec for type '{name}'");
        Ok(())
    }

    /// Blueprint of `class` or its nearest registered ancestor.
    pub fn blueprint_for(&self, class: &str) -> Result<Arc<Blueprint>> {
        self.snapshot().blueprint_for(class)
    }

    /// Value slot of an attribute.
    pub fn value_slot_for(&self, attribute: &str) -> Result<u32> {
        self.snapshot().value_slot_for(attribute)
    }

    /// Type tag of the first blueprint declaring `attribute`.
    pub fn type_info_for(&self, attribute: &str) -> Option<TypeTag> {
        self.snapshot().type_info_for(attribute)
    }

    /// All attribute names across blueprints, sorted.
    pub fn attributes(&self) -> Vec<String> {
        self.snapshot().attributes().to_vec()
    }

    /// Field names accepted as query prefixes.
    pub fn searchable_prefixes(&self) -> BTreeSet<String> {
        self.snapshot().searchable_prefixes().clone()
    }

    /// Dependencies triggered by a change on an object of `class`.
    pub fn dependencies_for(&self, class: &str, changed: &[&str]) -> Vec<Dependency> {
        self.snapshot().dependencies_for(class, changed)
    }
}

impl fmt::Debug for BlueprintRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("BlueprintRegistry")
            .field("classes", &snapshot.classes())
            .field("attributes", &snapshot.attributes())
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

/// Reject attributes whose type differs from another class's declaration.
fn check_types(state: &RegistrySnapshot, blueprint: &Blueprint) -> Result<()> {
    for attribute in blueprint.attribute_list() {
        for (class, registered) in &state.classes {
            if class == blueprint.class() {
                continue;
            }
            if let Some(existing) = registered.blueprint.attribute_named(attribute.name())
                && existing.type_tag() != attribute.type_tag()
            {
                return Err(Error::AmbiguousType {
                    attribute: attribute.name().to_string(),
                    existing: existing.type_tag().to_string(),
                    declared: attribute.type_tag().to_string(),
                });
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
