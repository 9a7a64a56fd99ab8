//! Cross-model type transplantation.
//!
//! [`TypeCopier`] copies the closure of a type definition from a source model
//! into a destination model. Clones receive fresh IDs in the destination;
//! their internal references keep pointing at source IDs until
//! [`TypeCopier::finalize`] rewrites them through the map of copied IDs.

pub mod graph;

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::error::{ModelError, Result};
use crate::model::{
    Binary, CustomAndOriginalName, DefinitionReference, TypeDefinition, TypeDefinitionKey,
};

pub use graph::TypeGraph;

/// Copies type definitions, with everything they reference, between models.
///
/// A copier must be finalized exactly once. Dropping it unfinalized is a
/// programming error and panics.
pub struct TypeCopier<'a> {
    source: &'a Binary,
    destination: &'a mut Binary,

    /// Source ID -> destination ID, one entry per clone.
    already_copied: HashMap<u64, u64>,

    /// Destination keys created by this copier.
    new_types: BTreeSet<TypeDefinitionKey>,

    /// Built on first use, never invalidated.
    graph: Option<TypeGraph>,

    finalized: bool,
}

impl<'a> TypeCopier<'a> {
    pub fn new(source: &'a Binary, destination: &'a mut Binary) -> Self {
        Self {
            source,
            destination,
            already_copied: HashMap::new(),
            new_types: BTreeSet::new(),
            graph: None,
            finalized: false,
        }
    }

    fn ensure_graph(&mut self) -> &TypeGraph {
        let source = self.source;
        self.graph.get_or_insert_with(|| TypeGraph::build(source))
    }

    /// Copy `root` and its closure into the destination model.
    ///
    /// Definitions copied by an earlier call are not cloned again; copying an
    /// already copied root returns the existing destination reference.
    /// References inside the clones still use source IDs until
    /// [`TypeCopier::finalize`].
    pub fn copy_type_into(&mut self, root: &TypeDefinitionKey) -> Result<DefinitionReference> {
        if !self.source.contains(root) {
            return Err(ModelError::DefinitionNotFound(*root));
        }
        if let Some(&id) = self.already_copied.get(&root.id) {
            return Ok(DefinitionReference::new(TypeDefinitionKey::new(id, root.kind)));
        }

        let closure = self.ensure_graph().closure(root);

        let mut result = None;
        for (key, definition) in &self.source.type_definitions {
            if !closure.contains(key) || self.already_copied.contains_key(&key.id) {
                continue;
            }

            let mut clone = definition.clone();
            clone.id = 0;
            scrub_custom_names(&mut clone);

            let reference = self.destination.record_new_type(clone);
            let Some(new_key) = reference.key() else {
                unreachable!("record_new_type returns a set reference")
            };
            let previous = self.already_copied.insert(key.id, new_key.id);
            assert!(previous.is_none(), "source ID {} copied twice", key.id);
            self.new_types.insert(new_key);
            debug!(from = %key, to = %new_key, "copied type definition");

            if key == root {
                result = Some(reference);
            }
        }

        self.destination.initialize_references();

        match result {
            Some(reference) => Ok(reference),
            None => panic!("{} is missing from its own closure", root),
        }
    }

    /// Map of source IDs to destination IDs copied so far.
    pub fn copied(&self) -> &HashMap<u64, u64> {
        &self.already_copied
    }

    /// Destination keys created so far.
    pub fn new_types(&self) -> impl Iterator<Item = &TypeDefinitionKey> {
        self.new_types.iter()
    }

    /// Rewrite every reference inside the copied definitions to destination
    /// IDs, consuming the copier. Returns the source -> destination ID map.
    ///
    /// # Panics
    ///
    /// Panics if a copied definition references a source ID that was never
    /// copied.
    pub fn finalize(mut self) -> HashMap<u64, u64> {
        assert!(!self.finalized, "TypeCopier finalized twice");
        self.finalized = true;

        let copied = &self.already_copied;
        for key in &self.new_types {
            let Some(definition) = self.destination.get_mut(key) else {
                panic!("copied definition {} vanished from the destination", key)
            };
            definition.visit_references_mut(&mut |reference| {
                let Some(target) = reference.key() else {
                    return;
                };
                let Some(&id) = copied.get(&target.id) else {
                    panic!("{} references {} which was never copied", key, target)
                };
                reference.set(TypeDefinitionKey::new(id, target.kind));
            });
        }

        info!(copied = copied.len(), "type copy finalized");
        std::mem::take(&mut self.already_copied)
    }
}

impl Drop for TypeCopier<'_> {
    fn drop(&mut self) {
        if !self.finalized && !std::thread::panicking() {
            panic!("TypeCopier dropped without being finalized");
        }
    }
}

/// Move user-assigned names into the recovered-name slot.
///
/// Custom names are always cleared; they become the original name only where
/// no original name exists.
pub fn scrub_custom_names(definition: &mut TypeDefinition) {
    definition.visit_names_mut(&mut |element: &mut dyn CustomAndOriginalName| {
        let custom = std::mem::take(element.custom_name_mut());
        let original = element.original_name_mut();
        if original.is_empty() {
            *original = custom;
        }
    });
}

/// Copy several roots in one go and finalize.
///
/// Returns the destination references in the order of `roots`. The source
/// must validate; a malformed source is rejected before anything is copied.
/// On a missing root the copier is still finalized, so whatever was copied
/// before it is consistent.
pub fn copy_types(
    source: &Binary,
    destination: &mut Binary,
    roots: &[TypeDefinitionKey],
) -> Result<Vec<DefinitionReference>> {
    source.validate()?;
    let mut copier = TypeCopier::new(source, destination);
    let copied: Result<Vec<_>> = roots
        .iter()
        .map(|root| copier.copy_type_into(root))
        .collect();
    copier.finalize();
    copied
}
