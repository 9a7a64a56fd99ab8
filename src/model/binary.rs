//! The model document: every type definition and function of one binary.
//!
//! Definitions are stored in a map ordered by `(ID, Kind)`. References are
//! plain keys resolved through [`Binary::resolve`], so the model never holds
//! pointers into itself and can be cloned, diffed and serialized freely.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

use crate::abi::Abi;
use crate::error::{ModelError, Result};
use crate::model::definition::{DefinitionData, TypeDefinition};
use crate::model::key::{DefinitionReference, TypeDefinitionKey, TypeDefinitionKind};
use crate::model::register::{Architecture, Register};
use crate::model::types::Type;

/// A function of the binary whose prototype is a type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// Entry point address
    pub entry: u64,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub original_name: String,
    /// Reference to a `CabiFunction` or `RawFunction` definition
    #[serde(default)]
    pub prototype: DefinitionReference,
}

impl Function {
    pub fn new(entry: u64, prototype: DefinitionReference) -> Self {
        Self {
            entry,
            custom_name: String::new(),
            original_name: String::new(),
            prototype,
        }
    }
}

/// The model of one binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    pub architecture: Architecture,
    /// ABI used when a pass is not told which one to target
    #[serde(default)]
    pub default_abi: Option<Abi>,
    #[serde(with = "definitions_as_seq", default)]
    pub type_definitions: BTreeMap<TypeDefinitionKey, TypeDefinition>,
    #[serde(default)]
    pub functions: Vec<Function>,
    /// Lowest ID never handed out; IDs of erased definitions are not reused.
    #[serde(skip)]
    next_type_id: u64,
}

impl Default for Binary {
    fn default() -> Self {
        Self::new(Architecture::X86_64)
    }
}

impl Binary {
    /// Create an empty model.
    pub fn new(architecture: Architecture) -> Self {
        Self {
            architecture,
            default_abi: None,
            type_definitions: BTreeMap::new(),
            functions: Vec::new(),
            next_type_id: 1,
        }
    }

    /// The ABI passes fall back to: the explicit default, else the
    /// architecture's.
    pub fn default_abi(&self) -> Abi {
        self.default_abi
            .unwrap_or_else(|| Abi::default_for(self.architecture))
    }

    fn fresh_id(&self) -> u64 {
        let after_last = self
            .type_definitions
            .keys()
            .next_back()
            .map_or(1, |key| key.id.saturating_add(1));
        self.next_type_id.max(after_last).max(1)
    }

    /// Insert a definition and return a reference to it.
    ///
    /// A definition with ID 0 is assigned a fresh ID; any other ID is kept.
    ///
    /// # Panics
    ///
    /// Panics if the resulting key is already present.
    pub fn record_new_type(&mut self, mut definition: TypeDefinition) -> DefinitionReference {
        if definition.id == 0 {
            definition.id = self.fresh_id();
        }
        let key = definition.key();
        assert!(
            !self.type_definitions.contains_key(&key),
            "type definition {} recorded twice",
            key
        );
        self.next_type_id = self.next_type_id.max(key.id.saturating_add(1));
        self.type_definitions.insert(key, definition);
        DefinitionReference::new(key)
    }

    /// Refresh state derived from the definition collection.
    ///
    /// Must be called after deserialization and after bulk insertions or
    /// erasures, before further key-based lookups rely on ID allocation.
    pub fn initialize_references(&mut self) {
        let after_last = self
            .type_definitions
            .keys()
            .map(|key| key.id.saturating_add(1))
            .max()
            .unwrap_or(1);
        self.next_type_id = self.next_type_id.max(after_last).max(1);
    }

    pub fn get(&self, key: &TypeDefinitionKey) -> Option<&TypeDefinition> {
        self.type_definitions.get(key)
    }

    pub fn get_mut(&mut self, key: &TypeDefinitionKey) -> Option<&mut TypeDefinition> {
        self.type_definitions.get_mut(key)
    }

    pub fn contains(&self, key: &TypeDefinitionKey) -> bool {
        self.type_definitions.contains_key(key)
    }

    /// Resolve a reference against this model.
    pub fn resolve(&self, reference: &DefinitionReference) -> Option<&TypeDefinition> {
        reference.key().and_then(|key| self.get(&key))
    }

    /// Remove a definition. References to it are left untouched.
    pub fn erase_type(&mut self, key: &TypeDefinitionKey) -> Option<TypeDefinition> {
        self.type_definitions.remove(key)
    }

    /// Keys of every definition of `kind`, in model order.
    pub fn keys_of_kind(&self, kind: TypeDefinitionKind) -> Vec<TypeDefinitionKey> {
        self.type_definitions
            .keys()
            .filter(|key| key.kind == kind)
            .copied()
            .collect()
    }

    /// Call `visitor` on every reference anywhere in the model.
    pub fn visit_references_mut(&mut self, visitor: &mut dyn FnMut(&mut DefinitionReference)) {
        for definition in self.type_definitions.values_mut() {
            definition.visit_references_mut(visitor);
        }
        for function in &mut self.functions {
            visitor(&mut function.prototype);
        }
    }

    pub fn visit_references(&self, visitor: &mut dyn FnMut(&DefinitionReference)) {
        for definition in self.type_definitions.values() {
            definition.visit_references(visitor);
        }
        for function in &self.functions {
            visitor(&function.prototype);
        }
    }

    /// Check the model is well formed. Never mutates.
    pub fn verify(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "model verification failed");
                false
            }
        }
    }

    /// Check the model is well formed, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for (key, definition) in &self.type_definitions {
            if *key != definition.key() || key.id == 0 || key.id == u64::MAX {
                return Err(ModelError::InvalidId(*key));
            }
            if !ids.insert(key.id) {
                return Err(ModelError::DuplicateId(key.id));
            }

            let mut dangling = None;
            definition.visit_references(&mut |reference| {
                if let Some(target) = reference.key() {
                    if dangling.is_none() && !self.contains(&target) {
                        dangling = Some(target);
                    }
                }
            });
            if let Some(to) = dangling {
                return Err(ModelError::DanglingReference {
                    from: key.to_string(),
                    to,
                });
            }

            self.validate_definition(definition)?;
        }

        for function in &self.functions {
            if let Some(target) = function.prototype.key() {
                if !self.contains(&target) {
                    return Err(ModelError::DanglingReference {
                        from: format!("function at {:#x}", function.entry),
                        to: target,
                    });
                }
                if !target.kind.is_function() {
                    return Err(ModelError::InvalidDefinition {
                        key: target,
                        reason: format!(
                            "used as prototype of function at {:#x}",
                            function.entry
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_definition(&self, definition: &TypeDefinition) -> Result<()> {
        let key = definition.key();
        let invalid = |reason: String| ModelError::InvalidDefinition { key, reason };

        match &definition.data {
            DefinitionData::Struct(s) => {
                let mut previous: Option<u64> = None;
                for field in &s.fields {
                    if field.field_type.is_void() {
                        return Err(invalid(format!("void field at offset {}", field.offset)));
                    }
                    if previous.is_some_and(|p| field.offset <= p) {
                        return Err(invalid(format!(
                            "field offset {} is not increasing",
                            field.offset
                        )));
                    }
                    if let Some(size) = field.field_type.size(self) {
                        if field.offset.checked_add(size).map_or(true, |end| end > s.size) {
                            return Err(invalid(format!(
                                "field at offset {} overflows struct size {}",
                                field.offset, s.size
                            )));
                        }
                    }
                    previous = Some(field.offset);
                }
            }
            DefinitionData::Union(u) => {
                if u.fields.iter().any(|f| f.field_type.is_void()) {
                    return Err(invalid("void union field".to_string()));
                }
            }
            DefinitionData::Enum(e) => {
                let integer = matches!(
                    e.underlying_type,
                    Type::Primitive { kind, .. } if kind.is_integer_like()
                );
                if !integer {
                    return Err(invalid("underlying type is not an integer".to_string()));
                }
                let mut names = HashSet::new();
                let mut values = HashSet::new();
                for entry in &e.entries {
                    if !values.insert(entry.value) {
                        return Err(invalid(format!("duplicate enum value {}", entry.value)));
                    }
                    // Recovered names may collide; only user-assigned ones must not.
                    let name = &entry.custom_name;
                    if !name.is_empty() && !names.insert(name) {
                        return Err(invalid(format!("duplicate enum entry {}", name)));
                    }
                }
            }
            DefinitionData::Typedef(_) => {}
            DefinitionData::CabiFunction(f) => {
                if f.abi.architecture() != self.architecture {
                    return Err(ModelError::ArchitectureMismatch(format!(
                        "{} uses {} in a {} model",
                        key, f.abi, self.architecture
                    )));
                }
                if f.arguments.iter().any(|a| a.argument_type.is_void()) {
                    return Err(invalid("void argument".to_string()));
                }
            }
            DefinitionData::RawFunction(f) => {
                let foreign = f
                    .arguments
                    .iter()
                    .chain(f.return_values.iter())
                    .map(|r| r.location)
                    .chain(f.preserved_registers.iter().copied())
                    .find(|r: &Register| r.architecture() != self.architecture);
                if let Some(foreign) = foreign {
                    return Err(ModelError::ArchitectureMismatch(format!(
                        "{} uses register {} in a {} model",
                        key, foreign, self.architecture
                    )));
                }
                let mut seen = HashSet::new();
                if let Some(duplicate) = f.arguments.iter().find(|a| !seen.insert(a.location)) {
                    return Err(invalid(format!(
                        "register {} used by two arguments",
                        duplicate.location
                    )));
                }
                if f
                    .arguments
                    .iter()
                    .chain(f.return_values.iter())
                    .any(|r| r.register_type.is_void())
                {
                    return Err(invalid("void register value".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Parse a model from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut model: Binary = serde_json::from_str(json)?;
        model.initialize_references();
        Ok(model)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a model from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut model: Binary = serde_json::from_reader(reader)?;
        model.initialize_references();
        Ok(model)
    }

    /// Save the model as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Definitions serialize as a list; keys are derived from each definition.
mod definitions_as_seq {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    use crate::model::definition::TypeDefinition;
    use crate::model::key::TypeDefinitionKey;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<TypeDefinitionKey, TypeDefinition>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<TypeDefinitionKey, TypeDefinition>, D::Error> {
        let definitions = Vec::<TypeDefinition>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for definition in definitions {
            let key = definition.key();
            if map.insert(key, definition).is_some() {
                return Err(serde::de::Error::custom(format!(
                    "duplicate type definition {}",
                    key
                )));
            }
        }
        Ok(map)
    }
}
