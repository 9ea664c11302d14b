//! Configuration schemas exported to plugins.
//!
//! Plugins describe their configurable slots through the host's schema
//! builder instead of bundling their own, so every schema shares one type.

use serde::{Deserialize, Serialize};

/// Type of a configuration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotType {
    /// Free text.
    String,
    /// Integer or floating point number.
    Number,
    /// Boolean flag.
    Boolean,
    /// List of strings.
    StringArray,
    /// Anything else, kept as raw TOML.
    Frozen,
}

/// A single configuration slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSlot {
    /// Slot name.
    pub name: String,
    /// Slot type.
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    /// Default value.
    pub default_value: toml::Value,
}

impl ConfigSlot {
    /// Create a slot, inferring the type from the default value.
    pub fn inferred(name: impl Into<String>, default_value: toml::Value) -> Self {
        let slot_type = match &default_value {
            toml::Value::String(_) => SlotType::String,
            toml::Value::Integer(_) | toml::Value::Float(_) => SlotType::Number,
            toml::Value::Boolean(_) => SlotType::Boolean,
            toml::Value::Array(items) if items.iter().all(toml::Value::is_str) => {
                SlotType::StringArray
            }
            _ => SlotType::Frozen,
        };
        Self { name: name.into(), slot_type, default_value }
    }
}

/// A named set of configuration slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSchema {
    /// Schema name.
    pub name: String,
    /// Slots. Builder schemas keep insertion order; schemas built from a
    /// TOML table list slots sorted by name.
    pub slots: Vec<ConfigSlot>,
}

impl ConfigurationSchema {
    /// Look up a slot by name.
    pub fn slot(&self, name: &str) -> Option<&ConfigSlot> {
        self.slots.iter().find(|s| s.name == name)
    }
}

/// Builder handed out through the capability bundle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaFactory;

impl SchemaFactory {
    /// Start a schema with the given name.
    pub fn builder(&self, name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder { name: name.into(), slots: Vec::new() }
    }

    /// Build a schema from a TOML table of `slot = default` pairs.
    pub fn from_table(&self, name: impl Into<String>, table: &toml::Table) -> ConfigurationSchema {
        let slots =
            table.iter().map(|(key, value)| ConfigSlot::inferred(key.clone(), value.clone()));
        ConfigurationSchema { name: name.into(), slots: slots.collect() }
    }
}

/// Incremental schema construction.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    slots: Vec<ConfigSlot>,
}

impl SchemaBuilder {
    /// Add a slot. A slot with the same name is replaced.
    pub fn slot(mut self, name: &str, slot_type: SlotType, default_value: toml::Value) -> Self {
        self.slots.retain(|s| s.name != name);
        self.slots.push(ConfigSlot { name: name.to_string(), slot_type, default_value });
        self
    }

    /// Finish the schema.
    pub fn build(self) -> ConfigurationSchema {
        ConfigurationSchema { name: self.name, slots: self.slots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_table_infers_types() {
        let table: toml::Table = toml::from_str(
            r#"
location = "/data/a.paf"
minScore = 0.5
showArrows = true
assemblyNames = ["hg19", "mm10"]
"#,
        )
        .unwrap();

        let schema = SchemaFactory.from_table("PAFAdapter", &table);
        assert_eq!(schema.slot("location").unwrap().slot_type, SlotType::String);
        assert_eq!(schema.slot("minScore").unwrap().slot_type, SlotType::Number);
        assert_eq!(schema.slot("showArrows").unwrap().slot_type, SlotType::Boolean);
        assert_eq!(schema.slot("assemblyNames").unwrap().slot_type, SlotType::StringArray);
    }

    #[test]
    fn test_from_table_sorts_slots_by_name() {
        let table: toml::Table = toml::from_str("zeta = 1\nalpha = 2\nmid = 3\n").unwrap();
        let schema = SchemaFactory.from_table("Sorted", &table);

        let names: Vec<_> = schema.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_builder_keeps_insertion_order() {
        let schema = SchemaFactory
            .builder("Ordered")
            .slot("zeta", SlotType::Number, toml::Value::Integer(1))
            .slot("alpha", SlotType::Number, toml::Value::Integer(2))
            .build();

        let names: Vec<_> = schema.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_builder_replaces_duplicate_slot() {
        let schema = SchemaFactory
            .builder("Test")
            .slot("a", SlotType::String, toml::Value::String("x".into()))
            .slot("a", SlotType::Number, toml::Value::Integer(3))
            .build();

        assert_eq!(schema.slots.len(), 1);
        assert_eq!(schema.slot("a").unwrap().slot_type, SlotType::Number);
    }
}
