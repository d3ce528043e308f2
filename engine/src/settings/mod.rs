//! Conversion settings.
//!
//! A [`ConverterConfig`] is a JSON document listing one [`ConversionSetting`]
//! per sheet plus the global fallbacks and the types the converter knows
//! about. The core reads it and never mutates it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::convert::{EnumDef, TypeRegistry};
use crate::error::{ConfigError, ConfigResult};

const DEFAULT_TEMP_PATH: &str = ".sheetforge/tmp";
const DEFAULT_OUTPUT_DIR: &str = "generated";

/// What a setting produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Enumeration from the first column of the sheet.
    Enum,
    /// Record class plus one record per row.
    #[default]
    Class,
    /// Record class, table wrapper and the records inside it.
    Table,
}

/// Shape of a table wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Hash-indexed by a single key.
    Dictionary,
    /// List, searchable when keys are configured.
    #[default]
    List,
}

/// Link local records into a list field of another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSetting {
    /// Class name of the target table's setting.
    pub target_table: String,
    pub target_key_field: String,
    pub local_key_field: String,
    pub target_list_field: String,
    #[serde(default = "default_find_method")]
    pub target_find_method: String,
}

fn default_find_method() -> String {
    "Find".to_string()
}

/// Where the grid for a setting comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// Local delimited file.
    File { path: PathBuf },
    /// JSON file holding a 2-D value grid, as returned by a sheet API.
    Values { path: PathBuf },
}

impl SourceSpec {
    pub fn path(&self) -> &Path {
        match self {
            SourceSpec::File { path } | SourceSpec::Values { path } => path,
        }
    }
}

/// One sheet-to-output mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSetting {
    pub class_name: String,

    #[serde(default)]
    pub output: OutputKind,

    #[serde(default)]
    pub table_kind: TableKind,

    /// Comma-separated key field names.
    #[serde(default)]
    pub key_fields: String,

    #[serde(default)]
    pub join: Option<JoinSetting>,

    /// Only the table asset is created; records are embedded as pure data.
    #[serde(default)]
    pub table_only: bool,

    #[serde(default)]
    pub table_class_name: Option<String>,

    #[serde(default)]
    pub table_asset_name: Option<String>,

    /// Falls back to the global value when absent.
    #[serde(default)]
    pub temp_path: Option<PathBuf>,

    #[serde(default)]
    pub source: Option<SourceSpec>,

    /// Emit a flag enumeration for `enum` output.
    #[serde(default)]
    pub enum_flags: bool,
}

impl ConversionSetting {
    pub fn new(class_name: impl Into<String>, output: OutputKind) -> Self {
        Self {
            class_name: class_name.into(),
            output,
            table_kind: TableKind::default(),
            key_fields: String::new(),
            join: None,
            table_only: false,
            table_class_name: None,
            table_asset_name: None,
            temp_path: None,
            source: None,
            enum_flags: false,
        }
    }

    /// Key field names: trimmed, empties removed, first occurrence kept.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for key in self.key_fields.split(',').map(str::trim) {
            if !key.is_empty() && !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        keys
    }

    pub fn table_class_name(&self) -> String {
        match &self.table_class_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => format!("{}Table", self.class_name),
        }
    }

    pub fn table_asset_name(&self) -> String {
        match &self.table_asset_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => self.table_class_name(),
        }
    }

    pub fn is_join(&self) -> bool {
        self.join.is_some()
    }

    /// Records are transient data rather than persisted assets.
    pub fn is_pure_class(&self) -> bool {
        (self.output == OutputKind::Table && self.table_only) || self.is_join()
    }

    pub fn effective_temp_path<'a>(&'a self, config: &'a ConverterConfig) -> &'a Path {
        self.temp_path.as_deref().unwrap_or(&config.temp_path)
    }
}

// =============================================================================
// Global configuration
// =============================================================================

/// Everything a conversion run reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default)]
    pub settings: Vec<ConversionSetting>,

    #[serde(default = "default_temp_path")]
    pub temp_path: PathBuf,

    /// Primary template location.
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Enumerations known before any sheet is read.
    #[serde(default)]
    pub enums: Vec<EnumDef>,

    /// External reference types values may be converted to.
    #[serde(default)]
    pub reference_types: Vec<String>,
}

fn default_temp_path() -> PathBuf {
    PathBuf::from(DEFAULT_TEMP_PATH)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            settings: Vec::new(),
            temp_path: default_temp_path(),
            template_dir: None,
            output_dir: default_output_dir(),
            enums: Vec::new(),
            reference_types: Vec::new(),
        }
    }
}

impl ConverterConfig {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_json(&content)?;
        config.resolve_relative_to(path.as_ref().parent().unwrap_or(Path::new("")));
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Make source paths relative to the config file's directory.
    fn resolve_relative_to(&mut self, base: &Path) {
        if base.as_os_str().is_empty() {
            return;
        }
        for setting in &mut self.settings {
            if let Some(SourceSpec::File { path } | SourceSpec::Values { path }) = &mut setting.source {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }

    pub fn setting(&self, class_name: &str) -> ConfigResult<&ConversionSetting> {
        self.settings
            .iter()
            .find(|s| s.class_name == class_name)
            .ok_or_else(|| ConfigError::UnknownSetting(class_name.to_string()))
    }

    /// Registry with the configured enums, reference types and the pure
    /// record classes joins produce.
    pub fn type_registry(&self) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        for def in &self.enums {
            registry.register_enum(def.clone());
        }
        for name in &self.reference_types {
            registry.register_reference(name.clone());
        }
        for setting in self.settings.iter().filter(|s| s.is_pure_class()) {
            registry.register_record(setting.class_name.clone());
        }
        registry
    }
}

/// Annotated sample printed by `sheetforge settings example`.
pub fn example_config() -> ConverterConfig {
    use crate::convert::EnumMember;

    let items = ConversionSetting {
        key_fields: "id".to_string(),
        table_kind: TableKind::Dictionary,
        source: Some(SourceSpec::File {
            path: PathBuf::from("sheets/items.csv"),
        }),
        ..ConversionSetting::new("Item", OutputKind::Table)
    };

    let drops = ConversionSetting {
        key_fields: "item_id, chance".to_string(),
        join: Some(JoinSetting {
            target_table: "Item".to_string(),
            target_key_field: "id".to_string(),
            local_key_field: "item_id".to_string(),
            target_list_field: "drops".to_string(),
            target_find_method: default_find_method(),
        }),
        source: Some(SourceSpec::Values {
            path: PathBuf::from("sheets/drops.json"),
        }),
        ..ConversionSetting::new("ItemDrop", OutputKind::Table)
    };

    let rarity = ConversionSetting {
        source: Some(SourceSpec::File {
            path: PathBuf::from("sheets/rarity.csv"),
        }),
        ..ConversionSetting::new("Rarity", OutputKind::Enum)
    };

    ConverterConfig {
        settings: vec![items, drops, rarity],
        enums: vec![EnumDef::flags(
            "ItemTags",
            vec![
                EnumMember::auto("Rare"),
                EnumMember::auto("Cursed"),
                EnumMember::auto("Quest"),
            ],
        )],
        reference_types: vec!["Sprite".to_string()],
        ..ConverterConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ValueType;

    #[test]
    fn test_keys_trimmed_and_deduplicated() {
        let setting = ConversionSetting {
            key_fields: " id, ,name,id ,  ".to_string(),
            ..ConversionSetting::new("Item", OutputKind::Table)
        };
        assert_eq!(setting.keys(), vec!["id", "name"]);
    }

    #[test]
    fn test_derived_names() {
        let mut setting = ConversionSetting::new("Item", OutputKind::Table);
        assert_eq!(setting.table_class_name(), "ItemTable");
        assert_eq!(setting.table_asset_name(), "ItemTable");

        setting.table_class_name = Some("Items".to_string());
        assert_eq!(setting.table_asset_name(), "Items");

        setting.table_asset_name = Some("AllItems".to_string());
        assert_eq!(setting.table_asset_name(), "AllItems");
    }

    #[test]
    fn test_pure_class() {
        let mut setting = ConversionSetting::new("Item", OutputKind::Table);
        assert!(!setting.is_pure_class());
        setting.table_only = true;
        assert!(setting.is_pure_class());

        let class = ConversionSetting {
            table_only: true,
            ..ConversionSetting::new("Item", OutputKind::Class)
        };
        assert!(!class.is_pure_class());
    }

    #[test]
    fn test_temp_path_fallback() {
        let config = ConverterConfig::default();
        let mut setting = ConversionSetting::new("Item", OutputKind::Class);
        assert_eq!(setting.effective_temp_path(&config), Path::new(DEFAULT_TEMP_PATH));
        setting.temp_path = Some(PathBuf::from("/tmp/items"));
        assert_eq!(setting.effective_temp_path(&config), Path::new("/tmp/items"));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config = ConverterConfig::from_json(
            r#"{"settings": [{"class_name": "Item", "output": "table", "table_kind": "dictionary"}]}"#,
        )
        .unwrap();
        let item = config.setting("Item").unwrap();
        assert_eq!(item.table_kind, TableKind::Dictionary);
        assert!(item.join.is_none());
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert!(matches!(
            config.setting("Nope"),
            Err(ConfigError::UnknownSetting(_))
        ));
    }

    #[test]
    fn test_example_round_trips_and_registers_types() {
        let config = example_config();
        let parsed = ConverterConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);

        let registry = parsed.type_registry();
        assert!(registry.resolve("ItemTags").is_some());
        assert_eq!(registry.resolve("Sprite"), Some(ValueType::Reference("Sprite".into())));
        assert_eq!(
            registry.resolve("ItemDrop[]"),
            Some(ValueType::Array(Box::new(ValueType::Record("ItemDrop".into()))))
        );
    }

    #[test]
    fn test_from_file_resolves_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheetforge.json");
        std::fs::write(&path, example_config().to_json().unwrap()).unwrap();

        let config = ConverterConfig::from_file(&path).unwrap();
        let source = config.setting("Item").unwrap().source.as_ref().unwrap();
        assert_eq!(source.path(), dir.path().join("sheets/items.csv"));
    }
}
