//! Source synthesis for record classes, table wrappers and enumerations.
//!
//! All output comes from template files (see [`templates`]). The synthesizer
//! only builds the substitution values: field declarations, key types and
//! the finder signature for searchable tables.
//!
//! | Setting                         | Table shape        | Template                  |
//! |---------------------------------|--------------------|---------------------------|
//! | `table_kind = dictionary`       | hash-indexed       | `DictionaryTable.txt`     |
//! | `table_kind = list`, valid keys | predicate-search   | `SearchableListTable.txt` |
//! | `table_kind = list`, no keys    | plain list         | `ListTable.txt`           |

pub mod templates;

use serde::{Deserialize, Serialize};

use crate::convert::EnumMember;
use crate::error::{SynthError, SynthResult};
use crate::grid::Grid;
use crate::schema::{distinct_fields, FieldSchema};
use crate::settings::{ConversionSetting, TableKind};

pub use templates::{Template, TemplateLocator};

/// Shape of a generated table wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStrategy {
    Dictionary,
    SearchableList,
    PlainList,
}

impl TableStrategy {
    /// Pick the table shape for a setting and its resolved key fields.
    ///
    /// Dictionary tables need exactly one key, and the sheet must have it.
    pub fn select(setting: &ConversionSetting, key_fields: &[FieldSchema]) -> SynthResult<Self> {
        match setting.table_kind {
            TableKind::Dictionary => match key_fields.len() {
                1 if key_fields[0].is_valid => Ok(TableStrategy::Dictionary),
                0 | 1 => Err(SynthError::MissingKey(setting.table_class_name())),
                count => Err(SynthError::TooManyKeys {
                    table: setting.table_class_name(),
                    count,
                }),
            },
            TableKind::List => {
                if !key_fields.is_empty() && key_fields.iter().all(|k| k.is_valid) {
                    Ok(TableStrategy::SearchableList)
                } else {
                    Ok(TableStrategy::PlainList)
                }
            }
        }
    }

    pub fn template_name(self) -> &'static str {
        match self {
            TableStrategy::Dictionary => templates::DICTIONARY_TABLE,
            TableStrategy::SearchableList => templates::SEARCHABLE_LIST_TABLE,
            TableStrategy::PlainList => templates::LIST_TABLE,
        }
    }
}

/// Parameter list and predicate of a searchable table's `Find`.
///
/// `[int id, string name]` gives `("int id, string name", "o.id == id && o.name == name")`.
pub fn find_signature(key_fields: &[FieldSchema]) -> (String, String) {
    let mut params = String::new();
    let mut predicate = String::new();
    for key in key_fields {
        params.push_str(&format!("{} {}, ", field_type(key), key.base_name));
        predicate.push_str(&format!("o.{} == {} && ", key.base_name, key.base_name));
    }
    (
        params.trim_end_matches(", ").to_string(),
        predicate.trim_end_matches(" && ").to_string(),
    )
}

fn field_type(field: &FieldSchema) -> String {
    if field.is_array_element {
        format!("{}[]", field.declared_type)
    } else {
        field.declared_type.clone()
    }
}

/// Enumeration members from an enum sheet: name in column 0, optional value
/// in column 1, header row skipped.
pub fn members_from_grid(grid: &dyn Grid) -> Vec<EnumMember> {
    let mut members: Vec<EnumMember> = Vec::new();
    for row in 1..grid.row_count() {
        let name = grid.cell(row, 0);
        let name = name.trim();
        if name.is_empty() || name.starts_with('#') {
            continue;
        }
        if members.iter().any(|m| m.name == name) {
            tracing::warn!(member = name, row, "duplicate enum member, ignoring");
            continue;
        }
        let value = grid.cell(row, 1);
        let member = match value.trim().parse::<i64>() {
            Ok(v) => EnumMember::new(name, v),
            Err(_) => EnumMember::auto(name),
        };
        members.push(member);
    }
    members
}

// =============================================================================
// Synthesizer
// =============================================================================

/// Emits source text from templates.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    templates: TemplateLocator,
}

impl Synthesizer {
    pub fn new(templates: TemplateLocator) -> Self {
        Self { templates }
    }

    /// One declaration per distinct base name, first occurrence wins.
    /// Indexed columns become arrays of their declared type.
    pub fn generate_record_class(&self, name: &str, fields: &[FieldSchema], is_pure_class: bool) -> String {
        let declarations: Vec<String> = distinct_fields(fields)
            .into_iter()
            .map(|f| format!("    public {} {};", field_type(f), f.base_name))
            .collect();

        let template_name = if is_pure_class {
            templates::PURE_RECORD_CLASS
        } else {
            templates::RECORD_CLASS
        };
        self.templates.template(template_name).render(&[
            ("ClassName", name),
            ("Fields", declarations.join("\n").as_str()),
        ])
    }

    /// Table wrapper for a setting. Fails only when a dictionary table does
    /// not have exactly one key.
    pub fn generate_table_class(
        &self,
        setting: &ConversionSetting,
        table_class_name: &str,
        key_fields: &[FieldSchema],
    ) -> SynthResult<String> {
        let strategy = TableStrategy::select(setting, key_fields)?;
        let template = self.templates.template(strategy.template_name());
        let mut values: Vec<(&str, String)> = vec![
            ("TableClassName", table_class_name.to_string()),
            ("ClassName", setting.class_name.clone()),
        ];

        match strategy {
            TableStrategy::Dictionary => {
                let key = &key_fields[0];
                values.push(("KeyType", field_type(key)));
                values.push(("KeyName", key.base_name.clone()));
            }
            TableStrategy::SearchableList => {
                let (params, predicate) = find_signature(key_fields);
                values.push(("FindParams", params));
                values.push(("FindPredicate", predicate));
            }
            TableStrategy::PlainList => {}
        }

        let borrowed: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
        Ok(template.render(&borrowed))
    }

    pub fn generate_enum(&self, name: &str, members: &[EnumMember], is_flags: bool) -> String {
        let lines: Vec<String> = members
            .iter()
            .map(|m| match m.value {
                Some(value) => format!("    {} = {},", m.name, value),
                None => format!("    {},", m.name),
            })
            .collect();
        let attributes = if is_flags { "[Flags]\n" } else { "" };
        self.templates.template(templates::ENUM).render(&[
            ("ClassName", name),
            ("Attributes", attributes),
            ("EnumMembers", lines.join("\n").as_str()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{EnumDef, TypeRegistry};
    use crate::grid::OwnedGrid;
    use crate::settings::OutputKind;
    use tempfile::TempDir;

    fn field(name: &str, ty: &str) -> FieldSchema {
        FieldSchema::new(name, ty, 0, &TypeRegistry::new())
    }

    fn table_setting(kind: TableKind) -> ConversionSetting {
        ConversionSetting {
            table_kind: kind,
            ..ConversionSetting::new("Item", OutputKind::Table)
        }
    }

    fn synthesizer_with(dir: &TempDir, files: &[(&str, &str)]) -> Synthesizer {
        for (name, text) in files {
            std::fs::write(dir.path().join(name), text).unwrap();
        }
        Synthesizer::new(TemplateLocator::with_dirs(dir.path(), dir.path().join("none")))
    }

    #[test]
    fn test_find_signature() {
        let keys = vec![field("id", "int"), field("name", "string")];
        let (params, predicate) = find_signature(&keys);
        assert_eq!(params, "int id, string name");
        assert_eq!(predicate, "o.id == id && o.name == name");
    }

    #[test]
    fn test_dictionary_needs_one_key() {
        let dir = TempDir::new().unwrap();
        let synth = synthesizer_with(&dir, &[(templates::DICTIONARY_TABLE, "%KeyType% %KeyName%")]);
        let setting = table_setting(TableKind::Dictionary);

        assert_eq!(
            synth.generate_table_class(&setting, "ItemTable", &[]),
            Err(SynthError::MissingKey("ItemTable".into()))
        );
        assert_eq!(
            synth.generate_table_class(&setting, "ItemTable", &[field("id", "int"), field("name", "string")]),
            Err(SynthError::TooManyKeys {
                table: "ItemTable".into(),
                count: 2
            })
        );
        assert_eq!(
            synth.generate_table_class(&setting, "ItemTable", &[field("id", "int")]).unwrap(),
            "int id"
        );
    }

    #[test]
    fn test_dictionary_key_absent_from_sheet() {
        let dir = TempDir::new().unwrap();
        let synth = synthesizer_with(&dir, &[(templates::DICTIONARY_TABLE, "%KeyType% %KeyName%")]);
        let setting = ConversionSetting {
            key_fields: "code".into(),
            ..table_setting(TableKind::Dictionary)
        };
        let grid = OwnedGrid::from_rows(vec![
            vec!["id".into(), "name".into()],
            vec!["int".into(), "string".into()],
        ]);
        let schema = crate::schema::derive_schema(&grid, &TypeRegistry::new());
        let keys = crate::schema::key_fields(&schema, &setting.keys());

        assert_eq!(
            TableStrategy::select(&setting, &keys),
            Err(SynthError::MissingKey("ItemTable".into()))
        );
        assert_eq!(
            synth.generate_table_class(&setting, "ItemTable", &keys),
            Err(SynthError::MissingKey("ItemTable".into()))
        );
    }

    #[test]
    fn test_list_strategies() {
        let setting = table_setting(TableKind::List);
        assert_eq!(
            TableStrategy::select(&setting, &[field("id", "int")]).unwrap(),
            TableStrategy::SearchableList
        );
        assert_eq!(TableStrategy::select(&setting, &[]).unwrap(), TableStrategy::PlainList);
        assert_eq!(
            TableStrategy::select(&setting, &[field("id", "int"), field("ghost", "Unknown")]).unwrap(),
            TableStrategy::PlainList
        );
    }

    #[test]
    fn test_searchable_table_text() {
        let dir = TempDir::new().unwrap();
        let synth = synthesizer_with(
            &dir,
            &[(templates::SEARCHABLE_LIST_TABLE, "%TableClassName%<%ClassName%> Find(%FindParams%) => %FindPredicate%")],
        );
        let text = synth
            .generate_table_class(
                &table_setting(TableKind::List),
                "Items",
                &[field("id", "int"), field("name", "string")],
            )
            .unwrap();
        assert_eq!(text, "Items<Item> Find(int id, string name) => o.id == id && o.name == name");
    }

    #[test]
    fn test_record_class_dedups_array_columns() {
        let dir = TempDir::new().unwrap();
        let synth = synthesizer_with(
            &dir,
            &[
                (templates::RECORD_CLASS, "asset %ClassName%\n%Fields%"),
                (templates::PURE_RECORD_CLASS, "pure %ClassName%\n%Fields%"),
            ],
        );
        let fields = vec![
            field("id", "int"),
            field("drops[0]", "int"),
            field("drops[1]", "int"),
            field("", "int"),
            field("name", "string"),
        ];

        assert_eq!(
            synth.generate_record_class("Item", &fields, false),
            "asset Item\n    public int id;\n    public int[] drops;\n    public string name;"
        );
        assert!(synth.generate_record_class("Item", &fields, true).starts_with("pure Item"));
    }

    #[test]
    fn test_missing_template_gives_empty_text() {
        let dir = TempDir::new().unwrap();
        let synth = synthesizer_with(&dir, &[]);
        assert_eq!(synth.generate_record_class("Item", &[field("id", "int")], false), "");
        assert_eq!(
            synth.generate_table_class(&table_setting(TableKind::List), "ItemTable", &[]),
            Ok(String::new())
        );
    }

    #[test]
    fn test_enum_from_sheet() {
        let grid = OwnedGrid::from_rows(vec![
            vec!["name".into(), "value".into()],
            vec!["Common".into(), "".into()],
            vec!["#retired".into(), "".into()],
            vec!["Epic".into(), "10".into()],
            vec!["Legendary".into(), "".into()],
            vec!["Common".into(), "".into()],
        ]);
        let members = members_from_grid(&grid);
        let def = EnumDef::new("Rarity", members);
        assert_eq!(def.members.len(), 3);
        assert_eq!(def.member_value("Legendary"), Some(11));

        let dir = TempDir::new().unwrap();
        let synth = synthesizer_with(&dir, &[(templates::ENUM, "%Attributes%enum %ClassName% {\n%EnumMembers%\n}")]);
        assert_eq!(
            synth.generate_enum("Rarity", &def.members, false),
            "enum Rarity {\n    Common = 0,\n    Epic = 10,\n    Legendary = 11,\n}"
        );
        assert!(synth.generate_enum("Rarity", &def.members, true).starts_with("[Flags]\n"));
    }
}
