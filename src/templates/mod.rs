//! Starter resources offered by the template catalog.

use crate::descriptor::uses_legacy_folder_names;

/// Registry a generated resource belongs to. Decides the folder the file is
/// placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Function,
    Advancement,
    Recipe,
    LootTable,
    Predicate,
    ItemModifier,
    FunctionTag,
}

impl Category {
    /// Folder chain for this registry, outermost first. Releases before 1.21
    /// use plural names.
    pub fn folders(self, legacy: bool) -> &'static [&'static str] {
        match (self, legacy) {
            (Category::Function, false) => &["function"],
            (Category::Function, true) => &["functions"],
            (Category::Advancement, false) => &["advancement"],
            (Category::Advancement, true) => &["advancements"],
            (Category::Recipe, false) => &["recipe"],
            (Category::Recipe, true) => &["recipes"],
            (Category::LootTable, false) => &["loot_table"],
            (Category::LootTable, true) => &["loot_tables"],
            (Category::Predicate, false) => &["predicate"],
            (Category::Predicate, true) => &["predicates"],
            (Category::ItemModifier, false) => &["item_modifier"],
            (Category::ItemModifier, true) => &["item_modifiers"],
            (Category::FunctionTag, false) => &["tags", "function"],
            (Category::FunctionTag, true) => &["tags", "functions"],
        }
    }
}

/// A file produced by rendering a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Registry folders the file belongs in, outermost first.
    pub folders: &'static [&'static str],
    /// File name including the extension.
    pub file_name: String,
    /// Rendered file body.
    pub content: String,
}

/// An entry of the template catalog.
pub struct Template {
    /// Stable identifier used to pick the template.
    pub id: &'static str,
    /// Human-readable name shown in the catalog.
    pub label: &'static str,
    /// Registry the rendered file belongs to.
    pub category: Category,
    extension: &'static str,
    body: fn(namespace: &str, name: &str) -> String,
}

impl Template {
    /// Renders the template for a pack. `name` is the file stem chosen by the
    /// user.
    pub fn render(&self, namespace: &str, name: &str, target_version: &str) -> GeneratedFile {
        let legacy = uses_legacy_folder_names(target_version);
        GeneratedFile {
            folders: self.category.folders(legacy),
            file_name: format!("{name}.{}", self.extension),
            content: (self.body)(namespace, name),
        }
    }
}

fn load_function(namespace: &str, _name: &str) -> String {
    format!(
        "# Runs once when the pack loads\n\
         tellraw @a {{\"text\":\"{namespace} loaded\",\"color\":\"green\"}}\n"
    )
}

fn tick_function(_namespace: &str, _name: &str) -> String {
    "# Runs every game tick\n".to_string()
}

fn plain_function(namespace: &str, name: &str) -> String {
    format!("# {namespace}:{name}\nsay Hello from {namespace}:{name}\n")
}

fn advancement(namespace: &str, name: &str) -> String {
    format!(
        r#"{{
  "display": {{
    "icon": {{ "id": "minecraft:diamond" }},
    "title": "{name}",
    "description": "Obtain a diamond"
  }},
  "criteria": {{
    "has_diamond": {{
      "trigger": "minecraft:inventory_changed",
      "conditions": {{ "items": [{{ "items": "minecraft:diamond" }}] }}
    }}
  }},
  "rewards": {{ "function": "{namespace}:{name}_reward" }}
}}
"#
    )
}

fn shaped_recipe(_namespace: &str, _name: &str) -> String {
    r###"{
  "type": "minecraft:crafting_shaped",
  "pattern": [
    "##",
    "##"
  ],
  "key": {
    "#": "minecraft:oak_planks"
  },
  "result": {
    "id": "minecraft:crafting_table",
    "count": 1
  }
}
"###
    .to_string()
}

fn loot_table(_namespace: &str, _name: &str) -> String {
    r#"{
  "type": "minecraft:block",
  "pools": [
    {
      "rolls": 1,
      "entries": [
        { "type": "minecraft:item", "name": "minecraft:stone" }
      ]
    }
  ]
}
"#
    .to_string()
}

fn predicate(_namespace: &str, _name: &str) -> String {
    r#"{
  "condition": "minecraft:random_chance",
  "chance": 0.5
}
"#
    .to_string()
}

fn item_modifier(_namespace: &str, _name: &str) -> String {
    r#"{
  "function": "minecraft:set_count",
  "count": 1
}
"#
    .to_string()
}

fn function_tag(namespace: &str, name: &str) -> String {
    format!("{{\n  \"values\": [\n    \"{namespace}:{name}\"\n  ]\n}}\n")
}

static CATALOG: &[Template] = &[
    Template {
        id: "load_function",
        label: "Load function",
        category: Category::Function,
        extension: "mcfunction",
        body: load_function,
    },
    Template {
        id: "tick_function",
        label: "Tick function",
        category: Category::Function,
        extension: "mcfunction",
        body: tick_function,
    },
    Template {
        id: "function",
        label: "Empty function",
        category: Category::Function,
        extension: "mcfunction",
        body: plain_function,
    },
    Template {
        id: "advancement",
        label: "Advancement",
        category: Category::Advancement,
        extension: "json",
        body: advancement,
    },
    Template {
        id: "shaped_recipe",
        label: "Shaped crafting recipe",
        category: Category::Recipe,
        extension: "json",
        body: shaped_recipe,
    },
    Template {
        id: "loot_table",
        label: "Block loot table",
        category: Category::LootTable,
        extension: "json",
        body: loot_table,
    },
    Template {
        id: "predicate",
        label: "Random chance predicate",
        category: Category::Predicate,
        extension: "json",
        body: predicate,
    },
    Template {
        id: "item_modifier",
        label: "Set count item modifier",
        category: Category::ItemModifier,
        extension: "json",
        body: item_modifier,
    },
    Template {
        id: "function_tag",
        label: "Function tag",
        category: Category::FunctionTag,
        extension: "json",
        body: function_tag,
    },
];

/// All templates, in the order they are offered.
pub fn catalog() -> &'static [Template] {
    CATALOG
}

/// Looks up a template by id.
pub fn find(id: &str) -> Option<&'static Template> {
    CATALOG.iter().find(|template| template.id == id)
}
