//! Keyword knowledge base and compatibility engine.
//!
//! The knowledge base loads a declarative taxonomy (JSON) describing
//! Gaussian route-section keywords: categories with their keywords,
//! parameter templates with `{placeholder}` patterns, and compatibility
//! rules (mutual exclusions, requirements, recommendations). The taxonomy
//! is loaded once at startup into immutable records; every accessor is a
//! read-only lookup over that state.
//!
//! # Taxonomy Format
//!
//! ```json
//! {
//!   "categories": {
//!     "job_types": {
//!       "name": "Job Types",
//!       "keywords": [
//!         {"name": "opt", "description": "Geometry optimization",
//!          "requires_parameters": false, "compatible_with": ["freq"]}
//!       ]
//!     }
//!   },
//!   "common_parameters": {
//!     "td": {
//!       "template": "td=(nstates={nstates},root={root})",
//!       "description": "Excited states",
//!       "defaults": {"nstates": 50, "root": 1},
//!       "options": {}
//!     }
//!   },
//!   "compatibility_rules": {
//!     "mutually_exclusive": [["opt", "optts"]],
//!     "requires": {"temperature": ["freq"]},
//!     "recommended_with": {"opt": ["freq"]}
//!   }
//! }
//! ```
//!
//! A `requires` entry may name a category id instead of a keyword, in which
//! case at least one keyword from that category must be present.
//!
//! The shipped taxonomy lives in `data/keywords.json` and is embedded into
//! the binary, so the tool works without an installed data directory; an
//! explicit data-directory load remains available and fails with
//! [`KeywordError::MissingDataSource`] when the file is absent.

use crate::tokenizer::{self, ParamMap};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Taxonomy shipped with the crate, embedded at compile time.
const BUILTIN_TAXONOMY: &str = include_str!("../data/keywords.json");

lazy_static! {
    // Placeholder removal for parameters left without a value, applied in
    // this order: ", {x}" then "{x}, " then a lone "({x})" which becomes "()".
    static ref PLACEHOLDER_AFTER_COMMA: Regex = Regex::new(r",\s*\{[^}]+\}").unwrap();
    static ref PLACEHOLDER_BEFORE_COMMA: Regex = Regex::new(r"\{[^}]+\},\s*").unwrap();
    static ref PLACEHOLDER_ALONE: Regex = Regex::new(r"\(\s*\{[^}]+\}\s*\)").unwrap();
}

/// Errors from loading the keyword taxonomy.
#[derive(Error, Debug)]
pub enum KeywordError {
    /// The taxonomy file is absent. Fatal: the application cannot proceed
    /// without its keyword data.
    #[error("keyword data file not found: {0}")]
    MissingDataSource(PathBuf),
    /// I/O error when reading the taxonomy file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed taxonomy JSON
    #[error("invalid keyword data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for keyword-manager results
type Result<T> = std::result::Result<T, KeywordError>;

/// Information about one Gaussian keyword. Immutable once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordInfo {
    /// Keyword name as written on the directive line
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Display name of the category the keyword belongs to
    #[serde(skip)]
    pub category: String,
    /// Whether the keyword is only meaningful with parameters
    #[serde(default)]
    pub requires_parameters: bool,
    /// Keywords this one is known to combine well with
    #[serde(default)]
    pub compatible_with: Vec<String>,
    /// Free-form per-keyword parameter notes
    #[serde(default)]
    pub common_parameters: HashMap<String, serde_json::Value>,
}

/// Parameter template for a keyword. Immutable once loaded.
///
/// The template string contains `{name}` placeholders; `defaults` supplies
/// fallback values and `options` enumerates legal values per parameter
/// name, including the shared buckets `common_solvents`, `common_types`
/// and `common_options`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParameterTemplate {
    /// Keyword the template belongs to
    #[serde(skip)]
    pub keyword: String,
    /// Pattern such as `td=(nstates={nstates},root={root})`
    #[serde(default)]
    pub template: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Default values per placeholder name
    #[serde(default)]
    pub defaults: IndexMap<String, serde_json::Value>,
    /// Enumerated legal values per parameter name
    #[serde(default)]
    pub options: IndexMap<String, Vec<String>>,
}

/// Compatibility rules between keywords. Immutable once loaded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompatibilityRules {
    /// Groups of keywords that must not appear together
    #[serde(default)]
    pub mutually_exclusive: Vec<Vec<String>>,
    /// Keyword -> required keywords or category ids
    #[serde(default)]
    pub requires: HashMap<String, Vec<String>>,
    /// Keyword -> advisory companions
    #[serde(default)]
    pub recommended_with: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CategoryData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    keywords: Vec<KeywordInfo>,
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    #[serde(default)]
    categories: IndexMap<String, CategoryData>,
    #[serde(default)]
    common_parameters: IndexMap<String, ParameterTemplate>,
    #[serde(default)]
    compatibility_rules: CompatibilityRules,
}

/// Read-only keyword knowledge base.
///
/// Built once at startup; all lookups return references into the loaded
/// records.
#[derive(Debug)]
pub struct KeywordManager {
    keywords: IndexMap<String, KeywordInfo>,
    categories: IndexMap<String, CategoryData>,
    parameter_templates: IndexMap<String, ParameterTemplate>,
    compatibility_rules: CompatibilityRules,
}

impl KeywordManager {
    /// Loads the taxonomy from `<data_dir>/keywords.json`.
    ///
    /// Returns [`KeywordError::MissingDataSource`] when the file does not
    /// exist; this is fatal for the application.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let keywords_file = data_dir.join("keywords.json");
        if !keywords_file.exists() {
            return Err(KeywordError::MissingDataSource(keywords_file));
        }

        let content = fs::read_to_string(&keywords_file)?;
        let manager = Self::from_json(&content)?;
        debug!(
            "Loaded {} keywords in {} categories from {}",
            manager.keywords.len(),
            manager.categories.len(),
            keywords_file.display()
        );
        Ok(manager)
    }

    /// Builds the knowledge base from the taxonomy embedded in the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TAXONOMY)
    }

    /// Builds the knowledge base from taxonomy JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let data: TaxonomyFile = serde_json::from_str(json)?;

        let mut keywords = IndexMap::new();
        for category in data.categories.values() {
            for kw in &category.keywords {
                if kw.name.is_empty() {
                    continue;
                }
                let mut info = kw.clone();
                info.category = category.name.clone();
                keywords.insert(info.name.clone(), info);
            }
        }

        let mut parameter_templates = data.common_parameters;
        for (name, template) in parameter_templates.iter_mut() {
            template.keyword = name.clone();
        }

        Ok(Self {
            keywords,
            categories: data.categories,
            parameter_templates,
            compatibility_rules: data.compatibility_rules,
        })
    }

    /// Looks up a keyword by name.
    pub fn get_keyword(&self, name: &str) -> Option<&KeywordInfo> {
        self.keywords.get(name)
    }

    /// Returns the keywords of a category in declared order.
    ///
    /// Names that did not make it into the flattened index are skipped;
    /// inconsistent data is tolerated rather than rejected.
    pub fn keywords_by_category(&self, category_id: &str) -> Vec<&KeywordInfo> {
        let category = match self.categories.get(category_id) {
            Some(c) => c,
            None => return Vec::new(),
        };

        category
            .keywords
            .iter()
            .filter_map(|kw| self.keywords.get(&kw.name))
            .collect()
    }

    /// Returns `(id, display name)` pairs for all categories, in
    /// declaration order.
    pub fn all_categories(&self) -> Vec<(String, String)> {
        self.categories
            .iter()
            .map(|(id, data)| {
                let name = if data.name.is_empty() {
                    id.clone()
                } else {
                    data.name.clone()
                };
                (id.clone(), name)
            })
            .collect()
    }

    /// Case-insensitive substring search over keyword names and
    /// descriptions, optionally restricted to a category display name.
    pub fn search_keywords(&self, query: &str, category_filter: Option<&str>) -> Vec<&KeywordInfo> {
        let query = query.to_lowercase();

        self.keywords
            .values()
            .filter(|info| category_filter.map_or(true, |c| info.category == c))
            .filter(|info| {
                info.name.to_lowercase().contains(&query)
                    || info.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Returns the parameter template for a keyword, if one exists.
    pub fn get_parameter_template(&self, keyword: &str) -> Option<&ParameterTemplate> {
        self.parameter_templates.get(keyword)
    }

    /// Returns a keyword's template defaults as strings, empty when the
    /// keyword has no template.
    pub fn parameter_defaults(&self, keyword: &str) -> ParamMap {
        match self.get_parameter_template(keyword) {
            Some(template) => template
                .defaults
                .iter()
                .map(|(k, v)| (k.clone(), value_to_string(v)))
                .collect(),
            None => ParamMap::new(),
        }
    }

    /// Renders a keyword's parameter template with the given overrides.
    ///
    /// Defaults are merged with `overrides`, each `{name}` placeholder with
    /// a non-empty value is substituted, and placeholders left without a
    /// value are deleted along with their separating comma (a lone
    /// parenthesized placeholder collapses to `()`). Leftover comma
    /// artifacts (`"(,"`, `",)"`, `",,"`) are cleaned up afterwards. This
    /// is what lets optional bare-flag parameters such as `smd` disappear
    /// cleanly when unset.
    ///
    /// A keyword without a template renders as its bare name.
    pub fn render_parameters(&self, keyword: &str, overrides: &ParamMap) -> String {
        let template = match self.get_parameter_template(keyword) {
            Some(t) => t,
            None => return keyword.to_string(),
        };

        let mut values = self.parameter_defaults(keyword);
        for (k, v) in overrides {
            values.insert(k.clone(), v.clone());
        }

        let mut result = template.template.clone();
        for (key, value) in &values {
            if !value.is_empty() {
                result = result.replace(&format!("{{{}}}", key), value);
            }
        }

        result = PLACEHOLDER_AFTER_COMMA.replace_all(&result, "").to_string();
        result = PLACEHOLDER_BEFORE_COMMA.replace_all(&result, "").to_string();
        result = PLACEHOLDER_ALONE.replace_all(&result, "()").to_string();

        result
            .replace("(,", "(")
            .replace(",)", ")")
            .replace(",,", ",")
    }

    /// Checks a candidate keyword against the keywords already present.
    ///
    /// Returns `(is_compatible, warnings)`. Mutual-exclusion collisions and
    /// unmet requirements produce blocking warnings; recommendations
    /// produce advisory warnings only. The verdict is compatible exactly
    /// when no blocking warning was produced.
    pub fn check_compatibility(
        &self,
        existing_keywords: &[String],
        new_keyword: &str,
    ) -> (bool, Vec<String>) {
        let mut warnings = Vec::new();
        let mut blocking = 0usize;

        for group in &self.compatibility_rules.mutually_exclusive {
            if !group.iter().any(|kw| kw == new_keyword) {
                continue;
            }
            let conflicting: Vec<&str> = existing_keywords
                .iter()
                .filter(|kw| group.contains(kw) && kw.as_str() != new_keyword)
                .map(String::as_str)
                .collect();
            if !conflicting.is_empty() {
                warnings.push(format!(
                    "{} is mutually exclusive with: {}",
                    new_keyword,
                    conflicting.join(", ")
                ));
                blocking += 1;
            }
        }

        if let Some(required) = self.compatibility_rules.requires.get(new_keyword) {
            let mut missing = Vec::new();

            for req in required {
                if existing_keywords.contains(req) {
                    continue;
                }
                if self.categories.contains_key(req) {
                    let category_keywords = self.keywords_by_category(req);
                    let satisfied = category_keywords
                        .iter()
                        .any(|info| existing_keywords.contains(&info.name));
                    if !satisfied {
                        missing.push(format!("some keyword from category '{}'", req));
                    }
                } else {
                    missing.push(req.clone());
                }
            }

            if !missing.is_empty() {
                warnings.push(format!("{} requires: {}", new_keyword, missing.join(", ")));
                blocking += 1;
            }
        }

        if let Some(recommended) = self.compatibility_rules.recommended_with.get(new_keyword) {
            for rec in recommended {
                if !existing_keywords.contains(rec) {
                    warnings.push(format!("Recommended with {}: {}", new_keyword, rec));
                }
            }
        }

        (blocking == 0, warnings)
    }

    /// Decodes a keyword fragment into `(name, parameters)`.
    pub fn parse_keyword_string(&self, keyword_string: &str) -> (String, ParamMap) {
        tokenizer::decode(keyword_string)
    }

    /// Returns only the parameter map of a decoded fragment.
    pub fn extract_current_parameters(&self, keyword_string: &str) -> ParamMap {
        tokenizer::decode(keyword_string).1
    }

    /// Merges new parameter values into a fragment and re-encodes it.
    ///
    /// Template-bearing keywords render through their template with empty
    /// values dropped; everything else goes through the generic encoder. A
    /// fully emptied parameter map renders the bare keyword name.
    pub fn update_parameter_string(&self, keyword_string: &str, new_params: &ParamMap) -> String {
        let (name, current) = tokenizer::decode(keyword_string);

        let mut updated = current;
        for (k, v) in new_params {
            updated.insert(k.clone(), v.clone());
        }

        if updated.is_empty() {
            return name;
        }

        if self.get_parameter_template(&name).is_some() {
            let filtered: ParamMap = updated
                .into_iter()
                .filter(|(_, v)| !v.is_empty())
                .collect();
            return self.render_parameters(&name, &filtered);
        }

        if updated.len() == 1 {
            if let Some(value) = updated.get("value") {
                return format!("{}={}", name, value);
            }
        }

        let filtered: ParamMap = updated
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect();
        if filtered.is_empty() {
            return name;
        }

        tokenizer::encode(&name, &filtered)
    }

    /// Returns the legal values for one parameter of a keyword.
    ///
    /// Falls back to the shared buckets for the special parameter names
    /// `solvent`, `type` and `option`; an empty result means free-text
    /// entry is allowed.
    pub fn parameter_options(&self, keyword: &str, param_name: &str) -> Vec<String> {
        let template = match self.get_parameter_template(keyword) {
            Some(t) => t,
            None => return Vec::new(),
        };

        if let Some(options) = template.options.get(param_name) {
            return options.clone();
        }

        let bucket = match param_name {
            "solvent" => "common_solvents",
            "type" => "common_types",
            "option" => "common_options",
            _ => return Vec::new(),
        };

        template.options.get(bucket).cloned().unwrap_or_default()
    }

    /// Formats a fragment for display: `"name - description (k=v, ...)"`
    /// for known keywords, the fragment itself otherwise.
    pub fn format_keyword_for_display(&self, keyword_string: &str) -> String {
        let (name, params) = tokenizer::decode(keyword_string);

        match self.get_keyword(&name) {
            Some(info) => {
                let mut display = format!("{} - {}", name, info.description);
                if !params.is_empty() {
                    let rendered = params
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect::<Vec<_>>()
                        .join(", ");
                    display.push_str(&format!(" ({})", rendered));
                }
                display
            }
            None => keyword_string.to_string(),
        }
    }

    /// Returns `(value, display)` pairs for selection menus, optionally
    /// restricted to a category.
    pub fn keyword_choices(&self, category_id: Option<&str>) -> Vec<(String, String)> {
        let keywords: Vec<&KeywordInfo> = match category_id {
            Some(id) => self.keywords_by_category(id),
            None => self.keywords.values().collect(),
        };

        keywords
            .iter()
            .map(|info| {
                (
                    info.name.clone(),
                    self.format_keyword_for_display(&info.name),
                )
            })
            .collect()
    }
}

/// Stringifies a taxonomy default value for template substitution.
fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
