//! Entity lexicon: surface forms, repost handles and excluded authors.
//!
//! The lexicon is external data, loaded from a TOML file so that adding a
//! party or an alias does not require a rebuild:
//!
//! ```toml
//! exclude = ["NOS", "telegraaf"]
//!
//! [entities.vvd]
//! name = "Volkspartij voor Vrijheid en Democratie"
//! keywords = ["VVD", "Rutte", "markrutte"]
//! handles = ["vvd", "markrutte"]
//! ```
//!
//! Keywords and handles are stored lowercased. Exclusions are kept exactly
//! as written, since author ids are compared case-sensitively.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use crate::models::EntityId;

/// Lowercased surface form → entity.
pub type KeywordMap = HashMap<String, EntityId>;
/// Lowercased account handle → entity.
pub type HandleMap = HashMap<String, EntityId>;
/// Author ids that are never attributed.
pub type ExclusionSet = HashSet<String>;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LexiconFile {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    entities: BTreeMap<String, EntityEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    handles: Vec<String>,
}

/// Display information about one configured entity.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub id: EntityId,
    pub name: Option<String>,
    pub keyword_count: usize,
    pub handle_count: usize,
}

/// The validated lexicon shared by both classification strategies.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entities: Vec<EntityInfo>,
    keywords: KeywordMap,
    handles: HandleMap,
    exclusions: ExclusionSet,
}

impl Lexicon {
    /// Configured entities, sorted by id.
    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.iter().map(|e| &e.id)
    }

    pub fn entity_info(&self) -> &[EntityInfo] {
        &self.entities
    }

    pub fn keywords(&self) -> &KeywordMap {
        &self.keywords
    }

    pub fn handles(&self) -> &HandleMap {
        &self.handles
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }
}

pub fn load_lexicon(path: &Path) -> Result<Lexicon> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read lexicon file: {}", path.display()))?;
    parse_lexicon(&content)
        .with_context(|| format!("Failed to load lexicon: {}", path.display()))
}

pub fn parse_lexicon(content: &str) -> Result<Lexicon> {
    let file: LexiconFile = toml::from_str(content).context("Failed to parse lexicon")?;

    if file.entities.is_empty() {
        bail!("lexicon must define at least one [entities.<id>] table");
    }

    let mut lexicon = Lexicon {
        exclusions: file.exclude.into_iter().collect(),
        ..Lexicon::default()
    };

    for (raw_id, entry) in file.entities {
        validate_entity_id(&raw_id)?;
        let id = EntityId::new(&raw_id);

        let mut keyword_count = 0;
        for keyword in &entry.keywords {
            let form = keyword.trim().to_lowercase();
            if form.is_empty() {
                bail!("entity '{}' has an empty keyword", id);
            }
            if form.split_whitespace().nth(1).is_some() {
                warn!(
                    entity = %id,
                    keyword = %keyword,
                    "keyword spans several words and will never match a single token"
                );
            }
            if insert_unique(&mut lexicon.keywords, form, &id, "keyword")? {
                keyword_count += 1;
            }
        }

        let mut handle_count = 0;
        for handle in &entry.handles {
            let form = handle.trim().trim_start_matches('@').to_lowercase();
            if form.is_empty() {
                bail!("entity '{}' has an empty handle", id);
            }
            if insert_unique(&mut lexicon.handles, form, &id, "handle")? {
                handle_count += 1;
            }
        }

        debug!(entity = %id, keyword_count, handle_count, "loaded entity");
        lexicon.entities.push(EntityInfo {
            id,
            name: entry.name,
            keyword_count,
            handle_count,
        });
    }

    Ok(lexicon)
}

/// Insert a lowercased form. Returns `false` when the form was already
/// present for the same entity; a form claimed by another entity is an
/// error.
fn insert_unique(
    map: &mut HashMap<String, EntityId>,
    form: String,
    id: &EntityId,
    kind: &str,
) -> Result<bool> {
    match map.get(&form) {
        Some(existing) if existing == id => Ok(false),
        Some(existing) => bail!(
            "{} '{}' is assigned to both '{}' and '{}'",
            kind,
            form,
            existing,
            id
        ),
        None => {
            map.insert(form, id.clone());
            Ok(true)
        }
    }
}

fn validate_entity_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("entity id must not be empty");
    }
    if id
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, ',' | '/' | '\\'))
    {
        bail!(
            "entity id '{}' must not contain whitespace, ',' or path separators",
            id
        );
    }
    Ok(())
}
