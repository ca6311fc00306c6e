//! Entity registry
//!
//! Holds the resolved rule of every known class. Aliases are resolved once,
//! at construction, by walking the class → alias graph in topological order
//! so that a rule is complete before it is copied onward.

use super::rule::{Entity, EntityRule};
use crate::pattern::{FieldRef, parse_fields};
use crate::record::Record;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

/// Fields requested for every class regardless of its rule
pub const DEFAULT_FIELDS: &[&str] = &[
    "sys_scope.name",
    "sys_scope.scope",
    "sys_scope",
    "sys_class_name",
    "sys_created_by",
    "sys_created_on",
    "sys_customer_update",
    "sys_id",
    "sys_mod_count",
    "sys_name",
    "sys_package",
    "sys_policy",
    "sys_replace_on_upgrade",
    "sys_updated_by",
    "sys_updated_on",
    "sys_update_name",
];

/// Fields to fetch for a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestArguments {
    pub class_name: String,
    pub field_names: Vec<FieldRef>,
    /// Whether any field must be fetched with its display value
    pub display_value: bool,
    pub query_field_names: Vec<String>,
}

/// Outcome of matching a record against the registry.
#[derive(Debug, Clone)]
pub struct Classification {
    pub entity: Option<Arc<Entity>>,
    pub passes_filter: bool,
}

impl Classification {
    /// Known class whose filter accepts the record.
    pub fn is_match(&self) -> bool {
        self.entity.is_some() && self.passes_filter
    }
}

/// Resolve alias edges into a complete rule set.
///
/// Every class listing aliases is processed after all classes that alias it,
/// so merged values propagate along chains. An alias naming a configured
/// class is merged into it; otherwise a new rule is synthesized from the
/// source. Cycles are broken by processing their members in name order, and
/// passes repeat until the set stops changing, so resolving an already
/// resolved set returns it unchanged.
pub fn resolve_aliases(rules: &BTreeMap<String, EntityRule>) -> BTreeMap<String, EntityRule> {
    let mut resolved = resolve_pass(rules);
    for _ in 0..rules.len() {
        let next = resolve_pass(&resolved);
        if next == resolved {
            break;
        }
        resolved = next;
    }
    resolved
}

fn resolve_pass(rules: &BTreeMap<String, EntityRule>) -> BTreeMap<String, EntityRule> {
    let mut in_degree: BTreeMap<&str, usize> = rules.keys().map(|k| (k.as_str(), 0)).collect();
    for (class, rule) in rules {
        for alias in rule.alias.iter().filter(|a| *a != class) {
            if let Some(degree) = in_degree.get_mut(alias.as_str()) {
                *degree += 1;
            }
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(class, _)| *class)
        .collect();
    let mut order: Vec<&str> = Vec::with_capacity(rules.len());
    let mut visited: BTreeSet<&str> = BTreeSet::new();

    loop {
        let next = match ready.pop_first() {
            Some(class) => class,
            // Only cycles remain
            None => match in_degree.keys().find(|c| !visited.contains(*c)) {
                Some(class) => *class,
                None => break,
            },
        };
        if !visited.insert(next) {
            continue;
        }
        order.push(next);
        for alias in rules[next].alias.iter().filter(|a| a.as_str() != next) {
            if let Some(degree) = in_degree.get_mut(alias.as_str()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 && !visited.contains(alias.as_str()) {
                    ready.insert(alias.as_str());
                }
            }
        }
    }

    let mut resolved = rules.clone();
    for class in order {
        let source = resolved[class].clone();
        for alias in source.alias.iter().filter(|a| a.as_str() != class) {
            match resolved.get_mut(alias) {
                Some(existing) => existing.merge_from(&source),
                None => {
                    let synthesized = source.synthesize_alias(class, alias);
                    resolved.insert(alias.clone(), synthesized);
                }
            }
        }
    }
    resolved
}

/// Registry of resolved entities.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<String, Arc<Entity>>,
    include_unknown: bool,
    all_as_json: bool,
    request_cache: Mutex<HashMap<String, Arc<RequestArguments>>>,
}

impl EntityRegistry {
    /// Build a registry from configured rules.
    pub fn new(rules: &BTreeMap<String, EntityRule>) -> Self {
        let entities = resolve_aliases(rules)
            .iter()
            .map(|(class, rule)| (class.clone(), Arc::new(Entity::compile(class, rule))))
            .collect();
        Self {
            entities,
            ..Default::default()
        }
    }

    /// Also persist classes without a rule, as JSON.
    pub fn with_unknown_entities(mut self, include: bool) -> Self {
        self.include_unknown = include;
        self
    }

    /// Render every record as JSON, in addition to its field files.
    pub fn with_all_as_json(mut self, all: bool) -> Self {
        self.all_as_json = all;
        self
    }

    pub fn includes_unknown(&self) -> bool {
        self.include_unknown
    }

    pub fn all_as_json(&self) -> bool {
        self.all_as_json
    }

    /// Resolved entity for a class.
    pub fn get_entity(&self, class_name: &str) -> Option<Arc<Entity>> {
        if class_name.is_empty() {
            return None;
        }
        self.entities.get(class_name).cloned()
    }

    /// Whether records of the class are persisted at all.
    pub fn has_entity(&self, class_name: &str) -> bool {
        !class_name.is_empty() && (self.include_unknown || self.entities.contains_key(class_name))
    }

    /// Whether the class has a rule of its own.
    pub fn load_entity(&self, class_name: &str) -> bool {
        self.entities.contains_key(class_name)
    }

    /// Whether records of the class are rendered as JSON.
    pub fn load_json(&self, class_name: &str) -> bool {
        match self.entities.get(class_name) {
            Some(entity) => self.all_as_json || entity.json,
            None => self.include_unknown && !class_name.is_empty(),
        }
    }

    /// Classes with a rule, in name order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Match a record against its class rule and inclusion filter.
    pub fn classify(&self, record: &Record) -> Classification {
        let entity = self.get_entity(record.class_name());
        let passes_filter = entity.as_ref().is_some_and(|e| e.includes(record));
        Classification {
            entity,
            passes_filter,
        }
    }

    /// Fields to request when fetching records of a class.
    ///
    /// Computed once per class and memoized.
    pub fn request_arguments(&self, class_name: &str) -> Arc<RequestArguments> {
        let Some(entity) = self.entities.get(class_name) else {
            return Arc::new(RequestArguments {
                class_name: class_name.to_string(),
                field_names: Vec::new(),
                display_value: false,
                query_field_names: Vec::new(),
            });
        };

        let mut cache = self
            .request_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache
            .entry(class_name.to_string())
            .or_insert_with(|| Arc::new(compile_request_arguments(entity)))
            .clone()
    }
}

fn compile_request_arguments(entity: &Entity) -> RequestArguments {
    let query_field_names = entity
        .filter()
        .map(|q| q.field_names())
        .unwrap_or_default();

    let mut elements: Vec<&str> = DEFAULT_FIELDS.to_vec();
    elements.extend(entity.key.as_deref());
    elements.extend(entity.sub_dir_pattern.as_deref());
    elements.extend(entity.fields.keys().map(String::as_str));
    elements.extend(query_field_names.iter().map(String::as_str));

    let mut seen = BTreeSet::new();
    let mut field_names: Vec<FieldRef> = Vec::new();
    for element in elements.into_iter().filter(|e| !e.is_empty()) {
        if !seen.insert(element) {
            continue;
        }
        for field in parse_fields(element) {
            if !field_names.contains(&field) {
                field_names.push(field);
            }
        }
    }

    RequestArguments {
        class_name: entity.class_name.clone(),
        display_value: field_names.iter().any(|f| f.display_value),
        field_names,
        query_field_names,
    }
}
