//! Project key allocation
//!
//! JIRA identifies projects by a short uppercase key. Keys are derived from
//! the GitLab project name and must be unique for the whole run, so every
//! key handed out is remembered in a [`KeyRegistry`] owned by the caller.

use std::collections::{BTreeMap, HashSet};

/// Error type for key allocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Every single-letter suffix `A`..=`Z` is already taken for this base.
    #[error("no free project key left for base '{base}' (suffixes A-Z are all taken)")]
    SuffixExhausted { base: String },
}

/// Keys issued during one export run
///
/// The registry only grows. Once a key is issued it is never reissued for a
/// different project.
#[derive(Debug, Default, Clone)]
pub struct KeyRegistry {
    issued: HashSet<String>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the key has already been issued or claimed
    pub fn contains(&self, key: &str) -> bool {
        self.issued.contains(key)
    }

    /// Number of distinct keys issued or claimed so far
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Record a key chosen outside the allocator.
    ///
    /// Claimed keys are not collision-checked: several GitLab projects may be
    /// deliberately merged into the same JIRA project. Later calls to
    /// [`KeyRegistry::allocate`] will steer clear of them.
    pub fn claim(&mut self, key: &str) {
        self.issued.insert(key.to_string());
    }

    /// Derive a unique project key from a project name and record it.
    ///
    /// # Arguments
    /// * `name` - GitLab project name, as displayed
    ///
    /// # Returns
    /// The issued key. Names with fewer than two ASCII letters yield a key
    /// shorter than two characters; that is accepted.
    pub fn allocate(&mut self, name: &str) -> Result<String, KeyError> {
        let base = candidate_key(name);
        let key = self.resolve_collision(base)?;
        self.issued.insert(key.clone());
        Ok(key)
    }

    fn resolve_collision(&self, base: String) -> Result<String, KeyError> {
        if !self.contains(&base) {
            return Ok(base);
        }

        let mut suffix = b'A';
        loop {
            let key = format!("{base}{}", char::from(suffix));
            if !self.contains(&key) {
                return Ok(key);
            }
            if suffix == b'Z' {
                return Err(KeyError::SuffixExhausted { base });
            }
            suffix += 1;
        }
    }
}

/// Compute the key a name reduces to, before collision resolution.
///
/// All-lowercase names are title-cased first so that each word contributes
/// an uppercase letter. If fewer than two uppercase letters remain, the first
/// two letters of the original name are used instead.
pub fn candidate_key(name: &str) -> String {
    let normalized = if is_all_lowercase(name) {
        title_case(name)
    } else {
        name.to_string()
    };

    let key: String = normalized
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .collect();

    if key.len() >= 2 {
        return key;
    }

    name.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(2)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// At least one cased character and none of them uppercase.
fn is_all_lowercase(name: &str) -> bool {
    let mut has_cased = false;
    for c in name.chars() {
        if c.is_uppercase() {
            return false;
        }
        if c.is_lowercase() {
            has_cased = true;
        }
    }
    has_cased
}

/// Uppercase every letter that starts a word, lowercase the rest.
fn title_case(name: &str) -> String {
    let mut output = String::with_capacity(name.len());
    let mut in_word = false;

    for c in name.chars() {
        if c.is_alphabetic() {
            if in_word {
                output.extend(c.to_lowercase());
            } else {
                output.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            output.push(c);
            in_word = false;
        }
    }

    output
}

/// Resolves the JIRA project key for each GitLab project of a run
///
/// Priority: a default JIRA project shared by every project, then an
/// explicit name map, then [`KeyRegistry::allocate`].
#[derive(Debug, Default, Clone)]
pub struct ProjectKeys {
    default_project: Option<String>,
    project_map: BTreeMap<String, String>,
    registry: KeyRegistry,
}

impl ProjectKeys {
    pub fn new(default_project: Option<String>, project_map: BTreeMap<String, String>) -> Self {
        Self {
            default_project,
            project_map,
            registry: KeyRegistry::new(),
        }
    }

    pub fn key_for(&mut self, project_name: &str) -> Result<String, KeyError> {
        if let Some(default) = &self.default_project {
            self.registry.claim(default);
            return Ok(default.clone());
        }

        if let Some(mapped) = self.project_map.get(project_name) {
            self.registry.claim(mapped);
            return Ok(mapped.clone());
        }

        self.registry.allocate(project_name)
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }
}
