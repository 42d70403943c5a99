//! Diff computation between two property maps
//!
//! [`Differ`] walks old and new maps recursively and produces a
//! [`DiffResult`]: an overall [`Changes`] flag, a detailed map keyed by
//! rendered [`PropertyPath`], and the list of top-level fields whose change
//! forces a replacement.
//!
//! Comparison rules:
//!
//! - a missing key and an explicit `null` are the same thing
//! - secrecy is ignored, `Secret("x")` equals `"x"`
//! - an unknown value always counts as a change
//! - arrays compare element by element; extra elements are adds or deletes

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::PropertyPath;
use crate::resource::INPUTS_KEY;
use crate::value::{PropertyMap, Value};

/// Kind of change at one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Add,
    AddReplace,
    Delete,
    DeleteReplace,
    Update,
    UpdateReplace,
}

impl DiffKind {
    /// The replace-tagged counterpart of this kind
    #[must_use]
    pub const fn as_replace(self) -> Self {
        match self {
            Self::Add | Self::AddReplace => Self::AddReplace,
            Self::Delete | Self::DeleteReplace => Self::DeleteReplace,
            Self::Update | Self::UpdateReplace => Self::UpdateReplace,
        }
    }

    pub const fn is_replace(self) -> bool {
        matches!(
            self,
            Self::AddReplace | Self::DeleteReplace | Self::UpdateReplace
        )
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::AddReplace => "add-replace",
            Self::Delete => "delete",
            Self::DeleteReplace => "delete-replace",
            Self::Update => "update",
            Self::UpdateReplace => "update-replace",
        };
        write!(f, "{s}")
    }
}

/// Overall classification of a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Changes {
    #[default]
    None,
    Some,
}

/// Result of diffing a resource's old and new properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub changes: Changes,
    /// Rendered property path to change kind
    #[serde(default)]
    pub detailed_diff: BTreeMap<String, DiffKind>,
    /// Top-level fields whose change forces a replacement
    #[serde(default)]
    pub replaces: Vec<String>,
    #[serde(default)]
    pub delete_before_replace: bool,
}

impl DiffResult {
    /// A diff with no changes
    pub fn none() -> Self {
        Self::default()
    }

    /// Key-level diff where every listed field forces a replacement
    ///
    /// Used by resources that only report which fields changed.
    pub fn replacing(keys: Vec<String>, delete_before_replace: bool) -> Self {
        let changes = if keys.is_empty() {
            Changes::None
        } else {
            Changes::Some
        };
        Self {
            changes,
            detailed_diff: BTreeMap::new(),
            replaces: keys,
            delete_before_replace,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.changes == Changes::Some
    }

    /// Whether any change requires a replacement
    pub fn requires_replace(&self) -> bool {
        !self.replaces.is_empty() || self.detailed_diff.values().any(|k| k.is_replace())
    }
}

/// Fields whose change forces a replacement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReplaceSet {
    /// No change forces a replacement
    #[default]
    Nothing,
    /// Changes at or below these rendered paths force a replacement
    Paths(BTreeSet<String>),
    /// Every change forces a replacement
    Everything,
}

impl ReplaceSet {
    pub fn of<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Paths(paths.into_iter().map(Into::into).collect())
    }

    /// Whether a change at this path is promoted to a replacement
    pub fn matches(&self, path: &PropertyPath) -> bool {
        match self {
            Self::Nothing => false,
            Self::Everything => true,
            Self::Paths(paths) => path.prefixes().any(|p| paths.contains(&p)),
        }
    }
}

/// When the old resource must be deleted before its replacement is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteBeforeReplace {
    /// Always set, whether or not the diff replaces
    #[default]
    Always,
    /// Set only when some change forces a replacement
    WhenReplacing,
    Never,
}

/// Configurable diff engine
#[derive(Debug, Clone)]
pub struct Differ {
    replace: ReplaceSet,
    report_replaces: bool,
    delete_before_replace: DeleteBeforeReplace,
}

impl Default for Differ {
    fn default() -> Self {
        Self::new(ReplaceSet::Nothing)
    }
}

impl Differ {
    pub const fn new(replace: ReplaceSet) -> Self {
        Self {
            replace,
            report_replaces: true,
            delete_before_replace: DeleteBeforeReplace::Always,
        }
    }

    /// Engine where every change forces a replacement
    pub const fn replace_on_any_change() -> Self {
        Self::new(ReplaceSet::Everything)
    }

    /// Leave [`DiffResult::replaces`] empty; replace kinds still appear in
    /// the detailed diff
    #[must_use]
    pub fn without_replace_list(mut self) -> Self {
        self.report_replaces = false;
        self
    }

    #[must_use]
    pub fn delete_before_replace(mut self, policy: DeleteBeforeReplace) -> Self {
        self.delete_before_replace = policy;
        self
    }

    /// Diff two maps
    pub fn diff(&self, olds: &PropertyMap, news: &PropertyMap) -> DiffResult {
        let mut detailed = BTreeMap::new();
        diff_maps(&PropertyPath::default(), olds, news, &mut detailed);

        let mut replaces = BTreeSet::new();
        let detailed_diff: BTreeMap<String, DiffKind> = detailed
            .into_iter()
            .map(|(path, kind)| {
                let kind = if self.replace.matches(&path) {
                    kind.as_replace()
                } else {
                    kind
                };
                if kind.is_replace()
                    && let Some(root) = path.root_key()
                {
                    replaces.insert(root.to_string());
                }
                (path.to_string(), kind)
            })
            .collect();

        let replacing = !replaces.is_empty();
        let delete_before_replace = match self.delete_before_replace {
            DeleteBeforeReplace::Always => true,
            DeleteBeforeReplace::WhenReplacing => replacing,
            DeleteBeforeReplace::Never => false,
        };
        let changes = if detailed_diff.is_empty() {
            Changes::None
        } else {
            Changes::Some
        };

        DiffResult {
            changes,
            detailed_diff,
            replaces: if self.report_replaces {
                replaces.into_iter().collect()
            } else {
                Vec::new()
            },
            delete_before_replace,
        }
    }
}

fn diff_maps(
    path: &PropertyPath,
    olds: &PropertyMap,
    news: &PropertyMap,
    out: &mut BTreeMap<PropertyPath, DiffKind>,
) {
    let keys: BTreeSet<&str> = olds.keys().chain(news.keys()).collect();
    for key in keys {
        diff_values(
            &path.key(key),
            olds.get(key).unwrap_or(&Value::Null),
            news.get(key).unwrap_or(&Value::Null),
            out,
        );
    }
}

fn diff_values(
    path: &PropertyPath,
    old: &Value,
    new: &Value,
    out: &mut BTreeMap<PropertyPath, DiffKind>,
) {
    if old.is_unknown() || new.is_unknown() {
        out.insert(path.clone(), DiffKind::Update);
        return;
    }
    match (old.has_value(), new.has_value()) {
        (false, false) => {}
        (false, true) => {
            out.insert(path.clone(), DiffKind::Add);
        }
        (true, false) => {
            out.insert(path.clone(), DiffKind::Delete);
        }
        (true, true) => diff_present(path, old, new, out),
    }
}

fn diff_present(
    path: &PropertyPath,
    old: &Value,
    new: &Value,
    out: &mut BTreeMap<PropertyPath, DiffKind>,
) {
    match (old.unwrap_secret(), new.unwrap_secret()) {
        (Value::Object(o), Value::Object(n)) => diff_maps(path, o, n, out),
        (Value::Array(o), Value::Array(n)) => {
            for i in 0..o.len().max(n.len()) {
                match (o.get(i), n.get(i)) {
                    (Some(a), Some(b)) => diff_values(&path.index(i), a, b, out),
                    (None, Some(_)) => {
                        out.insert(path.index(i), DiffKind::Add);
                    }
                    (Some(_), None) => {
                        out.insert(path.index(i), DiffKind::Delete);
                    }
                    (None, None) => {}
                }
            }
        }
        (o, n) => {
            if o != n {
                out.insert(path.clone(), DiffKind::Update);
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Diff with the given replace fields and delete-before-replace always set
pub fn standard_diff(olds: &PropertyMap, news: &PropertyMap, replace: &[&str]) -> DiffResult {
    Differ::new(ReplaceSet::of(replace.iter().copied())).diff(olds, news)
}

/// The declared inputs recorded under `__inputs` in a state map
pub fn recorded_inputs(state: &PropertyMap) -> Result<PropertyMap> {
    state
        .get_object(INPUTS_KEY)
        .cloned()
        .ok_or_else(|| Error::InvalidInput(format!("missing {INPUTS_KEY} property")))
}

/// Lift legacy `__inputs` out of a state map, or return it unchanged
pub fn lift_inputs(state: &PropertyMap) -> PropertyMap {
    state
        .get_object(INPUTS_KEY)
        .cloned()
        .unwrap_or_else(|| state.clone())
}

/// Top-level keys whose values differ, in key order
pub fn changed_keys(olds: &PropertyMap, news: &PropertyMap) -> Vec<String> {
    let mut detailed = BTreeMap::new();
    diff_maps(&PropertyPath::default(), olds, news, &mut detailed);
    let keys: BTreeSet<&str> = detailed.keys().filter_map(PropertyPath::root_key).collect();
    keys.into_iter().map(str::to_string).collect()
}

/// Sort an array field in place so element order never shows up as a change
pub fn normalize_array<F>(map: &mut PropertyMap, key: &str, compare: F)
where
    F: FnMut(&Value, &Value) -> Ordering,
{
    if let Some(value) = map.get_mut(key) {
        value.sort_array_by(compare);
    }
}

/// Compare values by the string at `field`, then by their rendered form
pub fn by_field(field: &'static str) -> impl FnMut(&Value, &Value) -> Ordering {
    move |a, b| {
        let key = |v: &Value| v.as_object().and_then(|m| m.get_str(field)).map(str::to_string);
        key(a)
            .cmp(&key(b))
            .then_with(|| a.to_string().cmp(&b.to_string()))
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub deletions: usize,
    pub updates: usize,
    /// Entries of any kind that force a replacement
    pub replacements: usize,
}

impl DiffSummary {
    pub fn from_result(result: &DiffResult) -> Self {
        let mut summary = Self::default();
        for kind in result.detailed_diff.values() {
            match kind {
                DiffKind::Add | DiffKind::AddReplace => summary.additions += 1,
                DiffKind::Delete | DiffKind::DeleteReplace => summary.deletions += 1,
                DiffKind::Update | DiffKind::UpdateReplace => summary.updates += 1,
            }
            if kind.is_replace() {
                summary.replacements += 1;
            }
        }
        summary
    }

    pub const fn total(&self) -> usize {
        self.additions + self.deletions + self.updates
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} deleted, {} updated",
            self.additions, self.deletions, self.updates
        )?;
        if self.replacements > 0 {
            write!(f, " ({} forcing replacement)", self.replacements)?;
        }
        Ok(())
    }
}
