//! Core options: the key-value configuration a core declares and queries.
//!
//! Responsibilities:
//! - Parse declarations from SET_VARIABLES (legacy `"Description; a|b|c"` strings), from
//!   SET_CORE_OPTIONS (v1 definitions) and SET_CORE_OPTIONS_INTL (English plus localized
//!   overrides).
//! - Keep the selected value of every option as a stable C string for GET_VARIABLE.
//! - Track changes for GET_VARIABLE_UPDATE and visibility for SET_CORE_OPTIONS_DISPLAY.
//! - Persist user selections as JSON.

use std::collections::{BTreeMap, HashMap};
use std::ffi::{CStr, CString};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::abi::options::{CoreOptionDefinition, CoreOptionsIntl};
use crate::abi::{ptr, Variable};
use crate::error::ConfigError;

/// One selectable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    pub value: String,
    pub label: Option<String>,
}

impl OptionValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    pub fn display(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

/// A declared option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreOption {
    pub key: String,
    pub description: String,
    pub info: Option<String>,
    pub values: Vec<OptionValue>,
    pub default: String,
    pub visible: bool,
}

impl CoreOption {
    pub fn accepts(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.value == value)
    }

    /// Parse a legacy SET_VARIABLES value string: `"Description; first|second|third"`.
    ///
    /// The first value is the default.
    pub fn parse_legacy(key: &str, spec: &str) -> Option<Self> {
        let (description, list) = spec.split_once("; ")?;
        let values: Vec<OptionValue> = list
            .split('|')
            .filter(|v| !v.is_empty())
            .map(OptionValue::new)
            .collect();
        let default = values.first()?.value.clone();
        Some(Self {
            key: key.to_string(),
            description: description.to_string(),
            info: None,
            values,
            default,
            visible: true,
        })
    }
}

/// Key-value configuration served to the core through GET_VARIABLE.
pub trait CoreOptions: Send {
    /// Replace the declared option set.
    fn declare(&mut self, options: Vec<CoreOption>);

    /// Declared options, in declaration order.
    fn options(&self) -> &[CoreOption];

    /// Select `value` for `key`. Returns `false` if the value is not offered.
    fn set(&mut self, key: &str, value: &str) -> bool;

    /// SET_CORE_OPTIONS_DISPLAY.
    fn set_visible(&mut self, key: &str, visible: bool);

    /// Current value of `key`. The returned string stays valid until the value changes.
    fn value(&self, key: &str) -> Option<&CStr>;

    /// Whether any value changed since the last call. Clears the flag.
    fn take_updated(&mut self) -> bool;
}

/// Default [`CoreOptions`] implementation.
///
/// Selections made before the core declares its options (from host configuration or a
/// persisted JSON file) are kept as pending and applied when a matching option appears.
#[derive(Debug, Default)]
pub struct OptionTable {
    options: Vec<CoreOption>,
    index: HashMap<String, usize>,
    selected: HashMap<String, CString>,
    pending: BTreeMap<String, String>,
    updated: bool,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with preseeded selections.
    pub fn with_selections(selections: BTreeMap<String, String>) -> Self {
        Self {
            pending: selections,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &[CoreOption] {
        &self.options
    }

    pub fn get(&self, key: &str) -> Option<&CoreOption> {
        self.index.get(key).map(|&i| &self.options[i])
    }

    /// Selected value as UTF-8.
    pub fn selected(&self, key: &str) -> Option<&str> {
        self.selected.get(key).and_then(|v| v.to_str().ok())
    }

    /// Change a selection. Unknown keys are kept pending; invalid values are refused.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let Some(option) = self.get(key) else {
            self.pending.insert(key.to_string(), value.to_string());
            return true;
        };
        if !option.accepts(value) {
            warn!(key, value, "rejected core option value");
            return false;
        }
        let Ok(c_value) = CString::new(value) else {
            return false;
        };
        if self.selected.get(key).map(|v| v.as_c_str()) != Some(c_value.as_c_str()) {
            self.selected.insert(key.to_string(), c_value);
            self.updated = true;
        }
        true
    }

    /// Current selections of every declared option plus pending ones.
    pub fn selections(&self) -> BTreeMap<String, String> {
        let mut out = self.pending.clone();
        for option in &self.options {
            if let Some(value) = self.selected(&option.key) {
                out.insert(option.key.clone(), value.to_string());
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.selections())?)
    }

    /// Apply selections from JSON produced by [`Self::to_json`].
    pub fn apply_json(&mut self, json: &str) -> Result<(), ConfigError> {
        let selections: BTreeMap<String, String> = serde_json::from_str(json)?;
        for (key, value) in selections {
            self.set(&key, &value);
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(&mut self, path: &Path) -> Result<(), ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_json(&json)
    }

    fn initial_value(&mut self, option: &CoreOption) -> String {
        match self.pending.remove(&option.key) {
            Some(v) if option.accepts(&v) => v,
            Some(v) => {
                warn!(key = %option.key, value = %v, "stored core option value no longer offered");
                option.default.clone()
            }
            None => option.default.clone(),
        }
    }
}

impl CoreOptions for OptionTable {
    fn declare(&mut self, options: Vec<CoreOption>) {
        // Keep what the user picked for options that survive a re-declaration.
        for (key, value) in self.selected.drain() {
            if let Ok(value) = value.into_string() {
                self.pending.entry(key).or_insert(value);
            }
        }
        self.index.clear();
        self.options.clear();

        for option in options {
            if self.index.contains_key(&option.key) {
                warn!(key = %option.key, "duplicate core option ignored");
                continue;
            }
            let value = self.initial_value(&option);
            match CString::new(value) {
                Ok(c_value) => {
                    self.selected.insert(option.key.clone(), c_value);
                }
                Err(_) => {
                    warn!(key = %option.key, "core option value contains NUL");
                    continue;
                }
            }
            self.index.insert(option.key.clone(), self.options.len());
            self.options.push(option);
        }
        debug!(count = self.options.len(), "core options declared");
        self.updated = true;
    }

    fn options(&self) -> &[CoreOption] {
        OptionTable::options(self)
    }

    fn set(&mut self, key: &str, value: &str) -> bool {
        OptionTable::set(self, key, value)
    }

    fn set_visible(&mut self, key: &str, visible: bool) {
        if let Some(&i) = self.index.get(key) {
            self.options[i].visible = visible;
        }
    }

    fn value(&self, key: &str) -> Option<&CStr> {
        self.selected.get(key).map(|v| v.as_c_str())
    }

    fn take_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }
}

/// Read a SET_VARIABLES array (terminated by a null key).
///
/// # Safety
/// `vars` must be null or a valid terminated array of [`Variable`].
pub unsafe fn parse_variables(vars: *const Variable) -> Vec<CoreOption> {
    let vars = unsafe { ptr::terminated(vars, |v| v.key.is_null()) };
    vars.iter()
        .filter_map(|v| {
            let key = unsafe { ptr::c_str(v.key) }?;
            let spec = unsafe { ptr::c_str(v.value) }.unwrap_or_default();
            let parsed = CoreOption::parse_legacy(&key, &spec);
            if parsed.is_none() {
                warn!(key = %key, spec = %spec, "malformed core variable declaration");
            }
            parsed
        })
        .collect()
}

/// Read a SET_CORE_OPTIONS array (terminated by a null key).
///
/// # Safety
/// `defs` must be null or a valid terminated array of [`CoreOptionDefinition`].
pub unsafe fn parse_definitions(defs: *const CoreOptionDefinition) -> Vec<CoreOption> {
    let defs = unsafe { ptr::terminated(defs, |d| d.key.is_null()) };
    defs.iter()
        .filter_map(|d| unsafe { parse_definition(d) })
        .collect()
}

unsafe fn parse_definition(def: &CoreOptionDefinition) -> Option<CoreOption> {
    let key = unsafe { ptr::c_string(def.key) }?;
    let values: Vec<OptionValue> = def
        .values
        .iter()
        .filter_map(|v| {
            Some(OptionValue {
                value: unsafe { ptr::c_string(v.value) }?,
                label: unsafe { ptr::c_string(v.label) },
            })
        })
        .collect();
    if values.is_empty() {
        warn!(key = %key, "core option without values ignored");
        return None;
    }

    let default = unsafe { ptr::c_string(def.default_value) }
        .filter(|d| values.iter().any(|v| &v.value == d))
        .unwrap_or_else(|| values[0].value.clone());

    Some(CoreOption {
        description: unsafe { ptr::c_string(def.desc) }.unwrap_or_else(|| key.clone()),
        info: unsafe { ptr::c_string(def.info) },
        key,
        values,
        default,
        visible: true,
    })
}

/// Read a SET_CORE_OPTIONS_INTL payload, overlaying localized text on the English set.
///
/// # Safety
/// Both arrays must be null or valid terminated arrays.
pub unsafe fn parse_intl(intl: &CoreOptionsIntl) -> Vec<CoreOption> {
    let mut options = unsafe { parse_definitions(intl.us) };
    let local = unsafe { parse_definitions(intl.local) };

    for localized in local {
        let Some(option) = options.iter_mut().find(|o| o.key == localized.key) else {
            continue;
        };
        option.description = localized.description;
        if localized.info.is_some() {
            option.info = localized.info;
        }
        for value in &mut option.values {
            if let Some(l) = localized.values.iter().find(|l| l.value == value.value) {
                if l.label.is_some() {
                    value.label = l.label.clone();
                }
            }
        }
    }
    options
}
