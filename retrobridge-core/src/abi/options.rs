//! Core option definitions (SET_CORE_OPTIONS / SET_CORE_OPTIONS_INTL).

use core::ffi::c_char;
use core::ptr;

/// `RETRO_NUM_CORE_OPTION_VALUES_MAX`
pub const NUM_CORE_OPTION_VALUES_MAX: usize = 128;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CoreOptionValue {
    pub value: *const c_char,
    /// Null means "display `value`".
    pub label: *const c_char,
}

impl CoreOptionValue {
    pub const EMPTY: Self = Self {
        value: ptr::null(),
        label: ptr::null(),
    };
}

/// The inline value table of a [`CoreOptionDefinition`].
///
/// The list ends at the first entry whose `value` is null, or at the end of the table.
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub struct CoreOptionValues([CoreOptionValue; NUM_CORE_OPTION_VALUES_MAX]);

impl CoreOptionValues {
    pub const fn new() -> Self {
        Self([CoreOptionValue::EMPTY; NUM_CORE_OPTION_VALUES_MAX])
    }

    /// Bounds-checked access; `None` past the table or past the terminator.
    pub fn get(&self, index: usize) -> Option<&CoreOptionValue> {
        self.iter().nth(index)
    }

    /// Bounds-checked write. Returns `false` when `index` is outside the table.
    pub fn set(&mut self, index: usize, value: CoreOptionValue) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Entries up to the terminator.
    pub fn iter(&self) -> impl Iterator<Item = &CoreOptionValue> {
        self.0.iter().take_while(|v| !v.value.is_null())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0[0].value.is_null()
    }
}

impl Default for CoreOptionValues {
    fn default() -> Self {
        Self::new()
    }
}

/// An array of these is terminated by an entry whose `key` is null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CoreOptionDefinition {
    pub key: *const c_char,
    pub desc: *const c_char,
    pub info: *const c_char,
    pub values: CoreOptionValues,
    /// Null means "first value".
    pub default_value: *const c_char,
}

impl CoreOptionDefinition {
    pub const TERMINATOR: Self = Self {
        key: ptr::null(),
        desc: ptr::null(),
        info: ptr::null(),
        values: CoreOptionValues::new(),
        default_value: ptr::null(),
    };
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CoreOptionsIntl {
    /// Required English definitions.
    pub us: *const CoreOptionDefinition,
    /// Optional localized overrides, may be null.
    pub local: *const CoreOptionDefinition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_table_stops_at_terminator() {
        let mut values = CoreOptionValues::new();
        assert!(values.is_empty());
        assert!(values.set(0, CoreOptionValue { value: c"on".as_ptr(), label: ptr::null() }));
        assert!(values.set(1, CoreOptionValue { value: c"off".as_ptr(), label: ptr::null() }));
        assert!(values.set(3, CoreOptionValue { value: c"hidden".as_ptr(), label: ptr::null() }));
        assert_eq!(values.len(), 2);
        assert!(values.get(2).is_none());
    }

    #[test]
    fn value_table_is_bounds_checked() {
        let mut values = CoreOptionValues::new();
        assert!(!values.set(NUM_CORE_OPTION_VALUES_MAX, CoreOptionValue::EMPTY));
        assert!(values.get(NUM_CORE_OPTION_VALUES_MAX + 5).is_none());
    }
}
