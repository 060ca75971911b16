//! Interned identifiers, used for function, variable and symbol names: a
//! cheap, `Copy` handle into a process-global string interner so that
//! repeated name comparisons during analysis are pointer/index comparisons
//! rather than string comparisons.

use std::fmt;
use std::sync::Mutex;
use string_interner::{DefaultSymbol, StringInterner};

lazy_static::lazy_static! {
    static ref INTERNER: Mutex<StringInterner> = Mutex::new(StringInterner::default());
}

/// An interned name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(DefaultSymbol);

impl Id {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        let mut interner = INTERNER.lock().unwrap();
        Id(interner.get_or_intern(name.as_ref()))
    }

    pub fn as_str(&self) -> String {
        let interner = INTERNER.lock().unwrap();
        interner
            .resolve(self.0)
            .expect("Id resolved to a symbol not present in the interner")
            .to_string()
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::new(value)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::new(value)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({:?})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_interner() {
        let a = Id::new("foo");
        let b = Id::new("foo");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "foo");
    }

    #[test]
    fn distinct_strings_are_distinct_ids() {
        assert_ne!(Id::new("x"), Id::new("y"));
    }
}
