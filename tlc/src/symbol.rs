use std::fmt;

use once_cell::sync::Lazy;

static INTERNER: Lazy<lasso::ThreadedRodeo> = Lazy::new(lasso::ThreadedRodeo::new);

/// An interned string.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(lasso::Spur);

impl Symbol {
    pub fn intern(sym: impl AsRef<str>) -> Self {
        Self(INTERNER.get_or_intern(sym))
    }

    pub fn intern_static(sym: &'static str) -> Self {
        Self(INTERNER.get_or_intern_static(sym))
    }

    pub fn resolve(&self) -> &'static str {
        INTERNER.resolve(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.resolve()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolve())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let first = Symbol::intern("inputPeerUser");
        let second = Symbol::intern(String::from("inputPeerUser"));
        assert_eq!(first, second);
        assert_eq!(first.resolve(), "inputPeerUser");
    }
}
