use std::fmt;

/// The language's simple types.
///
/// There is exactly one value of each type, so type equality is plain enum
/// equality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleType {
    Integer,
    Char,
    Boolean,
    /// Accepted by polymorphic operators; both operands must then agree with
    /// each other.
    Any,
    /// The result of a procedure.
    Void,
}

impl SimpleType {
    pub const ALL: &[SimpleType] = &[
        SimpleType::Integer,
        SimpleType::Char,
        SimpleType::Boolean,
        SimpleType::Any,
        SimpleType::Void,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            SimpleType::Integer => "Integer",
            SimpleType::Char => "Char",
            SimpleType::Boolean => "Boolean",
            SimpleType::Any => "Any",
            SimpleType::Void => "Void",
        }
    }

    /// Number of machine words a value of this type occupies.
    pub const fn size(self) -> u8 {
        match self {
            SimpleType::Integer | SimpleType::Char | SimpleType::Boolean => 1,
            SimpleType::Any | SimpleType::Void => 0,
        }
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        let sizes: Vec<_> = SimpleType::ALL.iter().map(|t| t.size()).collect();
        assert_eq!(sizes, [1, 1, 1, 0, 0]);
    }
}
