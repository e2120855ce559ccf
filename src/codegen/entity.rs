use crate::codegen::{
    tam::{OpCode, Register},
    target::Instruction,
};

/// Where a declared constant or variable lives at run time.
///
/// Offsets are relative to [`Register::SB`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RuntimeEntity {
    /// A constant whose value is known while compiling. It takes no memory.
    KnownConstant { value: i16 },
    UnknownConstant { offset: i16, size: u8 },
    Variable { offset: i16, size: u8 },
}

impl RuntimeEntity {
    /// Pushes the entity's value.
    pub fn load(self) -> Instruction {
        match self {
            RuntimeEntity::KnownConstant { value } => Instruction::load_literal(value),
            RuntimeEntity::UnknownConstant { offset, size }
            | RuntimeEntity::Variable { offset, size } => {
                Instruction::new(OpCode::LOAD, Register::SB, size, offset)
            }
        }
    }

    /// Pushes the entity's address. Only variables have one.
    pub fn load_address(self) -> Option<Instruction> {
        match self {
            RuntimeEntity::Variable { offset, .. } => {
                Some(Instruction::new(OpCode::LOADA, Register::SB, 0, offset))
            }
            _ => None,
        }
    }

    /// Pops the top of the stack into the entity. Only variables may be
    /// stored to.
    pub fn store(self) -> Option<Instruction> {
        match self {
            RuntimeEntity::Variable { offset, size } => {
                Some(Instruction::new(OpCode::STORE, Register::SB, size, offset))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions() {
        let var = RuntimeEntity::Variable { offset: 2, size: 1 };
        assert_eq!(var.load().to_string(), "LOAD   1 SB+2");
        assert_eq!(var.load_address().map(|i| i.to_string()).as_deref(), Some("LOADA  SB+2"));
        assert_eq!(var.store().map(|i| i.to_string()).as_deref(), Some("STORE  1 SB+2"));

        let known = RuntimeEntity::KnownConstant { value: 65 };
        assert_eq!(known.load().to_string(), "LOADL  65");
        assert_eq!(known.store(), None);

        let unknown = RuntimeEntity::UnknownConstant { offset: 0, size: 1 };
        assert_eq!(unknown.load().to_string(), "LOAD   1 SB+0");
        assert_eq!(unknown.load_address(), None);
    }
}
