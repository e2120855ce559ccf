use std::fmt;

use tracing::trace;

use crate::codegen::{
    tam::{OpCode, Primitive, Register, CODE_BASE, TRUE},
    Error,
};

/// A code address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(i16);

impl Address {
    pub const fn new(value: i16) -> Address {
        Address(value)
    }

    pub const fn value(self) -> i16 {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A single machine instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub register: Register,
    pub length: u8,
    /// An offset from `register`, or an immediate value.
    pub operand: i16,
}

/// Number of bytes of an encoded instruction.
pub const INSTRUCTION_SIZE: usize = 5;

impl Instruction {
    pub const fn new(op: OpCode, register: Register, length: u8, operand: i16) -> Instruction {
        Instruction {
            op,
            register,
            length,
            operand,
        }
    }

    pub const fn load_literal(value: i16) -> Instruction {
        Instruction::new(OpCode::LOADL, Register::CB, 0, value)
    }

    pub const fn call(primitive: Primitive) -> Instruction {
        Instruction::new(OpCode::CALL, Register::PB, 0, primitive as i16)
    }

    pub const fn push(words: u8) -> Instruction {
        Instruction::new(OpCode::PUSH, Register::CB, 0, words as i16)
    }

    /// Discards `words` words from the top of the stack, keeping none.
    pub const fn pop(words: i16) -> Instruction {
        Instruction::new(OpCode::POP, Register::CB, 0, words)
    }

    pub const fn jump(to: Address) -> Instruction {
        Instruction::new(OpCode::JUMP, Register::CB, 0, to.value())
    }

    /// Jumps if the popped value equals `when`, [`TRUE`](crate::codegen::tam::TRUE)
    /// or [`FALSE`](crate::codegen::tam::FALSE).
    pub const fn jump_if(when: i16, to: Address) -> Instruction {
        Instruction::new(OpCode::JUMPIF, Register::CB, when as u8, to.value())
    }

    pub const fn halt() -> Instruction {
        Instruction::new(OpCode::HALT, Register::CB, 0, 0)
    }

    pub fn is_jump(&self) -> bool {
        matches!(self.op, OpCode::JUMP | OpCode::JUMPIF)
    }

    /// The numeric fields, as `opcode register length operand`.
    pub fn raw(&self) -> String {
        format!(
            "{} {} {} {}",
            self.op as u8, self.register as u8, self.length, self.operand
        )
    }

    /// Encodes as opcode, register and length bytes, followed by the operand
    /// in little-endian order.
    pub fn to_bytes(&self) -> [u8; INSTRUCTION_SIZE] {
        let [lo, hi] = self.operand.to_le_bytes();
        [self.op as u8, self.register as u8, self.length, lo, hi]
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Instruction {
            op,
            register: r,
            length: n,
            operand: d,
        } = *self;
        match op {
            OpCode::LOAD => write!(f, "LOAD   {n} {r}+{d}"),
            OpCode::LOADA => write!(f, "LOADA  {r}+{d}"),
            OpCode::LOADI => write!(f, "LOADI  {n}"),
            OpCode::LOADL => write!(f, "LOADL  {d}"),
            OpCode::STORE => write!(f, "STORE  {n} {r}+{d}"),
            OpCode::STOREI => write!(f, "STOREI {n}"),
            OpCode::CALL => match Primitive::from_value(d) {
                Some(primitive) if r == Register::PB => write!(f, "CALL   {primitive}"),
                _ => write!(f, "CALL   {r}+{d}"),
            },
            OpCode::CALLI => f.write_str("CALLI"),
            OpCode::RETURN => write!(f, "RETURN {n} {d}"),
            OpCode::PUSH => write!(f, "PUSH   {d}"),
            OpCode::POP => write!(f, "POP    {n} {d}"),
            OpCode::JUMP => write!(f, "JUMP   {r}+{d}"),
            OpCode::JUMPI => f.write_str("JUMPI"),
            OpCode::JUMPIF => {
                let when = if i16::from(n) == TRUE { "TRUE" } else { "FALSE" };
                write!(f, "JUMPIF {when} {r}+{d}")
            }
            OpCode::HALT => f.write_str("HALT"),
        }
    }
}

/// A growable sequence of instructions starting at [`CODE_BASE`].
#[derive(Clone, PartialEq, Eq)]
pub struct TargetCode {
    start: Address,
    instructions: Vec<Instruction>,
    limit: usize,
}

impl TargetCode {
    pub fn new() -> TargetCode {
        TargetCode::with_limit((i16::MAX - CODE_BASE) as usize)
    }

    /// Creates an empty code buffer holding at most `limit` instructions.
    ///
    /// # Panics
    ///
    /// If the last instruction wouldn't be addressable.
    pub fn with_limit(limit: usize) -> TargetCode {
        assert!(
            limit <= (i16::MAX - CODE_BASE) as usize,
            "code limit of {limit} instructions isn't addressable"
        );
        TargetCode {
            start: Address::new(CODE_BASE),
            instructions: Vec::with_capacity(limit.min(256)),
            limit,
        }
    }

    /// Address the next emitted instruction will get.
    pub fn next_address(&self) -> Address {
        self.address_of(self.instructions.len())
    }

    pub fn is_full(&self) -> bool {
        self.instructions.len() >= self.limit
    }

    /// Appends an instruction, returning its address.
    pub fn emit(&mut self, instruction: Instruction) -> Result<Address, Error> {
        if self.is_full() {
            return Err(Error::ProgramTooLarge);
        }
        let address = self.next_address();
        trace!("{address:>4}: {instruction}");
        self.instructions.push(instruction);
        Ok(address)
    }

    /// Makes the jump at `at` target the next address.
    ///
    /// # Panics
    ///
    /// If `at` wasn't emitted or isn't a jump.
    #[track_caller]
    pub fn patch(&mut self, at: Address) {
        let here = self.next_address();
        let index = usize::try_from(at.value() - self.start.value())
            .ok()
            .filter(|i| *i < self.instructions.len());
        let Some(index) = index else {
            panic!("can't patch {at}, it isn't part of the program");
        };
        let instruction = &mut self.instructions[index];
        assert!(
            instruction.is_jump(),
            "can't patch {at}, `{instruction}` isn't a jump"
        );
        trace!("patched {at} to jump to {here}");
        instruction.operand = here.value();
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get(&self, at: Address) -> Option<&Instruction> {
        let index = usize::try_from(at.value() - self.start.value()).ok()?;
        self.instructions.get(index)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// One line per instruction: address, mnemonic and raw fields.
    pub fn text(&self) -> String {
        self.to_string()
    }

    pub fn binary(&self) -> Vec<u8> {
        self.instructions
            .iter()
            .flat_map(Instruction::to_bytes)
            .collect()
    }

    fn address_of(&self, index: usize) -> Address {
        let offset = i16::try_from(index).expect("code size is bounded by the limit");
        Address::new(self.start.value() + offset)
    }
}

impl Default for TargetCode {
    fn default() -> Self {
        TargetCode::new()
    }
}

impl fmt::Display for TargetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, instruction) in self.instructions.iter().enumerate() {
            let address = self.address_of(i);
            let mnemonic = instruction.to_string();
            writeln!(f, "{address:>4}: {mnemonic:<20} ({})", instruction.raw())?;
        }
        Ok(())
    }
}

impl fmt::Debug for TargetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.instructions.iter().map(ToString::to_string))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::codegen::tam::FALSE;

    #[test]
    fn mnemonics() {
        let cases = [
            (Instruction::new(OpCode::LOAD, Register::SB, 1, 3), "LOAD   1 SB+3"),
            (Instruction::new(OpCode::LOADA, Register::SB, 0, 2), "LOADA  SB+2"),
            (Instruction::load_literal(-7), "LOADL  -7"),
            (Instruction::new(OpCode::STORE, Register::SB, 1, 0), "STORE  1 SB+0"),
            (Instruction::call(Primitive::PUTINT), "CALL   PUTINT"),
            (Instruction::new(OpCode::CALL, Register::CB, 0, 40), "CALL   CB+40"),
            (Instruction::push(2), "PUSH   2"),
            (Instruction::pop(3), "POP    0 3"),
            (Instruction::jump(Address::new(9)), "JUMP   CB+9"),
            (Instruction::jump_if(TRUE, Address::new(4)), "JUMPIF TRUE CB+4"),
            (Instruction::jump_if(FALSE, Address::new(4)), "JUMPIF FALSE CB+4"),
            (Instruction::halt(), "HALT"),
        ];
        for (instruction, expected) in cases {
            assert_eq!(instruction.to_string(), expected);
        }
    }

    #[test]
    fn encoding() {
        let instruction = Instruction::new(OpCode::LOADL, Register::CB, 0, -2);
        assert_eq!(instruction.raw(), "3 0 0 -2");
        assert_eq!(instruction.to_bytes(), [3, 0, 0, 0xFE, 0xFF]);
        assert_eq!(Instruction::call(Primitive::PUTINT).to_bytes(), [6, 2, 0, 25, 0]);
    }

    #[test]
    fn emit_patch_and_listing() {
        let mut code = TargetCode::new();
        let jump = code.emit(Instruction::jump_if(FALSE, Address::new(0))).unwrap();
        code.emit(Instruction::load_literal(1)).unwrap();
        code.patch(jump);
        code.emit(Instruction::halt()).unwrap();

        assert_eq!(code.get(jump).map(|i| i.operand), Some(2));
        let lines = [
            format!("{:>4}: {:<20} ({})", 0, "JUMPIF FALSE CB+2", "13 0 0 2"),
            format!("{:>4}: {:<20} ({})", 1, "LOADL  1", "3 0 0 1"),
            format!("{:>4}: {:<20} ({})", 2, "HALT", "14 0 0 0"),
        ];
        assert_eq!(code.text(), lines.map(|line| line + "\n").concat());
        assert_eq!(code.text().lines().next(), Some("   0: JUMPIF FALSE CB+2    (13 0 0 2)"));
        assert_eq!(code.binary().len(), 3 * INSTRUCTION_SIZE);
    }

    #[test]
    fn program_too_large() {
        let mut code = TargetCode::with_limit(2);
        assert_eq!(code.emit(Instruction::halt()), Ok(Address::new(0)));
        assert_eq!(code.emit(Instruction::halt()), Ok(Address::new(1)));
        assert!(code.is_full());
        assert_eq!(code.emit(Instruction::halt()), Err(Error::ProgramTooLarge));
        assert_eq!(code.len(), 2);
    }

    #[test]
    #[should_panic = "isn't a jump"]
    fn patching_a_non_jump_panics() {
        let mut code = TargetCode::new();
        let at = code.emit(Instruction::halt()).unwrap();
        code.patch(at);
    }

    #[test]
    #[should_panic = "isn't part of the program"]
    fn patching_outside_the_program_panics() {
        TargetCode::new().patch(Address::new(3));
    }
}
