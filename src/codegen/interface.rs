use std::io;

use crate::codegen::target::TargetCode;

/// Writes the program in the given format.
pub fn write<W>(mut writer: W, code: &TargetCode, format: Format) -> io::Result<()>
where
    W: io::Write,
{
    match format {
        Format::Text => writer.write_all(code.text().as_bytes())?,
        Format::Binary => writer.write_all(&code.binary())?,
    }
    writer.flush()
}

/// Serialization formats of target code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    /// The human readable listing.
    Text,
    /// The executable image, five bytes per instruction.
    Binary,
}

impl Format {
    pub const ALL: &[Format] = &[Format::Text, Format::Binary];

    /// File extension conventionally used for the format.
    pub const fn extension(&self) -> &'static str {
        match self {
            Format::Text => "txt",
            Format::Binary => "tam",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Text => f.write_str("text"),
            Format::Binary => f.write_str("binary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::target::Instruction;

    #[test]
    fn writes_both_formats() {
        let mut code = TargetCode::new();
        code.emit(Instruction::load_literal(258)).unwrap();
        code.emit(Instruction::halt()).unwrap();

        let mut text = Vec::new();
        write(&mut text, &code, Format::Text).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), code.text());

        let mut binary = Vec::new();
        write(&mut binary, &code, Format::Binary).unwrap();
        assert_eq!(binary, [3, 0, 0, 2, 1, 14, 0, 0, 0, 0]);
    }

    #[test]
    fn names() {
        let names: Vec<_> = Format::ALL.iter().map(|f| (f.to_string(), f.extension())).collect();
        assert_eq!(
            names,
            [("text".to_owned(), "txt"), ("binary".to_owned(), "tam")]
        );
    }
}
