use triangle::codegen::Format;

#[derive(Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum Emit {
    /// The instruction listing.
    Text,
    /// The encoded object program.
    Binary,
    Both,
}

impl Emit {
    pub fn formats(self) -> &'static [Format] {
        match self {
            Emit::Text => &[Format::Text],
            Emit::Binary => &[Format::Binary],
            Emit::Both => Format::ALL,
        }
    }
}

impl std::fmt::Display for Emit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Emit::Text | Emit::Binary => std::fmt::Display::fmt(&Format::from(*self), f),
            Emit::Both => f.write_str("both"),
        }
    }
}

impl From<Emit> for Format {
    fn from(value: Emit) -> Self {
        match value {
            Emit::Text => Format::Text,
            Emit::Binary => Format::Binary,
            Emit::Both => panic!("can't convert both formats into one"),
        }
    }
}
