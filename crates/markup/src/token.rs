//! Tokens and source spans for the `.swen` markup language.

/// Position of a token in the source, 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Span {
    #[must_use]
    pub const fn new(line: u32, column: u32, offset: u32) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// Classification of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenTag {
    // Keywords
    Root,
    Desktop,
    System,
    Rect,
    Text,
    Transform,
    Clip,
    WaylandSurface,
    // Property names
    Workspaces,
    App,
    Nodes,
    Id,
    Size,
    TextSize,
    Position,
    Background,
    Body,
    Color,
    Matrix,
    SurfaceRect,
    // Literals
    Identifier,
    Str,
    Int,
    Float,
    Boolean,
    Nothing,
    // Punctuation
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Eof,
}

impl TokenTag {
    /// Human-readable name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Desktop => "desktop",
            Self::System => "system",
            Self::Rect => "rect",
            Self::Text => "text",
            Self::Transform => "transform",
            Self::Clip => "clip",
            Self::WaylandSurface => "wayland_surface",
            Self::Workspaces => "workspaces",
            Self::App => "app",
            Self::Nodes => "nodes",
            Self::Id => "id",
            Self::Size => "size",
            Self::TextSize => "text_size",
            Self::Position => "position",
            Self::Background => "background",
            Self::Body => "body",
            Self::Color => "color",
            Self::Matrix => "matrix",
            Self::SurfaceRect => "surface_rect",
            Self::Identifier => "identifier",
            Self::Str => "string",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Nothing => "nothing",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Dot => ".",
            Self::Eof => "end of input",
        }
    }
}

/// A lexed token. `literal` borrows from the source; for strings the
/// surrounding quotes are stripped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub literal: &'src str,
    pub tag: TokenTag,
    pub span: Span,
}

impl<'src> Token<'src> {
    #[must_use]
    pub const fn new(literal: &'src str, tag: TokenTag, span: Span) -> Self {
        Self { literal, tag, span }
    }
}

/// Resolve a word into a keyword/property tag, dispatching on the first
/// character before comparing the full spelling.
#[must_use]
pub fn classify_word(word: &str) -> TokenTag {
    let Some(first) = word.as_bytes().first() else {
        return TokenTag::Identifier;
    };
    match first {
        b'a' => match word {
            "app" => TokenTag::App,
            _ => TokenTag::Identifier,
        },
        b'b' => match word {
            "background" => TokenTag::Background,
            "body" => TokenTag::Body,
            _ => TokenTag::Identifier,
        },
        b'c' => match word {
            "clip" => TokenTag::Clip,
            "color" => TokenTag::Color,
            _ => TokenTag::Identifier,
        },
        b'd' => match word {
            "desktop" => TokenTag::Desktop,
            _ => TokenTag::Identifier,
        },
        b'f' => match word {
            "false" => TokenTag::Boolean,
            _ => TokenTag::Identifier,
        },
        b'i' => match word {
            "id" => TokenTag::Id,
            _ => TokenTag::Identifier,
        },
        b'm' => match word {
            "matrix" => TokenTag::Matrix,
            _ => TokenTag::Identifier,
        },
        b'n' => match word {
            "nodes" => TokenTag::Nodes,
            "nothing" => TokenTag::Nothing,
            _ => TokenTag::Identifier,
        },
        b'p' => match word {
            "position" => TokenTag::Position,
            _ => TokenTag::Identifier,
        },
        b'r' => match word {
            "rect" => TokenTag::Rect,
            "root" => TokenTag::Root,
            _ => TokenTag::Identifier,
        },
        b's' => match word {
            "size" => TokenTag::Size,
            "surface_rect" => TokenTag::SurfaceRect,
            "system" => TokenTag::System,
            _ => TokenTag::Identifier,
        },
        b't' => match word {
            "text" => TokenTag::Text,
            "text_size" => TokenTag::TextSize,
            "transform" => TokenTag::Transform,
            "true" => TokenTag::Boolean,
            _ => TokenTag::Identifier,
        },
        b'w' => match word {
            "wayland_surface" => TokenTag::WaylandSurface,
            "workspaces" => TokenTag::Workspaces,
            _ => TokenTag::Identifier,
        },
        _ => TokenTag::Identifier,
    }
}
