//! Token definitions for the package clause and import block.
//!
//! Only the handful of tokens that can appear before the first declaration
//! are recognised, plus comments, which the parser skips. Anything else lexes
//! as an error, which is harmless because the header parser stops pulling
//! tokens once the imports end.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(super) enum Token {
    #[token("package")]
    Package,

    #[token("import")]
    Import,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[token(";")]
    Semicolon,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    /// Dot import: `import . "fmt"`.
    #[token(".")]
    Dot,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    InterpretedString,

    #[regex(r"`[^`]*`")]
    RawString,

    /// Identifiers, including the blank identifier `_`. Keywords other than
    /// `package` and `import` also land here.
    #[regex(r"[\p{L}_][\p{L}\p{Nd}_]*")]
    Ident,
}
