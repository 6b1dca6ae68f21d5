//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`Source`] en
//! unidades léxicas denominadas tokens. Los espacios en blanco y los
//! comentarios de línea (`// ...`) se descartan durante esta operación.
//! Cada token emitido está asociado a una ubicación en el código fuente
//! original.
//!
//! # Contenido de un token
//! A diferencia de otras fases, todo token conserva su lexema exacto,
//! ya que el parser trabaja por posición y copia lexemas tal cual a las
//! sentencias de IR. La clase del token ([`Kind`]) es lo único que se
//! interpreta.
//!
//! # Reglas importantes del lenguaje
//! - Las palabras clave distinguen mayúsculas de minúsculas. Solo
//!   `quantum` resulta en [`Keyword::Quantum`]; `Quantum` y `QUANTUM`
//!   son identificadores comunes.
//! - Los identificadores admiten letras y dígitos Unicode, de forma que
//!   `größe` es un solo término.
//! - Un literal numérico inicia con un dígito y continúa con caracteres
//!   de palabra, de forma que `0x1000` es un solo token. Puede incluir
//!   una única parte fraccionaria (`20.5`).
//!
//! # Errores
//! No existen errores léxicos fatales. Todo carácter que no forma parte
//! de algún patrón reconocido se descarta y se reporta como una
//! advertencia ([`LexError::BadChar`]), pero el análisis continúa.

use log::debug;
use std::{
    fmt::{self, Display},
    str::FromStr,
    sync::Arc,
};

use thiserror::Error;

use crate::source::{Located, Location, Source};

/// Advertencia de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream, dropped")]
    BadChar(char),
}

/// Clase de un token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Palabra clave.
    Keyword(Keyword),

    /// Identificador.
    Identifier,

    /// Literal numérico.
    Number,

    /// `+`, `-`, `*`, `/`, `=`, `<`, `>`
    Operator,

    /// `(`, `)`, `{`, `}`, `;`, `:`, `,`
    Punctuation,
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: Kind,
    text: String,
}

impl Token {
    pub fn new<S: Into<String>>(kind: Kind, text: S) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Lexema original.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Determina si este token es una palabra clave en específico.
    pub fn is(&self, keyword: Keyword) -> bool {
        self.kind == Kind::Keyword(keyword)
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Keyword(_) => write!(fmt, "keyword `{}`", self.text),
            Kind::Identifier => write!(fmt, "identifier `{}`", self.text),
            Kind::Number => write!(fmt, "literal `{}`", self.text),
            Kind::Operator | Kind::Punctuation => write!(fmt, "`{}`", self.text),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Let,
    Fn,
    If,
    Quantum,
    Blockchain,
    Sync,
    Async,
    Memory,
    Allocate,
    Deallocate,
    Optimize,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Keyword::*;
        let string = match self {
            Let        => "let",
            Fn         => "fn",
            If         => "if",
            Quantum    => "quantum",
            Blockchain => "blockchain",
            Sync       => "sync",
            Async      => "async",
            Memory     => "memory",
            Allocate   => "allocate",
            Deallocate => "deallocate",
            Optimize   => "optimize",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        use Keyword::*;

        const KEYWORDS: &[(&str, Keyword)] = &[
            ("let",        Let),
            ("fn",         Fn),
            ("if",         If),
            ("quantum",    Quantum),
            ("blockchain", Blockchain),
            ("sync",       Sync),
            ("async",      Async),
            ("memory",     Memory),
            ("allocate",   Allocate),
            ("deallocate", Deallocate),
            ("optimize",   Optimize),
        ];

        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Resultado completo del análisis léxico.
#[derive(Debug, Clone, Default)]
pub struct Tokens {
    pub tokens: Vec<Located<Token>>,
    pub warnings: Vec<Located<LexError>>,
}

/// Descompone un código fuente en tokens.
///
/// Esta función es pura: dos invocaciones sobre el mismo origen
/// producen secuencias idénticas.
pub fn tokenize(source: &Arc<Source>) -> Tokens {
    let mut lexer = Lexer::new(source);
    let tokens: Vec<_> = lexer.by_ref().collect();
    let warnings = lexer.warnings;

    debug!(
        "{}: {} token(s), {} dropped character(s)",
        source.name(),
        tokens.len(),
        warnings.len()
    );

    Tokens { tokens, warnings }
}

/// Máquina de estados para análisis léxico.
///
/// La salida del lexer, así como su siguiente estado, se define a
/// partir de tanto su estado actual como el siguiente carácter
/// encontrado en la entrada.
pub struct Lexer {
    chars: Vec<(char, Location)>,
    cursor: usize,
    state: State,
    start: Option<Location>,
    last: Option<Location>,
    warnings: Vec<Located<LexError>>,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Kind, char),

    /// Se encontró `/`. Puede ser un operador o iniciar un comentario.
    Slash,

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`.
    Comment,

    /// Literal numérico.
    Number(String),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),
}

impl Lexer {
    /// Crea un lexer en estado inicial a partir de un origen.
    pub fn new(source: &Arc<Source>) -> Self {
        Lexer {
            chars: source.chars().collect(),
            cursor: 0,
            state: State::Start,
            start: None,
            last: None,
            warnings: Vec::new(),
        }
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Option<(Kind, String)> {
        use State::*;

        loop {
            let next_char = self.chars.get(self.cursor).map(|&(c, _)| c);

            // La posición de origen se reinicia siempre que no se
            // haya encontrado el inicio de un token
            if let Start = self.state {
                self.start = None;
            }

            match (&mut self.state, next_char) {
                // Tokens triviales
                (Start, None) => return None,
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c @ ('+' | '-' | '*' | '=' | '<' | '>'))) => {
                    self.state = Complete(Kind::Operator, c)
                }
                (Start, Some(c @ ('(' | ')' | '{' | '}' | ';' | ':' | ','))) => {
                    self.state = Complete(Kind::Punctuation, c)
                }
                (Start, Some('/')) => self.state = Slash,

                // Identificadores, palabras clave y literales
                (Start, Some(c)) if c.is_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }
                (Start, Some(c)) if c.is_ascii_digit() => self.state = Number(c.to_string()),

                // Caracteres inesperados se descartan con advertencia
                (Start, Some(c)) => {
                    let location = self.chars[self.cursor].1.clone();
                    debug!("{}: dropping {:?}", location, c);
                    self.warnings.push(Located::at(LexError::BadChar(c), location));
                }

                // Emisión retardada de tokens cualesquiera
                (Complete(kind, c), _) => return Some((*kind, c.to_string())),

                // `//` inicia un comentario, `/` por sí solo es división
                (Slash, Some('/')) => self.state = Comment,
                (Slash, _) => return Some((Kind::Operator, String::from("/"))),

                // Los comentarios descartan la línea donde ocurren
                (Comment, Some('\n')) | (Comment, None) => self.state = Start,
                (Comment, Some(_)) => (),

                // Una sola parte fraccionaria, siempre que siga un dígito
                (Number(text), Some('.'))
                    if !text.contains('.')
                        && matches!(self.chars.get(self.cursor + 1), Some((c, _)) if c.is_ascii_digit()) =>
                {
                    text.push('.')
                }
                (Number(text), Some(c)) if is_word_char(c) => text.push(c),
                (Number(text), _) => return Some((Kind::Number, std::mem::take(text))),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => word.push(c),

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => {
                    let kind = match Keyword::from_str(word) {
                        Ok(keyword) => Kind::Keyword(keyword),
                        Err(()) => Kind::Identifier,
                    };

                    return Some((kind, std::mem::take(word)));
                }
            }

            // Si no hubo `return`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some((_, location)) = self.chars.get(self.cursor) {
                let in_token = !matches!(self.state, Start | Comment);
                if in_token && self.start.is_none() {
                    self.start = Some(location.clone());
                }

                self.last = Some(location.clone());
                self.cursor += 1;
            }
        }
    }
}

impl Iterator for Lexer {
    type Item = Located<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        let (kind, text) = self.lex()?;
        self.state = State::Start;

        let start = self.start.take()?;
        let location = match &self.last {
            Some(last) => Location::span(start, last),
            None => start,
        };

        Some(Located::at(Token::new(kind, text), location))
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
