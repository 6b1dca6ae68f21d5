//! Reporte de errores y advertencias con ubicación.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Conjunto de diagnósticos de un mismo tipo.
///
/// Al formatearse, cada diagnóstico muestra la línea de código fuente
/// correspondiente y subraya el segmento que lo originó.
pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError + Send + Sync>>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError + Send + Sync> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + LocatedError + Send + Sync> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| {
                let error: Box<dyn LocatedError + Send + Sync> = Box::new(error);
                error
            })
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No {}s were reported", kind);
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            let digits = location.end().line().to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line_number in location.start().line()..=location.end().line() {
                let line = location.source().line(line_number).unwrap_or("");
                writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)?;
            }

            // Un segmento de varias líneas se subraya desde su inicio
            let from = location.start().column();
            let to = if location.end().line() == location.start().line() {
                location.end().column().saturating_sub(1).max(from)
            } else {
                from
            };

            let skip = (from - 1) as usize;
            let highlight = (to - from + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let plural = if errors.len() == 1 { "" } else { "s" };
        match *kind {
            "error" => writeln!(fmt, "Compilation failed with {} error{}", errors.len(), plural),
            kind => writeln!(fmt, "{} {}{} emitted", errors.len(), kind, plural),
        }
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::tokenize, parse::parse, source::Source};

    #[test]
    fn underline_parse_error() {
        let source = Source::new("demo.hts", "sync a ;\nmemory allocate lots ;");
        let error = parse(&tokenize(&source).tokens).unwrap_err();
        let rendered = Diagnostics::from(error).to_string();

        let expected = "\
error: Expected an allocation size in bytes, found `lots`
 --> demo.hts:[2:17-2:20]
  |
2 | memory allocate lots ;
  |                 ^^^^

Compilation failed with 1 error
";

        assert_eq!(rendered, expected);
    }

    #[test]
    fn warnings_kind() {
        let source = Source::new("demo.hts", "let a$ : int = 1 ;");
        let warnings = tokenize(&source).warnings;
        let rendered = Diagnostics::from(warnings).kind("warning").to_string();

        assert!(rendered.starts_with("warning: Bad character '$' in input stream, dropped\n"));
        assert!(rendered.contains("  |      ^\n"));
        assert!(rendered.ends_with("1 warning emitted\n"));
    }

    #[test]
    fn empty() {
        let diagnostics = Diagnostics::default().kind("warning");
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.to_string(), "No warnings were reported\n");
    }
}
