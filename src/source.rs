//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los tokens, las sentencias de IR y los errores llevan cuenta de la
//! posición en el código fuente original de la cual derivan. Esto
//! permite señalar la línea exacta de un error de sintaxis y ubicar
//! cada registro ejecutable.
//!
//! Las ubicaciones comparten su origen por medio de [`Arc`], de forma
//! que los errores pueden cruzar fronteras de hilos.

use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    ops::Range,
    sync::Arc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<E: Display> Display for Located<E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.location, self.value)
    }
}

impl<E: Error> Error for Located<E> {}

/// Un archivo o texto de entrada, con nombre.
#[derive(PartialEq, Eq)]
pub struct Source {
    name: String,
    lines: Vec<String>,
}

impl Source {
    /// Registra un texto de entrada.
    pub fn new<S: Into<String>>(name: S, text: &str) -> Arc<Self> {
        Arc::new(Source {
            name: name.into(),
            lines: text.lines().map(String::from).collect(),
        })
    }

    /// Nombre de origen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Obtiene una línea, numerada a partir de 1.
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = number.checked_sub(1)? as usize;
        self.lines.get(index).map(String::as_str)
    }

    /// Itera por carácter.
    ///
    /// Cada línea termina en `'\n'`, incluso la última. Cada carácter
    /// viene acompañado de su propia ubicación.
    pub fn chars(self: &Arc<Self>) -> impl Iterator<Item = (char, Location)> + '_ {
        let source = Arc::clone(self);

        self.lines
            .iter()
            .enumerate()
            .flat_map(move |(line_index, line)| {
                let source = Arc::clone(&source);
                let mut here = Position {
                    line: line_index as u32 + 1,
                    column: 1,
                };

                line.chars().chain(std::iter::once('\n')).map(move |c| {
                    let location = Location {
                        from: Arc::clone(&source),
                        position: here..here.advance(),
                    };

                    here = match c {
                        '\n' => here.newline(),
                        '\t' => here.tab(),
                        _ => here.advance(),
                    };

                    (c, location)
                })
            })
    }
}

impl Debug for Source {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "Source({:?})", self.name)
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
#[derive(Clone, PartialEq, Eq)]
pub struct Location {
    from: Arc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            position: from.position.start..to.position.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Obtiene el origen.
    pub fn source(&self) -> &Source {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() || end.line != start.line {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}
