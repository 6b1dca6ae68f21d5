//! Compilador para el lenguaje de scripting HTS.
//!
//! # Front end
//! Cada programa deriva de un único texto de código fuente ([`source`]).
//! Este texto se somete primero a análisis léxico en [`lex`], de lo cual
//! se obtiene un flujo plano de tokens. El análisis sintáctico en
//! [`parse`] recorre ese flujo por posición, con anchos fijos por
//! constructo, y produce directamente una representación intermedia
//! descrita en [`ir`]. No existe un AST.
//!
//! Como efecto secundario, el parser puebla la tabla de [`symbols`] y
//! opera sobre el pool de [`memory`]. Ninguna otra fase escribe sobre
//! ese estado.
//!
//! # Back end
//! La IR pasa por un pase de [`optimize`], que solo puede anotar
//! sentencias, y luego por [`codegen`], que traduce cada sentencia con
//! categoría a un registro ejecutable rotulado.
//!
//! # Ejecución
//! Las directivas `sync` y `async` no son solo registros: se envían como
//! trabajos al ejecutor de `hts_runtime`. La tubería completa, incluyendo
//! la barrera de unión, se encuentra en [`pipeline`].

pub mod codegen;
pub mod config;
pub mod error;
pub mod ir;
pub mod lex;
pub mod memory;
pub mod optimize;
pub mod parse;
pub mod pipeline;
pub mod source;
pub mod symbols;

pub use pipeline::{compile, CompileError, Compiled, Pipeline};
