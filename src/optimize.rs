//! Optimización.
//!
//! Un pase de optimización transforma un [`Program`] en otro con la
//! misma cantidad de sentencias, en el mismo orden y con las mismas
//! categorías. Lo único que un pase puede alterar son las anotaciones
//! de cada nodo. La tubería verifica esta restricción luego de cada
//! pase (ver [`check`]).

use log::debug;

use crate::ir::{Program, Statement};

/// Anotación que agrega [`Annotate`].
pub const OPTIMIZED: &str = "Optimized";

pub trait Pass: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, program: Program) -> Program;
}

/// Pase que no altera el programa.
#[derive(Copy, Clone, Debug, Default)]
pub struct Identity;

impl Pass for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn run(&self, program: Program) -> Program {
        program
    }
}

/// Pase por defecto.
///
/// Anota como [`OPTIMIZED`] toda sentencia con categoría que preceda a
/// la última marca `optimize` del programa. Sin marcas, el programa no
/// cambia.
#[derive(Copy, Clone, Debug, Default)]
pub struct Annotate;

impl Pass for Annotate {
    fn name(&self) -> &str {
        "annotate"
    }

    fn run(&self, mut program: Program) -> Program {
        let last_marker = program
            .nodes
            .iter()
            .rposition(|node| node.statement == Statement::Optimize);

        if let Some(marker) = last_marker {
            let mut annotated = 0;
            for node in &mut program.nodes[..marker] {
                let pending = !node.annotations.iter().any(|note| note == OPTIMIZED);
                if node.statement.category().is_some() && pending {
                    node.annotations.push(String::from(OPTIMIZED));
                    annotated += 1;
                }
            }

            debug!("Annotated {} statement(s) before `optimize`", annotated);
        }

        program
    }
}

/// Verifica que un pase haya respetado la estructura del programa.
///
/// Retorna `false` si cambió la cantidad de sentencias o la categoría
/// de alguna de ellas.
pub fn check(before: &Program, after: &Program) -> bool {
    before.len() == after.len() && before.categories() == after.categories()
}
