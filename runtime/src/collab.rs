//! Colaboradores de dominio.
//!
//! Un colaborador es la frontera con un backend externo. El ejecutor
//! solamente le entrega una etiqueta de operación y un mapa de
//! argumentos, y trata la cadena retornada como una línea de bitácora.

use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;
use unicase::Ascii as NoCase;

/// Argumentos de una operación.
pub type Args = BTreeMap<String, String>;

/// Falla reportada por un colaborador.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Missing argument `{0}`")]
    MissingArg(&'static str),

    #[error("Operation rejected: {0}")]
    Rejected(String),
}

/// Ejecutor externo para una sola categoría de operaciones.
///
/// Las implementaciones se comparten entre hilos del pool, por lo
/// cual deben ser `Send + Sync`.
pub trait Collaborator: Send + Sync {
    fn execute(&self, kind: &str, args: &Args) -> Result<String, CollaboratorError>;
}

/// Dominio al que se dirige una etiqueta de trabajo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    Quantum,
    Ledger,
}

/// Resolución de etiquetas de trabajo a dominios.
///
/// Las etiquetas no distinguen mayúsculas de minúsculas.
#[derive(Clone, Debug)]
pub struct Registry {
    entries: Vec<(NoCase<String>, Domain)>,
}

impl Registry {
    /// Un registro sin entradas.
    pub fn empty() -> Self {
        Registry {
            entries: Vec::new(),
        }
    }

    /// Asocia una etiqueta a un dominio, reemplazando cualquier entrada previa.
    pub fn register<S: Into<String>>(&mut self, tag: S, domain: Domain) {
        let tag = NoCase::new(tag.into());
        self.entries.retain(|(known, _)| *known != tag);
        self.entries.push((tag, domain));
    }

    pub fn resolve(&self, tag: &str) -> Option<Domain> {
        self.entries
            .iter()
            .find(|(known, _)| unicase::eq_ascii(known.as_str(), tag))
            .map(|&(_, domain)| domain)
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Registry::empty();
        registry.register("quantum_operation", Domain::Quantum);
        registry.register("blockchain_transaction", Domain::Ledger);
        registry
    }
}

/// Conjunto de colaboradores disponibles para un ejecutor.
#[derive(Clone)]
pub struct Collaborators {
    pub quantum: Arc<dyn Collaborator>,
    pub ledger: Arc<dyn Collaborator>,
    pub nodes: Vec<Arc<dyn Collaborator>>,
    pub registry: Registry,
}

impl Collaborators {
    /// Stubs para cada dominio, con `nodes` nodos distribuidos.
    pub fn stubs(nodes: usize) -> Self {
        Collaborators {
            quantum: Arc::new(QuantumProcessor),
            ledger: Arc::new(LedgerProcessor),
            nodes: (0..nodes)
                .map(|index| Arc::new(Node(index)) as Arc<dyn Collaborator>)
                .collect(),
            registry: Registry::default(),
        }
    }

    pub fn domain(&self, domain: Domain) -> &Arc<dyn Collaborator> {
        match domain {
            Domain::Quantum => &self.quantum,
            Domain::Ledger => &self.ledger,
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Collaborators::stubs(3)
    }
}

/// Stub de procesador cuántico. Requiere `qubit` y `operation`.
pub struct QuantumProcessor;

impl Collaborator for QuantumProcessor {
    fn execute(&self, _kind: &str, args: &Args) -> Result<String, CollaboratorError> {
        let qubit = require(args, "qubit")?;
        let operation = require(args, "operation")?;

        Ok(format!("Quantum operation on qubit {} with {}", qubit, operation))
    }
}

/// Stub de libro contable. Requiere `transaction`.
pub struct LedgerProcessor;

impl Collaborator for LedgerProcessor {
    fn execute(&self, _kind: &str, args: &Args) -> Result<String, CollaboratorError> {
        let transaction = require(args, "transaction")?;
        Ok(format!("Blockchain operation executed: {}", transaction))
    }
}

/// Stub de nodo distribuido, identificado por índice.
pub struct Node(pub usize);

impl Collaborator for Node {
    fn execute(&self, kind: &str, _args: &Args) -> Result<String, CollaboratorError> {
        Ok(format!("Node {} executed: {}", self.0, kind))
    }
}

fn require<'a>(args: &'a Args, key: &'static str) -> Result<&'a str, CollaboratorError> {
    args.get(key)
        .map(String::as_str)
        .ok_or(CollaboratorError::MissingArg(key))
}
