//! Trabajos planificados y sus resultados.

use std::fmt::{self, Display};
use thiserror::Error;

use crate::collab::{Args, CollaboratorError};

/// Modo de planificación de un trabajo.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Corre en el hilo de quien envía, antes de que `submit()` retorne.
    Sync,

    /// Corre en el pool de hilos, concurrente con todo lo demás.
    Async,

    /// Corre en el pool de hilos e invoca a cada nodo configurado.
    Distributed,
}

impl Display for Mode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sync => fmt.write_str("sync"),
            Mode::Async => fmt.write_str("async"),
            Mode::Distributed => fmt.write_str("distributed"),
        }
    }
}

/// Una unidad de trabajo para el [`Executor`](crate::Executor).
///
/// `payload` es una etiqueta que se resuelve en tiempo de ejecución
/// contra el [`Registry`](crate::Registry). Los argumentos se pasan
/// tal cual al colaborador.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledJob {
    pub mode: Mode,
    pub payload: String,
    pub args: Args,
}

impl ScheduledJob {
    pub fn new<S: Into<String>>(mode: Mode, payload: S) -> Self {
        ScheduledJob {
            mode,
            payload: payload.into(),
            args: Args::new(),
        }
    }

    pub fn sync<S: Into<String>>(payload: S) -> Self {
        ScheduledJob::new(Mode::Sync, payload)
    }

    pub fn async_<S: Into<String>>(payload: S) -> Self {
        ScheduledJob::new(Mode::Async, payload)
    }

    pub fn distributed<S: Into<String>>(payload: S) -> Self {
        ScheduledJob::new(Mode::Distributed, payload)
    }

    /// Agrega o reemplaza un argumento.
    pub fn with_arg<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// Identificador de un trabajo, asignado en orden de envío.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(pub u32);

impl Display for JobId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

/// Fallo aislado de un trabajo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("No collaborator handles payload `{0}`")]
    Unresolved(String),

    #[error("Collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Node {node} failed: {error}")]
    Node { node: usize, error: CollaboratorError },

    #[error("No distributed nodes are configured")]
    NoNodes,

    #[error("Job panicked: {0}")]
    Panicked(String),
}

/// Estado final de un trabajo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Líneas de bitácora retornadas por los colaboradores, en orden.
    Completed(Vec<String>),
    Failed(JobError),
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOutcome {
    pub id: JobId,
    pub mode: Mode,
    pub payload: String,
    pub status: Status,
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, Status::Completed(_))
    }
}

impl Display for JobOutcome {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{} {} `{}`: ", self.id, self.mode, self.payload)?;
        match &self.status {
            Status::Completed(lines) => write!(fmt, "completed ({})", lines.join("; ")),
            Status::Failed(error) => write!(fmt, "failed ({})", error),
            Status::Cancelled => fmt.write_str("cancelled"),
        }
    }
}

/// Reporte agregado luego de la barrera de unión.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Un resultado por trabajo enviado, ordenado por [`JobId`].
    pub outcomes: Vec<JobOutcome>,
}

impl Report {
    pub fn completed(&self) -> usize {
        self.count(|status| matches!(status, Status::Completed(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, Status::Failed(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|status| matches!(status, Status::Cancelled))
    }

    pub fn is_success(&self) -> bool {
        self.completed() == self.outcomes.len()
    }

    pub fn get(&self, id: JobId) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|outcome| outcome.id == id)
    }

    fn count<F: Fn(&Status) -> bool>(&self, filter: F) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| filter(&outcome.status))
            .count()
    }
}
