//! Biblioteca de ejecución para programas HTS.
//!
//! # Propósito
//! El compilador reconoce directivas de planificación (`sync`, `async`)
//! cuyo efecto no es traducible a un registro ejecutable, sino que debe
//! ocurrir. Esta biblioteca implementa la ejecución de esas directivas
//! por medio de un [`Executor`] que recibe trabajos ([`ScheduledJob`]) y
//! los resuelve contra colaboradores de dominio.
//!
//! # Colaboradores
//! Las operaciones "cuánticas", de libro contable y de nodos distribuidos
//! no se simulan aquí. Cada dominio se representa por un [`Collaborator`],
//! un objeto con un único método `execute()` cuyo resultado se trata como
//! una línea de bitácora opaca. Las implementaciones en [`collab`] son
//! stubs deterministas que pueden sustituirse por backends reales.
//!
//! # Concurrencia
//! Los trabajos síncronos corren en el hilo de quien los envía, en orden
//! de envío. Los asíncronos y distribuidos corren en un pool acotado de
//! hilos y reportan su resultado por un canal. [`Executor::run_all()`] es
//! la barrera de unión: no retorna hasta que todo trabajo tenga un
//! resultado registrado, sea éxito, fallo o cancelación por timeout.
//!
//! Este crate no conoce tokens ni IR; solo ve trabajos ya resueltos por
//! el parser.

pub mod collab;
pub mod job;
pub mod sched;

pub use collab::{Args, Collaborator, CollaboratorError, Collaborators, Domain, Registry};
pub use job::{JobError, JobId, JobOutcome, Mode, Report, ScheduledJob, Status};
pub use rayon::ThreadPoolBuildError;
pub use sched::{Executor, ExecutorConfig};
