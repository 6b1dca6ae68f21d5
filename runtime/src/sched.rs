//! Planificación y ejecución de trabajos.
//!
//! # Modelo
//! Un [`Executor`] recibe trabajos por medio de [`Executor::submit()`].
//! Los trabajos [`Mode::Sync`] se ejecutan ahí mismo, en el hilo que
//! envía, de forma que sus efectos son observables en orden de envío.
//! Los trabajos [`Mode::Async`] y [`Mode::Distributed`] se despachan de
//! inmediato a un pool de `workers` hilos y corren concurrentemente con
//! el resto del pipeline.
//!
//! # Resultados
//! Ningún estado se comparte entre trabajos. Cada trabajo del pool envía
//! su [`JobOutcome`] por un canal. Además del canal solo se comparten la
//! bandera de cancelación y un reclamo atómico por trabajo, con el cual
//! el trabajo y [`Executor::run_all()`] deciden quién determina su
//! destino: un trabajo que ya invocó a su colaborador siempre reporta su
//! resultado real, y uno cancelado nunca lo invoca.
//!
//! # Fallos
//! Un error o pánico de colaborador se registra como fallo del trabajo
//! que lo causó y nunca afecta a los demás.

use std::{
    any::Any,
    collections::BTreeMap,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::{
    collab::Collaborators,
    job::{JobError, JobId, JobOutcome, Mode, Report, ScheduledJob, Status},
};

/// Granularidad con la que un retardo simulado revisa la cancelación.
const PAUSE_SLICE: Duration = Duration::from_millis(10);

// Estados de reclamo de un trabajo del pool
const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

/// Parámetros del ejecutor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Hilos en el pool para trabajos asíncronos y distribuidos.
    pub workers: usize,

    /// Retardo simulado antes de ejecutar un trabajo del pool.
    pub delay: Duration,

    /// Tiempo máximo de espera en [`Executor::run_all()`].
    pub timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            workers: 4,
            delay: Duration::ZERO,
            timeout: None,
        }
    }
}

pub struct Executor {
    config: ExecutorConfig,
    collaborators: Arc<Collaborators>,
    pool: ThreadPool,
    sender: Sender<JobOutcome>,
    receiver: Receiver<JobOutcome>,
    cancel: Arc<AtomicBool>,
    finished: Vec<JobOutcome>,
    in_flight: BTreeMap<JobId, InFlight>,
    next_id: u32,
}

/// Trabajo del pool que aún no tiene resultado registrado.
struct InFlight {
    mode: Mode,
    payload: String,
    claim: Arc<AtomicU8>,
}

impl Executor {
    /// Construye un ejecutor y su pool de hilos.
    pub fn new(
        config: ExecutorConfig,
        collaborators: Collaborators,
    ) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|index| format!("hts-worker-{}", index))
            .build()?;

        let (sender, receiver) = mpsc::channel();

        Ok(Executor {
            config,
            collaborators: Arc::new(collaborators),
            pool,
            sender,
            receiver,
            cancel: Arc::new(AtomicBool::new(false)),
            finished: Vec::new(),
            in_flight: BTreeMap::new(),
            next_id: 0,
        })
    }

    /// Envía un trabajo.
    ///
    /// Un trabajo síncrono ya tiene su resultado registrado cuando
    /// esta función retorna. Uno asíncrono o distribuido puede estar
    /// en cualquier estado.
    pub fn submit(&mut self, job: ScheduledJob) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;

        debug!("Submitted {} job {}: `{}`", job.mode, id, job.payload);

        match job.mode {
            Mode::Sync => {
                let status = execute(&self.collaborators, &job);
                let outcome = JobOutcome {
                    id,
                    mode: job.mode,
                    payload: job.payload,
                    status,
                };

                log_outcome(&outcome);
                self.finished.push(outcome);
            }

            Mode::Async | Mode::Distributed => {
                let claim = Arc::new(AtomicU8::new(PENDING));
                self.in_flight.insert(
                    id,
                    InFlight {
                        mode: job.mode,
                        payload: job.payload.clone(),
                        claim: Arc::clone(&claim),
                    },
                );

                let collaborators = Arc::clone(&self.collaborators);
                let cancel = Arc::clone(&self.cancel);
                let sender = self.sender.clone();
                let delay = self.config.delay;

                self.pool.spawn(move || {
                    // Sin reclamo, run_all() ya lo reportó como cancelado
                    if !pause(delay, &cancel) || !transition(&claim, RUNNING) {
                        debug!("Dropping cancelled job {}", id);
                        return;
                    }

                    let status = execute(&collaborators, &job);
                    let outcome = JobOutcome {
                        id,
                        mode: job.mode,
                        payload: job.payload,
                        status,
                    };

                    log_outcome(&outcome);

                    // run_all() espera a todo trabajo reclamado
                    let _ = sender.send(outcome);
                });
            }
        }

        id
    }

    /// Barrera de unión.
    ///
    /// Espera a que todo trabajo enviado tenga un resultado. Si se
    /// configuró un timeout y este expira, se levanta la bandera de
    /// cancelación y los trabajos que aún no invocaban a su colaborador
    /// se reportan como [`Status::Cancelled`]. Los que ya lo invocaron
    /// no pueden interrumpirse, por lo que se espera su resultado real.
    pub fn run_all(self) -> Report {
        let Executor {
            config,
            receiver,
            sender,
            cancel,
            mut finished,
            mut in_flight,
            ..
        } = self;

        drop(sender);

        let mut deadline = config.timeout.map(|timeout| Instant::now() + timeout);
        while !in_flight.is_empty() {
            let received = match deadline {
                None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
                Some(deadline) => {
                    receiver.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
            };

            match received {
                Ok(outcome) => {
                    in_flight.remove(&outcome.id);
                    finished.push(outcome);
                }

                Err(RecvTimeoutError::Timeout) => {
                    warn!("Timed out with {} job(s) unfinished", in_flight.len());
                    cancel.store(true, Ordering::Release);

                    in_flight.retain(|&id, job| {
                        if !transition(&job.claim, CANCELLED) {
                            return true;
                        }

                        warn!("Cancelled {} job {}: `{}`", job.mode, id, job.payload);
                        finished.push(JobOutcome {
                            id,
                            mode: job.mode,
                            payload: std::mem::take(&mut job.payload),
                            status: Status::Cancelled,
                        });

                        false
                    });

                    if !in_flight.is_empty() {
                        info!("Waiting for {} job(s) already running", in_flight.len());
                    }

                    deadline = None;
                }

                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // Solo ocurre si un hilo del pool murió sin reportar
        for (id, InFlight { mode, payload, .. }) in in_flight {
            warn!("Lost {} job {}: `{}`", mode, id, payload);
            finished.push(JobOutcome {
                id,
                mode,
                payload,
                status: Status::Cancelled,
            });
        }

        finished.sort_by_key(|outcome| outcome.id);
        info!("All {} job(s) joined", finished.len());

        Report { outcomes: finished }
    }
}

/// Ejecuta un trabajo, atrapando tanto errores como pánicos.
fn execute(collaborators: &Collaborators, job: &ScheduledJob) -> Status {
    match panic::catch_unwind(AssertUnwindSafe(|| perform(collaborators, job))) {
        Ok(Ok(lines)) => Status::Completed(lines),
        Ok(Err(error)) => Status::Failed(error),
        Err(payload) => Status::Failed(JobError::Panicked(panic_message(payload))),
    }
}

/// Resuelve la carga del trabajo e invoca al colaborador correspondiente.
fn perform(collaborators: &Collaborators, job: &ScheduledJob) -> Result<Vec<String>, JobError> {
    match job.mode {
        Mode::Distributed => {
            if collaborators.nodes.is_empty() {
                return Err(JobError::NoNodes);
            }

            collaborators
                .nodes
                .iter()
                .enumerate()
                .map(|(node, collaborator)| {
                    collaborator
                        .execute(&job.payload, &job.args)
                        .map_err(|error| JobError::Node { node, error })
                })
                .collect()
        }

        Mode::Sync | Mode::Async => {
            let domain = collaborators
                .registry
                .resolve(&job.payload)
                .ok_or_else(|| JobError::Unresolved(job.payload.clone()))?;

            let line = collaborators
                .domain(domain)
                .execute(&job.payload, &job.args)?;

            Ok(vec![line])
        }
    }
}

/// Reclama un trabajo pendiente. Falla si alguien más lo reclamó antes.
fn transition(claim: &AtomicU8, to: u8) -> bool {
    claim
        .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Retardo simulado. Retorna `false` si hubo cancelación.
fn pause(delay: Duration, cancel: &AtomicBool) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.load(Ordering::Acquire) {
            return false;
        }

        let now = Instant::now();
        if now >= deadline {
            return true;
        }

        thread::sleep((deadline - now).min(PAUSE_SLICE));
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("<non-string panic>")
    }
}

fn log_outcome(outcome: &JobOutcome) {
    match outcome.status {
        Status::Completed(_) => info!("{}", outcome),
        Status::Failed(_) | Status::Cancelled => warn!("{}", outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{Args, Collaborator, CollaboratorError};
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<String>>);

    impl Collaborator for Recorder {
        fn execute(&self, kind: &str, _args: &Args) -> Result<String, CollaboratorError> {
            self.0.lock().unwrap().push(kind.to_string());
            Ok(kind.to_string())
        }
    }

    fn executor() -> Executor {
        Executor::new(ExecutorConfig::default(), Collaborators::default()).unwrap()
    }

    #[test]
    fn no_jobs_joins_immediately() {
        let report = executor().run_all();
        assert!(report.outcomes.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn sync_jobs_run_in_submission_order() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut collaborators = Collaborators::default();
        collaborators.ledger = recorder.clone() as Arc<dyn Collaborator>;
        collaborators.registry.register("first", crate::Domain::Ledger);
        collaborators.registry.register("second", crate::Domain::Ledger);

        let mut executor = Executor::new(ExecutorConfig::default(), collaborators).unwrap();
        executor.submit(ScheduledJob::sync("first"));
        assert_eq!(*recorder.0.lock().unwrap(), vec!["first"]);

        executor.submit(ScheduledJob::sync("second"));
        assert_eq!(*recorder.0.lock().unwrap(), vec!["first", "second"]);

        assert_eq!(executor.run_all().completed(), 2);
    }

    #[test]
    fn unresolved_payload_fails_only_that_job() {
        let mut executor = executor();
        let bad = executor.submit(ScheduledJob::async_("teleport"));
        let good = executor.submit(
            ScheduledJob::async_("blockchain_transaction").with_arg("transaction", "tx1"),
        );

        let report = executor.run_all();
        assert_eq!(
            report.get(bad).map(|o| &o.status),
            Some(&Status::Failed(JobError::Unresolved(String::from("teleport"))))
        );
        assert!(report.get(good).map_or(false, JobOutcome::is_completed));
    }

    #[test]
    fn distributed_job_visits_every_node() {
        let mut executor = executor();
        let id = executor.submit(ScheduledJob::distributed("Deploy Application"));

        let report = executor.run_all();
        match &report.get(id).unwrap().status {
            Status::Completed(lines) => assert_eq!(lines.len(), 3),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn distributed_job_without_nodes_fails() {
        let mut executor =
            Executor::new(ExecutorConfig::default(), Collaborators::stubs(0)).unwrap();
        executor.submit(ScheduledJob::distributed("deploy"));

        let report = executor.run_all();
        assert_eq!(report.outcomes[0].status, Status::Failed(JobError::NoNodes));
    }

    #[test]
    fn claims_are_exclusive() {
        let claim = AtomicU8::new(PENDING);
        assert!(transition(&claim, RUNNING));
        assert!(!transition(&claim, CANCELLED));

        let claim = AtomicU8::new(PENDING);
        assert!(transition(&claim, CANCELLED));
        assert!(!transition(&claim, RUNNING));
    }

    #[test]
    fn pause_observes_cancellation() {
        let cancel = AtomicBool::new(true);
        assert!(!pause(Duration::from_secs(60), &cancel));

        let cancel = AtomicBool::new(false);
        assert!(pause(Duration::ZERO, &cancel));
    }
}
