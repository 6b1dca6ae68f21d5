//! Tubería de compilación.
//!
//! Las fases corren en este orden:
//!
//! 1. Análisis léxico ([`tokenize`]).
//! 2. Análisis sintáctico ([`Parser`]), que puebla la tabla de símbolos
//!    y el pool de memoria, y produce trabajos.
//! 3. Envío de trabajos al [`Executor`]. Los síncronos concluyen aquí,
//!    los asíncronos inician y corren en paralelo con las fases
//!    restantes.
//! 4. Optimización ([`Pass`]), verificada con [`optimize::check`].
//! 5. Generación de registros ([`generate`]).
//! 6. Barrera de unión ([`Executor::run_all()`]).
//!
//! Un error de parsing aborta antes de enviar cualquier trabajo. Un
//! fallo de trabajo nunca aborta la compilación; se registra en el
//! [`Report`].

use hts_runtime::{
    Collaborators, Executor, Report, ScheduledJob, ThreadPoolBuildError,
};
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    codegen::{generate, ExecutableRecord},
    config::{Config, Options},
    lex::{tokenize, LexError, Tokens},
    optimize::{self, Annotate, Pass},
    parse::{ParseError, Parsed, Parser, State},
    source::{Located, Source},
};

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{0}")]
    Parse(#[from] Located<ParseError>),

    #[error("{} character(s) dropped in strict mode", .0.len())]
    Lex(Vec<Located<LexError>>),

    /// Los trabajos ya enviados se unen antes de reportar este error.
    #[error("Optimization pass `{pass}` altered the program structure")]
    BrokenPass { pass: String, report: Report },

    #[error("Failed to start executor: {0}")]
    Executor(#[from] ThreadPoolBuildError),
}

/// Resultado de una compilación exitosa.
#[derive(Debug)]
pub struct Compiled {
    pub records: Vec<ExecutableRecord>,
    pub report: Report,
    pub state: State,

    /// Caracteres descartados por el lexer.
    pub warnings: Vec<Located<LexError>>,
}

pub struct Pipeline {
    config: Config,
    pass: Box<dyn Pass>,
    collaborators: Collaborators,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new(Config::default())
    }
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let collaborators = Collaborators::stubs(config.pipeline.deploy_nodes);

        Pipeline {
            config,
            pass: Box::new(Annotate),
            collaborators,
        }
    }

    pub fn with_pass<P: Pass + 'static>(self, pass: P) -> Self {
        Pipeline {
            pass: Box::new(pass),
            ..self
        }
    }

    pub fn with_collaborators(self, collaborators: Collaborators) -> Self {
        Pipeline {
            collaborators,
            ..self
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compila un programa completo.
    ///
    /// `name` solo se utiliza para ubicaciones en diagnósticos. Cada
    /// invocación parte de un estado nuevo.
    pub fn compile(&self, name: &str, text: &str) -> Result<Compiled, CompileError> {
        let options = self.config.options();
        let source = Source::new(name, text);

        let Tokens { tokens, warnings } = tokenize(&source);
        if !warnings.is_empty() {
            if options.contains(Options::STRICT_LEX) {
                return Err(CompileError::Lex(warnings));
            }

            warn!("{}: dropped {} character(s)", name, warnings.len());
        }

        let mut state = State::default();
        let Parsed { program, jobs } = Parser::new(&mut state).parse(&tokens)?;

        let executor = if options.contains(Options::SKIP_JOBS) {
            debug!("Skipping {} job(s)", jobs.len());
            None
        } else {
            let mut executor = Executor::new(self.config.executor(), self.collaborators.clone())?;
            for job in jobs {
                executor.submit(job);
            }

            if let Some(deploy) = &self.config.pipeline.deploy {
                executor.submit(ScheduledJob::distributed(deploy.as_str()));
            }

            Some(executor)
        };

        let program = if options.contains(Options::SKIP_OPTIMIZE) {
            program
        } else {
            let optimized = self.pass.run(program.clone());
            if !optimize::check(&program, &optimized) {
                // Los trabajos en curso se esperan igualmente
                let report = executor.map(Executor::run_all).unwrap_or_default();
                if !report.is_success() {
                    warn!(
                        "{}: {} job(s) failed, {} cancelled before the broken pass was detected",
                        name,
                        report.failed(),
                        report.cancelled()
                    );
                }

                let pass = self.pass.name().to_string();
                return Err(CompileError::BrokenPass { pass, report });
            }

            debug!("Pass `{}` done", self.pass.name());
            optimized
        };

        let records = generate(&program);
        let report = executor.map(Executor::run_all).unwrap_or_default();

        info!(
            "{}: {} record(s), {}/{} job(s) completed",
            name,
            records.len(),
            report.completed(),
            report.outcomes.len()
        );

        Ok(Compiled {
            records,
            report,
            state,
            warnings,
        })
    }
}

/// Compila con la configuración por defecto.
pub fn compile(source: &str) -> Result<Compiled, CompileError> {
    Pipeline::default().compile("<input>", source)
}
