//! Análisis sintáctico.
//!
//! # Gramática posicional
//! El parser recorre la secuencia de tokens con un único cursor que
//! nunca retrocede. Cada palabra clave reconocida al inicio de un
//! constructo consume una cantidad fija de tokens siguientes (ver
//! [`width()`]), sin importar qué contienen. Por ejemplo, una
//! declaración siempre consume `let nombre : tipo = valor`, aunque el
//! valor sea en realidad el inicio de una expresión más larga; el resto
//! de esa expresión se descarta token por token.
//!
//! Un token inicial que no es una palabra clave de constructo avanza el
//! cursor en exactamente una posición y no produce sentencia alguna.
//!
//! # Efectos
//! El parsing no es una traducción pura. Las declaraciones modifican la
//! tabla de símbolos y las directivas de memoria asignan o liberan en el
//! pool en el momento en que se reconocen. Las directivas `sync` y
//! `async` además producen trabajos para el ejecutor.
//!
//! # Errores
//! Cualquier error aborta el análisis completo. Un constructo truncado
//! por el fin de la entrada produce [`ParseError::OutOfTokens`].

use std::collections::BTreeMap;

use hts_runtime::ScheduledJob;
use log::{debug, info};
use thiserror::Error;

use crate::{
    ir::{MemoryOp, Node, Program, Statement, TaskMode},
    lex::{Keyword, Kind, Token},
    memory::{MemoryError, MemoryPool},
    source::{Located, Location},
    symbols::SymbolTable,
};

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("`{keyword}` expects {expected} more token(s), found {found}")]
    OutOfTokens {
        keyword: Keyword,
        expected: usize,
        found: usize,
    },

    #[error("Unknown allocation handle `{0}`")]
    UnknownAllocationHandle(String),

    #[error("Expected `allocate` or `deallocate`, found {0}")]
    BadMemoryDirective(Token),

    #[error("Expected an allocation size in bytes, found `{0}`")]
    BadAllocationSize(String),

    #[error("Memory pool error: {0}")]
    Memory(MemoryError),
}

impl From<MemoryError> for ParseError {
    fn from(error: MemoryError) -> Self {
        match error {
            MemoryError::UnknownHandle(handle) => ParseError::UnknownAllocationHandle(handle),
            error => ParseError::Memory(error),
        }
    }
}

pub type Parse<T> = Result<T, Located<ParseError>>;

/// Estado mutable de una compilación.
///
/// Solo el parser escribe sobre este estado, y lo hace antes de que
/// cualquier trabajo concurrente inicie.
#[derive(Clone, Debug, Default)]
pub struct State {
    pub symbols: SymbolTable,
    pub memory: MemoryPool,

    /// Última operación aplicada a cada qubit.
    pub qubits: BTreeMap<String, String>,

    /// Estado de cada transacción registrada.
    pub transactions: BTreeMap<String, String>,

    last_quantum: Option<(String, String)>,
    last_transaction: Option<String>,
}

/// Resultado del análisis sintáctico.
#[derive(Clone, Debug, Default)]
pub struct Parsed {
    pub program: Program,
    pub jobs: Vec<ScheduledJob>,
}

/// Cantidad de tokens que consume cada constructo luego de su palabra clave.
///
/// `None` indica que la palabra clave no puede iniciar un constructo.
pub fn width(keyword: Keyword) -> Option<usize> {
    use Keyword::*;

    match keyword {
        Let => Some(5),
        Fn | If | Quantum | Memory => Some(2),
        Blockchain | Sync | Async => Some(1),
        Optimize => Some(0),
        Allocate | Deallocate => None,
    }
}

/// Analiza una secuencia de tokens con estado nuevo.
pub fn parse(tokens: &[Located<Token>]) -> Parse<(Parsed, State)> {
    let mut state = State::default();
    let parsed = Parser::new(&mut state).parse(tokens)?;

    Ok((parsed, state))
}

pub struct Parser<'s> {
    state: &'s mut State,
}

impl<'s> Parser<'s> {
    /// Construye un parser que escribe sobre un estado existente.
    ///
    /// Analizar dos veces sobre el mismo estado acumula símbolos y
    /// asignaciones de ambas pasadas.
    pub fn new(state: &'s mut State) -> Self {
        Parser { state }
    }

    pub fn parse(&mut self, tokens: &[Located<Token>]) -> Parse<Parsed> {
        let mut parsed = Parsed::default();
        let mut cursor = 0;

        while let Some(lead) = tokens.get(cursor) {
            let keyword = match lead.val().kind() {
                Kind::Keyword(keyword) => keyword,
                _ => {
                    cursor += 1;
                    continue;
                }
            };

            let width = match width(keyword) {
                Some(width) => width,
                None => {
                    cursor += 1;
                    continue;
                }
            };

            let construct = tokens.get(cursor..=cursor + width).ok_or_else(|| {
                let error = ParseError::OutOfTokens {
                    keyword,
                    expected: width,
                    found: tokens.len() - cursor - 1,
                };

                Located::at(error, lead.location().clone())
            })?;

            let statement = self.construct(keyword, construct, &mut parsed.jobs)?;
            let location = match construct.last() {
                Some(last) => Location::span(lead.location().clone(), last.location()),
                None => lead.location().clone(),
            };

            debug!("{}: {}", location, statement);
            parsed.program.nodes.push(Node::new(statement, location));

            cursor += width + 1;
        }

        info!(
            "Parsed {} statement(s) and {} job(s) from {} token(s)",
            parsed.program.len(),
            parsed.jobs.len(),
            tokens.len()
        );

        Ok(parsed)
    }

    /// Reconoce un constructo completo, cuyo ancho ya fue verificado.
    fn construct(
        &mut self,
        keyword: Keyword,
        construct: &[Located<Token>],
        jobs: &mut Vec<ScheduledJob>,
    ) -> Parse<Statement> {
        use Keyword::*;

        let statement = match (keyword, construct) {
            (Let, [_, name, _, declared_type, _, value]) => {
                self.state
                    .symbols
                    .declare(text(name), text(declared_type), text(value));

                Statement::Declaration {
                    name: text(name),
                    declared_type: text(declared_type),
                    value: text(value),
                }
            }

            (Fn, [_, name, params]) => Statement::FunctionDef {
                name: text(name),
                params: text(params),
            },

            (If, [_, condition, _]) => Statement::Conditional {
                condition: text(condition),
            },

            (Quantum, [_, qubit, operation]) => {
                let (qubit, operation) = (text(qubit), text(operation));
                self.state.qubits.insert(qubit.clone(), operation.clone());
                self.state.last_quantum = Some((qubit.clone(), operation.clone()));

                Statement::QuantumOp { qubit, operation }
            }

            (Blockchain, [_, transaction]) => {
                let transaction = text(transaction);
                self.state
                    .transactions
                    .insert(transaction.clone(), String::from("executed"));
                self.state.last_transaction = Some(transaction.clone());

                Statement::LedgerTx { transaction }
            }

            (Sync, [_, task]) => self.schedule(TaskMode::Sync, text(task), jobs),
            (Async, [_, task]) => self.schedule(TaskMode::Async, text(task), jobs),

            (Memory, [_, directive, argument]) => Statement::Memory(self.memory(directive, argument)?),

            (Optimize, [_]) => Statement::Optimize,

            // El ancho se verifica antes de llegar aquí
            _ => unreachable!(),
        };

        Ok(statement)
    }

    fn schedule(&mut self, mode: TaskMode, task: String, jobs: &mut Vec<ScheduledJob>) -> Statement {
        let mut job = ScheduledJob::new(mode.into(), task.clone());

        if let Some((qubit, operation)) = &self.state.last_quantum {
            job = job.with_arg("qubit", qubit).with_arg("operation", operation);
        }

        if let Some(transaction) = &self.state.last_transaction {
            job = job.with_arg("transaction", transaction);
        }

        jobs.push(job);
        Statement::ScheduleTask { mode, task }
    }

    fn memory(
        &mut self,
        directive: &Located<Token>,
        argument: &Located<Token>,
    ) -> Parse<MemoryOp> {
        let fail = |error: ParseError| Located::at(error, argument.location().clone());

        if directive.val().is(Keyword::Allocate) {
            let size = argument
                .val()
                .text()
                .parse::<usize>()
                .map_err(|_| fail(ParseError::BadAllocationSize(text(argument))))?;

            let handle = self
                .state
                .memory
                .allocate(size)
                .map_err(|error| fail(error.into()))?;

            Ok(MemoryOp::Allocate { size, handle })
        } else if directive.val().is(Keyword::Deallocate) {
            let handle = text(argument);
            let size = self
                .state
                .memory
                .free(&handle)
                .map_err(|error| fail(error.into()))?;

            Ok(MemoryOp::Deallocate { handle, size })
        } else {
            let error = ParseError::BadMemoryDirective(directive.val().clone());
            Err(Located::at(error, directive.location().clone()))
        }
    }
}

fn text(token: &Located<Token>) -> String {
    token.val().text().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::tokenize, source::Source};
    use hts_runtime::Mode;

    fn tokens(text: &str) -> Vec<Located<Token>> {
        tokenize(&Source::new("<test>", text)).tokens
    }

    fn parse_str(text: &str) -> Parse<(Parsed, State)> {
        parse(&tokens(text))
    }

    #[test]
    fn declaration_updates_symbol_table() {
        let (parsed, state) = parse_str("let a : int = 10 ;").unwrap();

        assert_eq!(parsed.program.len(), 1);
        let symbol = state.symbols.lookup("a").unwrap();
        assert_eq!(symbol.declared_type, "int");
        assert_eq!(symbol.value, "10");
    }

    #[test]
    fn declaration_takes_first_value_token_only() {
        let (parsed, state) = parse_str("let result : int = a + b ;").unwrap();

        assert_eq!(parsed.program.len(), 1);
        assert_eq!(state.symbols.lookup("result").unwrap().value, "a");
    }

    #[test]
    fn unrecognized_leading_tokens_are_skipped() {
        let tokens = tokens("foo 42 ; allocate let x : y = z ;");
        let (parsed, _) = parse(&tokens).unwrap();

        assert_eq!(parsed.program.len(), 1);
        assert!(parsed.program.len() < tokens.len());
        assert!(matches!(
            parsed.program.nodes[0].statement,
            Statement::Declaration { .. }
        ));
    }

    #[test]
    fn truncated_construct_is_out_of_tokens() {
        let error = parse_str("blockchain tx1 ; let a : int").unwrap_err();

        assert_eq!(
            *error.val(),
            ParseError::OutOfTokens {
                keyword: Keyword::Let,
                expected: 5,
                found: 3,
            }
        );
        assert_eq!(error.location().start().column(), 18);

        assert!(matches!(
            parse_str("quantum q1").unwrap_err().into_inner(),
            ParseError::OutOfTokens { keyword: Keyword::Quantum, expected: 2, found: 1 }
        ));
    }

    #[test]
    fn fixed_widths() {
        let (parsed, state) =
            parse_str("fn add ( x ) ; if ready { quantum q1 hadamard ; blockchain tx7 ; } optimize ;")
                .unwrap();

        let statements: Vec<_> = parsed.program.statements().cloned().collect();
        assert_eq!(
            statements,
            vec![
                Statement::FunctionDef {
                    name: String::from("add"),
                    params: String::from("("),
                },
                Statement::Conditional {
                    condition: String::from("ready"),
                },
                Statement::QuantumOp {
                    qubit: String::from("q1"),
                    operation: String::from("hadamard"),
                },
                Statement::LedgerTx {
                    transaction: String::from("tx7"),
                },
                Statement::Optimize,
            ]
        );

        assert_eq!(state.qubits.get("q1").map(String::as_str), Some("hadamard"));
        assert_eq!(state.transactions.get("tx7").map(String::as_str), Some("executed"));
    }

    #[test]
    fn memory_directives_apply_immediately() {
        let (parsed, state) =
            parse_str("memory allocate 1024 ; memory allocate 8 ; memory deallocate 0x1000 ;")
                .unwrap();

        assert_eq!(parsed.program.len(), 3);
        assert_eq!(state.memory.live().count(), 1);
        assert_eq!(state.memory.total_bytes(), 8);
        assert_eq!(
            parsed.program.nodes[2].statement,
            Statement::Memory(MemoryOp::Deallocate {
                handle: String::from("0x1000"),
                size: 1024,
            })
        );
    }

    #[test]
    fn reparsing_allocates_again() {
        let tokens = tokens("memory allocate 1024 ;");
        let mut state = State::default();

        let handles: Vec<String> = (0..2)
            .map(|_| {
                let parsed = Parser::new(&mut state).parse(&tokens).unwrap();
                match &parsed.program.nodes[0].statement {
                    Statement::Memory(MemoryOp::Allocate { handle, .. }) => handle.to_string(),
                    other => panic!("unexpected {:?}", other),
                }
            })
            .collect();

        assert_ne!(handles[0], handles[1]);

        for handle in &handles {
            let free = format!("memory deallocate {} ;", handle);
            Parser::new(&mut state).parse(&self::tokens(&free)).unwrap();
        }

        let again = format!("memory deallocate {} ;", handles[0]);
        let error = Parser::new(&mut state)
            .parse(&self::tokens(&again))
            .unwrap_err();

        assert_eq!(
            error.into_inner(),
            ParseError::UnknownAllocationHandle(handles[0].clone())
        );
    }

    #[test]
    fn bad_memory_directives() {
        assert!(matches!(
            parse_str("memory reserve 10 ;").unwrap_err().into_inner(),
            ParseError::BadMemoryDirective(_)
        ));

        assert_eq!(
            parse_str("memory allocate lots ;").unwrap_err().into_inner(),
            ParseError::BadAllocationSize(String::from("lots"))
        );
    }

    #[test]
    fn schedule_directives_emit_jobs_with_context() {
        let (parsed, _) = parse_str(
            "sync early ; quantum q1 perform_op ; blockchain tx1 ; async quantum_operation ;",
        )
        .unwrap();

        assert_eq!(parsed.jobs.len(), 2);
        assert_eq!(parsed.jobs[0].mode, Mode::Sync);
        assert!(parsed.jobs[0].args.is_empty());

        let job = &parsed.jobs[1];
        assert_eq!(job.mode, Mode::Async);
        assert_eq!(job.payload, "quantum_operation");
        assert_eq!(job.args.get("qubit").map(String::as_str), Some("q1"));
        assert_eq!(job.args.get("operation").map(String::as_str), Some("perform_op"));
        assert_eq!(job.args.get("transaction").map(String::as_str), Some("tx1"));
    }

    #[test]
    fn capitalized_keywords_are_plain_tokens() {
        let (parsed, state) = parse_str("Quantum q1 op ; LET a : int = 1 ; note Sync").unwrap();

        assert!(parsed.program.is_empty());
        assert!(parsed.jobs.is_empty());
        assert!(state.qubits.is_empty());
        assert!(state.symbols.is_empty());
    }

    #[test]
    fn unicode_declaration() {
        let (parsed, state) = parse_str("let größe : int = 1 ;").unwrap();

        assert_eq!(parsed.program.len(), 1);
        assert_eq!(state.symbols.len(), 1);

        let symbol = state.symbols.lookup("größe").unwrap();
        assert_eq!(symbol.declared_type, "int");
        assert_eq!(symbol.value, "1");
    }

    #[test]
    fn empty_input() {
        let (parsed, state) = parse_str("").unwrap();
        assert!(parsed.program.is_empty());
        assert!(state.symbols.is_empty());
    }
}
