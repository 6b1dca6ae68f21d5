use std::sync::{Arc, Mutex};

use hts_runtime::{Args, Collaborator, CollaboratorError, Collaborators, Mode, Status};
use htsc::{
    compile,
    config::Config,
    ir::{Category, MemoryOp, Statement, TaskMode},
    lex::{tokenize, Keyword},
    parse::{ParseError, Parser, State},
    source::Source,
    CompileError, Pipeline,
};

struct Recording(Mutex<Vec<String>>);

impl Collaborator for Recording {
    fn execute(&self, _kind: &str, args: &Args) -> Result<String, CollaboratorError> {
        let operation = args
            .get("operation")
            .cloned()
            .ok_or(CollaboratorError::MissingArg("operation"))?;

        self.0.lock().unwrap().push(operation.clone());
        Ok(operation)
    }
}

struct Offline;

impl Collaborator for Offline {
    fn execute(&self, _kind: &str, _args: &Args) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Rejected(String::from("ledger offline")))
    }
}

#[test]
fn records_follow_source_order() {
    let compiled = compile(
        "
        blockchain tx0 ;
        let a : int = 10 ;
        fn main x ;
        if ( a > 1 ) { quantum q1 hadamard ; }
        memory allocate 64 ;
        async quantum_operation ;
        memory deallocate 0x1000 ;
        sync quantum_operation ;
        ",
    )
    .unwrap();

    let categories: Vec<Category> = compiled.records.iter().map(|record| record.category).collect();
    assert_eq!(
        categories,
        vec![
            Category::Ledger,
            Category::Declaration,
            Category::Function,
            Category::Quantum,
            Category::Allocation,
            Category::Task(TaskMode::Async),
            Category::Deallocation,
            Category::Task(TaskMode::Sync),
        ]
    );
}

#[test]
fn declaration_yields_symbol_and_record() {
    let compiled = compile("let a : int = 10 ;").unwrap();

    let symbol = compiled.state.symbols.lookup("a").unwrap();
    assert_eq!(symbol.declared_type, "int");
    assert_eq!(symbol.value, "10");

    let declarations = compiled
        .records
        .iter()
        .filter(|record| record.category == Category::Declaration)
        .count();

    assert_eq!(declarations, 1);
}

#[test]
fn quantum_record_precedes_ledger_record() {
    let compiled = compile("quantum q1 op ;\nblockchain tx1 ;").unwrap();

    assert_eq!(compiled.records.len(), 2);
    assert_eq!(compiled.records[0].category, Category::Quantum);
    assert_eq!(compiled.records[1].category, Category::Ledger);
}

#[test]
fn unrecognized_tokens_are_skipped() {
    let source = Source::new("skip.hts", "42 hello ; let a : int = 10 ; + - world");
    let tokens = tokenize(&source).tokens;

    let mut state = State::default();
    let parsed = Parser::new(&mut state).parse(&tokens).unwrap();

    assert_eq!(parsed.program.len(), 1);
    assert!(parsed.program.len() < tokens.len());
}

#[test]
fn truncated_program_fails_cleanly() {
    match compile("let a : int = 10 ; quantum q1") {
        Err(CompileError::Parse(error)) => {
            assert_eq!(
                *error.val(),
                ParseError::OutOfTokens {
                    keyword: Keyword::Quantum,
                    expected: 2,
                    found: 1,
                }
            );

            assert_eq!(error.location().start().line(), 1);
            assert_eq!(error.location().start().column(), 20);
        }

        other => panic!("unexpected result {:?}", other.map(|compiled| compiled.records)),
    }
}

#[test]
fn reparse_allocates_independently() {
    let source = Source::new("alloc.hts", "memory allocate 1024 ;");
    let tokens = tokenize(&source).tokens;
    let mut state = State::default();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let parsed = Parser::new(&mut state).parse(&tokens).unwrap();
        match &parsed.program.nodes[0].statement {
            Statement::Memory(MemoryOp::Allocate { handle, size: 1024 }) => handles.push(*handle),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    assert_ne!(handles[0], handles[1]);
    assert_eq!(state.memory.total_bytes(), 2048);

    for handle in &handles {
        assert_eq!(state.memory.free(&handle.to_string()), Ok(1024));
    }

    let free_again = format!("memory deallocate {} ;", handles[1]);
    let tokens = tokenize(&Source::new("free.hts", &free_again)).tokens;

    let error = Parser::new(&mut state).parse(&tokens).unwrap_err();
    assert_eq!(
        error.into_inner(),
        ParseError::UnknownAllocationHandle(handles[1].to_string())
    );
}

#[test]
fn program_without_jobs_joins_immediately() {
    let compiled = compile("let a : int = 10 ;").unwrap();

    assert!(compiled.report.outcomes.is_empty());
    assert!(compiled.report.is_success());
}

#[test]
fn sync_jobs_run_in_submission_order() {
    let recording = Arc::new(Recording(Mutex::new(Vec::new())));
    let mut collaborators = Collaborators::stubs(0);
    collaborators.quantum = recording.clone();

    let pipeline = Pipeline::default().with_collaborators(collaborators);
    let compiled = pipeline
        .compile(
            "order.hts",
            "quantum q1 first ; sync quantum_operation ;
             quantum q1 second ; sync quantum_operation ;
             quantum q1 third ; sync quantum_operation ;",
        )
        .unwrap();

    assert_eq!(*recording.0.lock().unwrap(), vec!["first", "second", "third"]);
    assert!(compiled.report.outcomes.iter().all(|outcome| outcome.mode == Mode::Sync));
    assert!(compiled.report.is_success());
}

#[test]
fn failed_job_does_not_abort_compilation() {
    let mut collaborators = Collaborators::default();
    collaborators.ledger = Arc::new(Offline);

    let mut config = Config::default();
    config.executor.workers = 2;

    let pipeline = Pipeline::new(config).with_collaborators(collaborators);
    let compiled = pipeline
        .compile(
            "isolation.hts",
            "quantum q1 x ; blockchain tx1 ;
             async blockchain_transaction ;
             async quantum_operation ;
             async quantum_operation ;",
        )
        .unwrap();

    let report = &compiled.report;
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.completed(), 2);
    assert!(matches!(
        report.outcomes[0].status,
        Status::Failed(hts_runtime::JobError::Collaborator(CollaboratorError::Rejected(_)))
    ));
    assert_eq!(compiled.records.len(), 5);
}
