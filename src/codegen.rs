//! Generación de código.
//!
//! Cada sentencia con categoría produce exactamente un registro
//! ejecutable, en el mismo orden del programa. Las sentencias sin
//! categoría no producen nada. La generación es determinista.

use std::{
    fmt::{self, Display},
    io::{self, Write},
};

use log::debug;

use crate::ir::{Category, Program, TaskMode};

impl Category {
    /// Prefijo con el que se rotula el registro.
    pub fn prefix(self) -> &'static str {
        use Category::*;

        match self {
            Quantum => "Quantum Operation",
            Ledger => "Blockchain Transaction",
            Declaration => "Declare Variable",
            Function => "Define Function",
            Allocation => "Memory Allocation",
            Deallocation => "Memory Deallocation",
            Task(TaskMode::Sync) => "Sync Task Scheduled",
            Task(TaskMode::Async) => "Async Task Scheduled",
        }
    }
}

impl Display for Category {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.prefix())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutableRecord {
    pub category: Category,
    pub line: String,
}

impl Display for ExecutableRecord {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.line)
    }
}

pub fn generate(program: &Program) -> Vec<ExecutableRecord> {
    let records: Vec<_> = program
        .nodes
        .iter()
        .filter_map(|node| {
            let category = node.statement.category()?;

            let mut line = format!("{}: ", category.prefix());
            for annotation in &node.annotations {
                line.push_str(annotation);
                line.push_str(": ");
            }

            line.push_str(&node.statement.to_string());
            Some(ExecutableRecord { category, line })
        })
        .collect();

    debug!(
        "Generated {} record(s), {} statement(s) without category",
        records.len(),
        program.len() - records.len()
    );

    records
}

/// Escribe un registro por línea.
pub fn emit<W: Write>(records: &[ExecutableRecord], output: &mut W) -> io::Result<()> {
    for record in records {
        writeln!(output, "{}", record)?;
    }

    output.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::tokenize, optimize::{Annotate, Pass}, parse::parse, source::Source};

    fn records(text: &str) -> Vec<ExecutableRecord> {
        let tokens = tokenize(&Source::new("<test>", text)).tokens;
        generate(&parse(&tokens).unwrap().0.program)
    }

    #[test]
    fn quantum_then_ledger() {
        let records = records("quantum q1 op ; blockchain tx1 ;");
        let categories: Vec<_> = records.iter().map(|record| record.category).collect();

        assert_eq!(categories, vec![Category::Quantum, Category::Ledger]);
        assert_eq!(
            records[0].line,
            "Quantum Operation: Quantum operation on qubit q1 with operation op"
        );
        assert_eq!(
            records[1].line,
            "Blockchain Transaction: Blockchain operation: tx1 executed"
        );
    }

    #[test]
    fn uncategorized_statements_are_dropped() {
        let records = records("if ready { let a : int = 10 ; } optimize ;");

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].line,
            "Declare Variable: Declared a of type int with value 10"
        );
    }

    #[test]
    fn annotations_are_rendered() {
        let tokens = tokenize(&Source::new("<test>", "async job ; optimize ;")).tokens;
        let program = Annotate.run(parse(&tokens).unwrap().0.program);
        let records = generate(&program);

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].line,
            "Async Task Scheduled: Optimized: Asynchronous task for job added to queue"
        );
    }

    #[test]
    fn emit_one_per_line() {
        let records = records("fn f x ; memory allocate 32 ; memory deallocate 0x1000 ;");
        let mut output = Vec::new();
        emit(&records, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Define Function: Defined function f with parameters x\n\
             Memory Allocation: Allocated 32 bytes of memory at 0x1000\n\
             Memory Deallocation: Deallocated 32 bytes of memory at 0x1000\n"
        );
    }

    #[test]
    fn deterministic() {
        let text = "let a : int = 1 ; sync job ;";
        assert_eq!(records(text), records(text));
    }
}
