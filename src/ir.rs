//! Representación intermedia.
//!
//! Un programa es una secuencia plana de sentencias, en el mismo orden
//! en que aparecen sus constructos en el código fuente. Ninguna fase
//! posterior reordena ni elimina sentencias; el optimizador solo puede
//! anotarlas.

use std::fmt::{self, Display};

use hts_runtime::Mode;

use crate::{memory::Handle, source::Location};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    Declaration {
        name: String,
        declared_type: String,
        value: String,
    },

    FunctionDef {
        name: String,
        params: String,
    },

    Conditional {
        condition: String,
    },

    QuantumOp {
        qubit: String,
        operation: String,
    },

    LedgerTx {
        transaction: String,
    },

    Memory(MemoryOp),

    ScheduleTask {
        mode: TaskMode,
        task: String,
    },

    /// Marca de optimización solicitada en el código fuente.
    Optimize,
}

/// Efecto ya aplicado sobre el pool de memoria.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryOp {
    Allocate { size: usize, handle: Handle },
    Deallocate { handle: String, size: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskMode {
    Sync,
    Async,
}

impl From<TaskMode> for Mode {
    fn from(mode: TaskMode) -> Self {
        match mode {
            TaskMode::Sync => Mode::Sync,
            TaskMode::Async => Mode::Async,
        }
    }
}

/// Categoría semántica de una sentencia, según la cual se genera código.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Quantum,
    Ledger,
    Declaration,
    Function,
    Allocation,
    Deallocation,
    Task(TaskMode),
}

impl Statement {
    /// Obtiene la categoría.
    ///
    /// Las condiciones y las marcas de optimización no tienen categoría
    /// y por tanto no producen registros ejecutables.
    pub fn category(&self) -> Option<Category> {
        use Statement::*;

        let category = match self {
            Declaration { .. } => Category::Declaration,
            FunctionDef { .. } => Category::Function,
            QuantumOp { .. } => Category::Quantum,
            LedgerTx { .. } => Category::Ledger,
            Memory(MemoryOp::Allocate { .. }) => Category::Allocation,
            Memory(MemoryOp::Deallocate { .. }) => Category::Deallocation,
            ScheduleTask { mode, .. } => Category::Task(*mode),
            Conditional { .. } | Optimize => return None,
        };

        Some(category)
    }
}

impl Display for Statement {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Statement::*;

        match self {
            Declaration {
                name,
                declared_type,
                value,
            } => write!(
                fmt,
                "Declared {} of type {} with value {}",
                name, declared_type, value
            ),

            FunctionDef { name, params } => {
                write!(fmt, "Defined function {} with parameters {}", name, params)
            }

            Conditional { condition } => write!(fmt, "if condition: {}", condition),

            QuantumOp { qubit, operation } => write!(
                fmt,
                "Quantum operation on qubit {} with operation {}",
                qubit, operation
            ),

            LedgerTx { transaction } => {
                write!(fmt, "Blockchain operation: {} executed", transaction)
            }

            Memory(MemoryOp::Allocate { size, handle }) => {
                write!(fmt, "Allocated {} bytes of memory at {}", size, handle)
            }

            Memory(MemoryOp::Deallocate { handle, size }) => {
                write!(fmt, "Deallocated {} bytes of memory at {}", size, handle)
            }

            ScheduleTask {
                mode: TaskMode::Sync,
                task,
            } => write!(fmt, "Synchronicity task for {} added to queue", task),

            ScheduleTask {
                mode: TaskMode::Async,
                task,
            } => write!(fmt, "Asynchronous task for {} added to queue", task),

            Optimize => fmt.write_str("Optimization requested for program"),
        }
    }
}

/// Una sentencia junto a su origen y las anotaciones de optimización.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub statement: Statement,
    pub location: Location,
    pub annotations: Vec<String>,
}

impl Node {
    pub fn new(statement: Statement, location: Location) -> Self {
        Node {
            statement,
            location,
            annotations: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    pub nodes: Vec<Node>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.nodes.iter().map(|node| &node.statement)
    }

    /// Categorías por índice, incluyendo sentencias sin categoría.
    pub fn categories(&self) -> Vec<Option<Category>> {
        self.statements().map(Statement::category).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncategorized_statements() {
        let condition = Statement::Conditional {
            condition: String::from("ready"),
        };

        assert_eq!(condition.category(), None);
        assert_eq!(Statement::Optimize.category(), None);
    }

    #[test]
    fn task_category_keeps_mode() {
        let task = Statement::ScheduleTask {
            mode: TaskMode::Async,
            task: String::from("quantum_operation"),
        };

        assert_eq!(task.category(), Some(Category::Task(TaskMode::Async)));
        assert_eq!(
            task.to_string(),
            "Asynchronous task for quantum_operation added to queue"
        );
    }

    #[test]
    fn descriptions() {
        let declaration = Statement::Declaration {
            name: String::from("a"),
            declared_type: String::from("int"),
            value: String::from("10"),
        };

        assert_eq!(declaration.to_string(), "Declared a of type int with value 10");
        assert_eq!(Mode::from(TaskMode::Sync), Mode::Sync);
    }
}
