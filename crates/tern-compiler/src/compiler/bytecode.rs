// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.

use std::fmt;

use serde::Serialize;

/// A position in the instruction stream, referenced before it is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A compiled method body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
    /// Instruction index of each label; `None` for labels never placed
    pub labels: Vec<Option<usize>>,
    /// Exception table in registration order
    pub handlers: Vec<ExceptionHandler>,
    /// Local slots the body needs
    pub max_locals: u16,
}

impl Bytecode {
    /// Instruction index a label was placed at.
    pub fn position(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0 as usize).copied().flatten()
    }

    /// Number of instructions with the given opcode.
    pub fn count(&self, opcode: OpCode) -> usize {
        self.instructions
            .iter()
            .filter(|i| i.opcode == opcode)
            .count()
    }

    /// Opcodes in order, without operands.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions.iter().map(|i| i.opcode).collect()
    }
}

/// One row of the exception table, with label positions resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionHandler {
    /// First covered instruction
    pub start: usize,
    /// First instruction past the covered range
    pub end: usize,
    /// Where control goes with the exception on the stack
    pub handler: usize,
    /// Caught class; `None` catches everything
    pub catch_type: Option<String>,
}

impl ExceptionHandler {
    /// Whether instruction `pc` is protected by this entry.
    pub fn covers(&self, pc: usize) -> bool {
        self.start <= pc && pc < self.end
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }

    /// Labels this instruction can transfer control to.
    pub fn targets(&self) -> Vec<Label> {
        match &self.operand {
            Some(Operand::Label(l)) => vec![*l],
            Some(Operand::TableSwitch(t)) => {
                let mut all = vec![t.default];
                all.extend(t.targets.iter().copied());
                all
            }
            Some(Operand::LookupSwitch(l)) => {
                let mut all = vec![l.default];
                all.extend(l.pairs.iter().map(|(_, label)| *label));
                all
            }
            _ => Vec::new(),
        }
    }
}

/// Dense dispatch: `targets[selector - low]` when `low <= selector <= high`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSwitch {
    /// Target when the selector is out of range
    pub default: Label,
    /// Smallest covered value
    pub low: i32,
    /// Largest covered value
    pub high: i32,
    /// One target per value in `low..=high`
    pub targets: Vec<Label>,
}

/// Sparse dispatch over sorted `(value, target)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupSwitch {
    /// Target when no pair matches
    pub default: Label,
    /// Pairs sorted by value
    pub pairs: Vec<(i32, Label)>,
}

/// Instruction operands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operand {
    /// int constant
    Int(i32),
    /// long constant
    Long(i64),
    /// double constant
    Double(f64),
    /// Local slot
    Local(u16),
    /// In-place increment of a local
    Increment {
        /// The slot
        local: u16,
        /// Amount added
        delta: i32,
    },
    /// Branch target
    Label(Label),
    /// Field or class name
    Name(String),
    /// Method call
    Call {
        /// Method name
        name: String,
        /// Number of arguments on the stack
        argc: usize,
        /// Whether the call pushes a result
        returns: bool,
    },
    /// Dense dispatch table
    TableSwitch(TableSwitch),
    /// Sparse dispatch table
    LookupSwitch(LookupSwitch),
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum OpCode {
    // Constants
    /// Push the int/long/double operand
    Push,
    /// Push null
    PushNull,
    /// Push long 0
    LConst0,
    /// Push long 1
    LConst1,
    /// Push double 0.0
    DConst0,
    /// Push double 1.0
    DConst1,

    // Locals
    /// Push a local
    Load,
    /// Pop into a local
    Store,
    /// Add a constant to a local in place
    Inc,

    // Stack operations
    /// Pop the top value
    Pop,
    /// Duplicate the top value
    Dup,
    /// Duplicate the top value below the second: `a b -> b a b`
    DupX1,

    // Arithmetic operations
    /// Add top two values
    Add,
    /// Subtract
    Sub,
    /// Multiply
    Mul,
    /// Divide
    Div,
    /// Remainder
    Rem,
    /// Negate
    Neg,
    /// Bitwise XOR
    Xor,

    // Conversions
    /// int to long
    I2L,
    /// int to double
    I2D,
    /// long to double
    L2D,

    // Control flow
    /// Unconditional jump
    Goto,
    /// Jump if the popped value is zero/false
    IfEq,
    /// Jump if the popped value is non-zero/true
    IfNe,
    /// Pop two values, jump if equal
    IfCmpEq,
    /// Pop two values, jump if not equal
    IfCmpNe,
    /// Pop two values, jump if less than
    IfCmpLt,
    /// Pop two values, jump if greater or equal
    IfCmpGe,
    /// Pop two values, jump if greater than
    IfCmpGt,
    /// Pop two values, jump if less or equal
    IfCmpLe,
    /// Dense multi-way dispatch on the popped int
    TableSwitch,
    /// Sparse multi-way dispatch on the popped int
    LookupSwitch,

    // Objects
    /// Pop an object, push one of its fields
    GetField,
    /// Pop an object and a value, store the value in a field
    PutField,
    /// Push a new instance of the named class
    New,

    // Calls and exceptions
    /// Call a method
    Invoke,
    /// Throw the popped object
    Throw,

    // Special
    /// No operation
    Nop,
    /// Halt execution
    Halt,
}

impl OpCode {
    /// The compare-and-branch opcode taken when the comparison fails.
    pub fn negate(self) -> Self {
        match self {
            OpCode::IfEq => OpCode::IfNe,
            OpCode::IfNe => OpCode::IfEq,
            OpCode::IfCmpEq => OpCode::IfCmpNe,
            OpCode::IfCmpNe => OpCode::IfCmpEq,
            OpCode::IfCmpLt => OpCode::IfCmpGe,
            OpCode::IfCmpGe => OpCode::IfCmpLt,
            OpCode::IfCmpGt => OpCode::IfCmpLe,
            OpCode::IfCmpLe => OpCode::IfCmpGt,
            other => panic!("{other:?} is not a conditional branch"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(v) => write!(f, "{}", v),
            Operand::Long(v) => write!(f, "{}L", v),
            Operand::Double(v) => write!(f, "{:?}", v),
            Operand::Local(slot) => write!(f, "${}", slot),
            Operand::Increment { local, delta } => write!(f, "${} {:+}", local, delta),
            Operand::Label(l) => write!(f, "{}", l),
            Operand::Name(n) => write!(f, "{}", n),
            Operand::Call { name, argc, .. } => write!(f, "{}/{}", name, argc),
            Operand::TableSwitch(t) => {
                write!(f, "{}..{} [", t.low, t.high)?;
                for (i, l) in t.targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", l)?;
                }
                write!(f, "] default {}", t.default)
            }
            Operand::LookupSwitch(l) => {
                write!(f, "{} [", l.pairs.len())?;
                for (i, (v, label)) in l.pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", v, label)?;
                }
                write!(f, "] default {}", l.default)
            }
        }
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut by_position: Vec<(usize, Label)> = self
            .labels
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (p, Label(i as u32))))
            .collect();
        by_position.sort();
        let mut pending = by_position.iter().peekable();

        writeln!(f, "max_locals {}", self.max_locals)?;
        for (pc, instruction) in self.instructions.iter().enumerate() {
            while let Some((_, label)) = pending.next_if(|(p, _)| *p == pc) {
                writeln!(f, "{}:", label)?;
            }
            match &instruction.operand {
                Some(op) => writeln!(f, "{:>5}  {:?} {}", pc, instruction.opcode, op)?,
                None => writeln!(f, "{:>5}  {:?}", pc, instruction.opcode)?,
            }
        }
        for (_, label) in pending {
            writeln!(f, "{}:", label)?;
        }
        if !self.handlers.is_empty() {
            writeln!(f, "exception table:")?;
            for h in &self.handlers {
                writeln!(
                    f,
                    "  [{}, {}) -> {} {}",
                    h.start,
                    h.end,
                    h.handler,
                    h.catch_type.as_deref().unwrap_or("any")
                )?;
            }
        }
        Ok(())
    }
}
