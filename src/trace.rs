// trace.rs
//
// Parsing of the instruction trace format into InstructionRecords. This is
// an external collaborator to the pipeline engine (see engine::pipeline):
// it never touches cycle counters or reservation stations, only the static,
// parse-time shape of an instruction.
//
// Grammar (one instruction per line):
//   <opcode> <operands>:<mem_addr>
//
// Three-register form (arith, branch): `op rd, rs1, rs2`
// Memory form (load/store):            `op r, offset(rbase)`

use crate::errors::PipesimError;
use std::io::BufRead;

/// The classes of instruction this simulator times. `Unknown` carries the
/// opcode text so the engine can report exactly which one it choked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    Load,
    Store,
    FpAdd,
    FpSub,
    FpMul,
    FpDiv,
    IntAdd,
    IntSub,
    Branch,
    Unknown(String),
}

impl InstructionKind {
    pub fn from_opcode(opcode: &str) -> Self {
        match opcode {
            "lw" | "flw" => InstructionKind::Load,
            "sw" | "fsw" => InstructionKind::Store,
            "fadd.s" => InstructionKind::FpAdd,
            "fsub.s" => InstructionKind::FpSub,
            "fmul.s" => InstructionKind::FpMul,
            "fdiv.s" => InstructionKind::FpDiv,
            "add" => InstructionKind::IntAdd,
            "sub" => InstructionKind::IntSub,
            "beq" | "bne" => InstructionKind::Branch,
            other => InstructionKind::Unknown(other.to_string()),
        }
    }

    pub fn is_load(&self) -> bool {
        matches!(self, InstructionKind::Load)
    }

    pub fn is_store(&self) -> bool {
        matches!(self, InstructionKind::Store)
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, InstructionKind::Branch)
    }

    pub fn has_write_back(&self) -> bool {
        !matches!(self, InstructionKind::Store | InstructionKind::Branch)
    }
}

/// One instruction from the trace, with the per-stage timestamps the
/// engine fills in as it progresses through the pipeline. `None` is the
/// "unset" sentinel for every timestamp.
#[derive(Debug, Clone)]
pub struct InstructionRecord {
    pub opcode: String,
    pub kind: InstructionKind,
    pub dest_reg: Option<String>,
    /// For STORE this is the data/value register (see DESIGN.md for why
    /// this is the opposite of the memory-form grammar's left-to-right
    /// reading order).
    pub src_reg1: Option<String>,
    /// For STORE this is the address-base register.
    pub src_reg2: Option<String>,
    pub memory_address: i64,
    pub original_text: String,

    pub issue_cycle: Option<usize>,
    pub execute_start_cycle: Option<usize>,
    pub execute_complete_cycle: Option<usize>,
    pub mem_read_cycle: Option<usize>,
    pub write_back_cycle: Option<usize>,
    pub commit_cycle: Option<usize>,
}

impl InstructionRecord {
    fn new(opcode: String, kind: InstructionKind, original_text: String, memory_address: i64) -> Self {
        Self {
            opcode,
            kind,
            dest_reg: None,
            src_reg1: None,
            src_reg2: None,
            memory_address,
            original_text,
            issue_cycle: None,
            execute_start_cycle: None,
            execute_complete_cycle: None,
            mem_read_cycle: None,
            write_back_cycle: None,
            commit_cycle: None,
        }
    }
}

fn trimmed(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Parses one trace line. `line_no` is 1-based, for error messages.
pub fn parse_instruction_line(raw: &str, line_no: usize) -> Result<InstructionRecord, PipesimError> {
    let original_text = raw.trim_end_matches(['\r', '\n']).to_string();
    let line = original_text.trim();

    let colon = line.rfind(':').ok_or_else(|| PipesimError::MalformedTrace {
        line: line_no,
        reason: "missing trailing ':<mem_addr>'".to_string(),
    })?;
    let (body, addr_text) = line.split_at(colon);
    let addr_text = &addr_text[1..];
    let memory_address: i64 = addr_text.trim().parse().map_err(|_| PipesimError::MalformedTrace {
        line: line_no,
        reason: format!("memory address '{}' is not an integer", addr_text.trim()),
    })?;

    let mut parts = body.trim().splitn(2, char::is_whitespace);
    let opcode = parts.next().unwrap_or("").to_string();
    if opcode.is_empty() {
        return Err(PipesimError::MalformedTrace {
            line: line_no,
            reason: "missing opcode".to_string(),
        });
    }
    let operands = parts.next().unwrap_or("").trim();
    let kind = InstructionKind::from_opcode(&opcode);

    let mut inst = InstructionRecord::new(opcode, kind.clone(), original_text.clone(), memory_address);

    if let (Some(open), Some(close)) = (operands.find('('), operands.find(')')) {
        // Memory form: `r, offset(rbase)`
        let comma = operands.find(',').ok_or_else(|| PipesimError::MalformedTrace {
            line: line_no,
            reason: "memory-form operand missing comma".to_string(),
        })?;
        let r = trimmed(&operands[..comma]);
        let rbase = trimmed(&operands[open + 1..close]);

        match kind {
            InstructionKind::Load => {
                inst.dest_reg = r;
                inst.src_reg1 = rbase;
                inst.src_reg2 = None;
            },
            InstructionKind::Store => {
                inst.dest_reg = None;
                inst.src_reg1 = r; // data/value
                inst.src_reg2 = rbase; // address base
            },
            _ => {
                return Err(PipesimError::MalformedTrace {
                    line: line_no,
                    reason: format!("opcode '{}' does not take memory-form operands", inst.opcode),
                });
            },
        }
    } else {
        // Three-register form: `rd, rs1, rs2` or `rs1, rs2` for branches.
        let fields: Vec<&str> = operands.split(',').collect();
        if kind.is_branch() {
            inst.dest_reg = None;
            inst.src_reg1 = fields.first().and_then(|s| trimmed(s));
            inst.src_reg2 = fields.get(1).and_then(|s| trimmed(s));
        } else {
            inst.dest_reg = fields.first().and_then(|s| trimmed(s));
            inst.src_reg1 = fields.get(1).and_then(|s| trimmed(s));
            inst.src_reg2 = fields.get(2).and_then(|s| trimmed(s));
        }
    }

    Ok(inst)
}

/// Parses an entire trace, one instruction per non-blank line.
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<InstructionRecord>, PipesimError> {
    let mut instructions = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| PipesimError::MalformedTrace {
            line: idx + 1,
            reason: format!("I/O error reading trace: {}", e),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        instructions.push(parse_instruction_line(&line, idx + 1)?);
    }
    Ok(instructions)
}
