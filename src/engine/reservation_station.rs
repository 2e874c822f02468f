// engine/reservation_station.rs
//
// Reservation stations: the four independent pools of slots that hold
// in-flight instructions between Issue and the completion of Execute (or,
// for loads, the completion of MemRead).

use crate::trace::InstructionKind;

/// The four independent reservation-station pools, and the fixed order
/// Execute visits them in each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuKind {
    EffAddr,
    FpAdd,
    FpMul,
    Int,
}

pub const FU_KIND_ORDER: [FuKind; 4] = [FuKind::EffAddr, FuKind::FpAdd, FuKind::FpMul, FuKind::Int];

impl FuKind {
    pub fn for_instruction(kind: &InstructionKind) -> Option<FuKind> {
        match kind {
            InstructionKind::Load | InstructionKind::Store => Some(FuKind::EffAddr),
            InstructionKind::FpAdd | InstructionKind::FpSub => Some(FuKind::FpAdd),
            InstructionKind::FpMul | InstructionKind::FpDiv => Some(FuKind::FpMul),
            InstructionKind::IntAdd | InstructionKind::IntSub | InstructionKind::Branch => Some(FuKind::Int),
            InstructionKind::Unknown(_) => None,
        }
    }
}

/// A ROB index used as a rename tag, or the "ready" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Ready,
    Pending(usize),
}

impl Tag {
    pub fn is_ready(&self) -> bool {
        matches!(self, Tag::Ready)
    }

    pub fn rob_index(&self) -> Option<usize> {
        match self {
            Tag::Ready => None,
            Tag::Pending(idx) => Some(*idx),
        }
    }

    /// Clears this tag to Ready if it currently points at `rob_index`.
    pub fn clear_if_matches(&mut self, rob_index: usize) {
        if *self == Tag::Pending(rob_index) {
            *self = Tag::Ready;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReservationStationSlot {
    pub busy: bool,
    pub instruction_id: usize,
    pub operand1_tag: Tag,
    pub operand2_tag: Tag,
    pub dest_rob_tag: usize,
    pub executing: bool,
    pub remaining_cycles: usize,
}

impl ReservationStationSlot {
    pub fn free() -> Self {
        Self {
            busy: false,
            instruction_id: 0,
            operand1_tag: Tag::Ready,
            operand2_tag: Tag::Ready,
            dest_rob_tag: 0,
            executing: false,
            remaining_cycles: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::free();
    }

    pub fn occupy(&mut self, instruction_id: usize, dest_rob_tag: usize, operand1_tag: Tag, operand2_tag: Tag, latency: usize) {
        self.busy = true;
        self.instruction_id = instruction_id;
        self.dest_rob_tag = dest_rob_tag;
        self.operand1_tag = operand1_tag;
        self.operand2_tag = operand2_tag;
        self.executing = false;
        self.remaining_cycles = latency;
    }
}

/// A pool of reservation stations of one kind.
#[derive(Debug, Clone)]
pub struct ReservationStationPool {
    pub slots: Vec<ReservationStationSlot>,
}

impl ReservationStationPool {
    pub fn new(size: usize) -> Self {
        Self {
            slots: (0..size).map(|_| ReservationStationSlot::free()).collect(),
        }
    }

    pub fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| !slot.busy)
    }
}
