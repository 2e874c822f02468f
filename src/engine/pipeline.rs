// engine/pipeline.rs
//
// The StageEngine: the five stage procedures and the per-cycle driver that
// invokes them in fixed order. This is the only code that mutates the
// reservation-station pools, the ROB, and the register status table.

use crate::config::EngineConfig;
use crate::errors::PipesimError;
use crate::trace::{InstructionKind, InstructionRecord};

use super::register_status::RegisterStatusTable;
use super::reorder_buffer::ReorderBuffer;
use super::reservation_station::{FuKind, ReservationStationPool, Tag, FU_KIND_ORDER};
use super::stalls::StallCounters;
use super::timing::{TimingRecord, TimingRecorder};

struct PipelineEngine {
    instructions: Vec<InstructionRecord>,
    config: EngineConfig,

    eff_addr: ReservationStationPool,
    fp_add: ReservationStationPool,
    fp_mul: ReservationStationPool,
    int: ReservationStationPool,

    rob: ReorderBuffer,
    rst: RegisterStatusTable,
    stalls: StallCounters,
    timing: TimingRecorder,

    cycle: usize,
    next_issue: usize,
    committed: usize,
    mem_port_used: bool,
    committed_this_cycle: bool,
}

impl PipelineEngine {
    fn new(config: EngineConfig, instructions: Vec<InstructionRecord>) -> Self {
        let buffers = config.buffers;
        Self {
            instructions,
            config,
            eff_addr: ReservationStationPool::new(buffers.eff_addr_stations),
            fp_add: ReservationStationPool::new(buffers.fp_add_stations),
            fp_mul: ReservationStationPool::new(buffers.fp_mul_stations),
            int: ReservationStationPool::new(buffers.int_stations),
            rob: ReorderBuffer::new(buffers.reorder_buffer_size),
            rst: RegisterStatusTable::new(),
            stalls: StallCounters::new(),
            timing: TimingRecorder::new(),
            cycle: 0,
            next_issue: 0,
            committed: 0,
            mem_port_used: false,
            committed_this_cycle: false,
        }
    }

    fn pool(&self, kind: FuKind) -> &ReservationStationPool {
        match kind {
            FuKind::EffAddr => &self.eff_addr,
            FuKind::FpAdd => &self.fp_add,
            FuKind::FpMul => &self.fp_mul,
            FuKind::Int => &self.int,
        }
    }

    fn pool_mut(&mut self, kind: FuKind) -> &mut ReservationStationPool {
        match kind {
            FuKind::EffAddr => &mut self.eff_addr,
            FuKind::FpAdd => &mut self.fp_add,
            FuKind::FpMul => &mut self.fp_mul,
            FuKind::Int => &mut self.int,
        }
    }

    fn latency_for(&self, kind: &InstructionKind) -> usize {
        match kind {
            InstructionKind::FpAdd => self.config.latencies.fp_add,
            InstructionKind::FpSub => self.config.latencies.fp_sub,
            InstructionKind::FpMul => self.config.latencies.fp_mul,
            InstructionKind::FpDiv => self.config.latencies.fp_div,
            InstructionKind::Load
            | InstructionKind::Store
            | InstructionKind::IntAdd
            | InstructionKind::IntSub
            | InstructionKind::Branch => 1,
            InstructionKind::Unknown(_) => 1,
        }
    }

    fn resolve_tag(&self, reg: Option<&str>) -> Tag {
        let reg = match reg {
            Some(r) => r,
            None => return Tag::Ready,
        };
        match self.rst.producer_of(reg) {
            Some(rob_idx) => {
                let entry = self.rob.get(rob_idx);
                if entry.busy && !entry.ready {
                    Tag::Pending(rob_idx)
                } else {
                    Tag::Ready
                }
            },
            None => Tag::Ready,
        }
    }

    fn run(mut self) -> Result<(TimingRecorder, StallCounters), PipesimError> {
        while self.committed < self.instructions.len() {
            self.cycle += 1;
            self.mem_port_used = false;
            self.committed_this_cycle = false;

            self.issue_stage()?;
            self.execute_stage();
            self.memread_stage();
            self.writeback_stage();
            self.commit_stage();
        }
        log::info!("simulation finished after {} cycles", self.cycle);
        Ok((self.timing, self.stalls))
    }

    fn issue_stage(&mut self) -> Result<(), PipesimError> {
        if self.next_issue >= self.instructions.len() {
            return Ok(());
        }
        let instruction_id = self.next_issue;
        let kind = self.instructions[instruction_id].kind.clone();

        let fu_kind = match FuKind::for_instruction(&kind) {
            Some(fu_kind) => fu_kind,
            None => {
                let opcode = self.instructions[instruction_id].opcode.clone();
                return Err(PipesimError::UnknownOpcode {
                    line: instruction_id + 1,
                    opcode,
                });
            },
        };

        if self.rob.is_full() {
            // The head may be ready to retire this very cycle; let it commit
            // before giving up the slot as unavailable.
            self.commit_stage();
            if self.rob.is_full() {
                log::trace!("cycle {}: issue stalled, ROB full", self.cycle);
                self.stalls.record_rob_full();
                return Ok(());
            }
        }

        let slot_idx = match self.pool(fu_kind).find_free_slot() {
            Some(idx) => idx,
            None => {
                log::trace!("cycle {}: issue stalled, no free RS for {:?}", self.cycle, fu_kind);
                self.stalls.record_rs_full();
                return Ok(());
            },
        };

        let dest_reg = self.instructions[instruction_id].dest_reg.clone();
        let src1 = self.instructions[instruction_id].src_reg1.clone();
        let src2 = self.instructions[instruction_id].src_reg2.clone();

        let operand1_tag = self.resolve_tag(src1.as_deref());
        let operand2_tag = self.resolve_tag(src2.as_deref());

        let rob_idx = self.rob.allocate(instruction_id, dest_reg.clone());
        if kind.is_store() {
            // The data/value operand (src_reg1) is tracked separately; it
            // only gates Commit, never Execute.
            self.rob.get_mut(rob_idx).store_data_dependency = operand1_tag;
        }

        let latency = self.latency_for(&kind);
        self.pool_mut(fu_kind).slots[slot_idx].occupy(instruction_id, rob_idx, operand1_tag, operand2_tag, latency);

        if let Some(reg) = &dest_reg {
            self.rst.set_producer(reg, rob_idx);
        }

        self.instructions[instruction_id].issue_cycle = Some(self.cycle);
        self.next_issue += 1;
        log::debug!(
            "cycle {}: issued instruction {} to {:?} RS {} (ROB {})",
            self.cycle,
            instruction_id,
            fu_kind,
            slot_idx,
            rob_idx
        );
        Ok(())
    }

    fn execute_stage(&mut self) {
        for &fu_kind in FU_KIND_ORDER.iter() {
            let slot_count = self.pool(fu_kind).slots.len();
            for slot_idx in 0..slot_count {
                self.execute_slot(fu_kind, slot_idx);
            }
        }
    }

    fn execute_slot(&mut self, fu_kind: FuKind, slot_idx: usize) {
        let cycle = self.cycle;
        let (busy, executing, instruction_id, operand1_tag, operand2_tag, dest_rob_tag) = {
            let slot = &self.pool(fu_kind).slots[slot_idx];
            (slot.busy, slot.executing, slot.instruction_id, slot.operand1_tag, slot.operand2_tag, slot.dest_rob_tag)
        };
        if !busy {
            return;
        }
        let kind = self.instructions[instruction_id].kind.clone();

        if executing {
            let remaining = {
                let slot = &mut self.pool_mut(fu_kind).slots[slot_idx];
                slot.remaining_cycles -= 1;
                slot.remaining_cycles
            };
            if remaining == 0 {
                self.pool_mut(fu_kind).slots[slot_idx].executing = false;
                self.complete_execute(fu_kind, slot_idx, instruction_id, dest_rob_tag, &kind, cycle);
            }
            return;
        }

        if self.instructions[instruction_id].issue_cycle == Some(cycle) {
            return;
        }
        if self.instructions[instruction_id].execute_start_cycle.is_some() {
            return;
        }

        let ready = if kind.is_store() {
            operand2_tag.is_ready()
        } else {
            operand1_tag.is_ready() && operand2_tag.is_ready()
        };
        if !ready {
            log::trace!("cycle {}: instruction {} waiting on operand", cycle, instruction_id);
            self.stalls.record_true_dependency();
            return;
        }

        let latency = self.latency_for(&kind);
        self.instructions[instruction_id].execute_start_cycle = Some(cycle);
        if latency <= 1 {
            self.complete_execute(fu_kind, slot_idx, instruction_id, dest_rob_tag, &kind, cycle);
        } else {
            let slot = &mut self.pool_mut(fu_kind).slots[slot_idx];
            slot.executing = true;
            slot.remaining_cycles = latency - 1;
        }
    }

    fn complete_execute(
        &mut self,
        fu_kind: FuKind,
        slot_idx: usize,
        instruction_id: usize,
        dest_rob_tag: usize,
        kind: &InstructionKind,
        cycle: usize,
    ) {
        self.instructions[instruction_id].execute_complete_cycle = Some(cycle);
        if matches!(kind, InstructionKind::Store | InstructionKind::Branch) {
            self.rob.get_mut(dest_rob_tag).ready = true;
        }
        if !matches!(kind, InstructionKind::Load) {
            self.pool_mut(fu_kind).slots[slot_idx].reset();
        }
        log::debug!("cycle {}: instruction {} completed execute", cycle, instruction_id);
    }

    fn head_is_committable_store(&self, cycle: usize) -> bool {
        if self.rob.is_empty() {
            return false;
        }
        let head = self.rob.head();
        let entry = self.rob.get(head);
        if !entry.busy || !entry.ready || !entry.store_data_dependency.is_ready() {
            return false;
        }
        let inst = &self.instructions[entry.instruction_id];
        if !inst.kind.is_store() || self.mem_port_used {
            return false;
        }
        !Self::has_timestamp_this_cycle(inst, cycle)
    }

    fn has_timestamp_this_cycle(inst: &InstructionRecord, cycle: usize) -> bool {
        [
            inst.issue_cycle,
            inst.execute_start_cycle,
            inst.execute_complete_cycle,
            inst.mem_read_cycle,
            inst.write_back_cycle,
            inst.commit_cycle,
        ]
        .iter()
        .any(|t| *t == Some(cycle))
    }

    fn load_is_blocked_by_alias(&self, load_id: usize) -> bool {
        let load = &self.instructions[load_id];
        self.instructions[..load_id].iter().any(|earlier| {
            earlier.kind.is_store()
                && earlier.memory_address == load.memory_address
                && (earlier.execute_complete_cycle.is_none() || earlier.commit_cycle.is_none())
        })
    }

    fn free_rs_slot_for_instruction(&mut self, fu_kind: FuKind, instruction_id: usize) {
        if let Some(slot) = self.pool_mut(fu_kind).slots.iter_mut().find(|s| s.busy && s.instruction_id == instruction_id) {
            slot.reset();
        }
    }

    fn memread_stage(&mut self) {
        let cycle = self.cycle;
        let blocking_store = self.head_is_committable_store(cycle);
        let order: Vec<usize> = self.rob.iter_in_order().map(|(idx, _)| idx).collect();

        if blocking_store {
            for idx in order {
                let entry = self.rob.get(idx);
                if !entry.busy {
                    continue;
                }
                let instruction_id = entry.instruction_id;
                let inst = &self.instructions[instruction_id];
                let eligible = inst.kind.is_load()
                    && inst.execute_complete_cycle.is_some()
                    && inst.execute_complete_cycle != Some(cycle)
                    && inst.mem_read_cycle.is_none();
                if eligible {
                    log::trace!("cycle {}: load {} blocked by committing store at ROB head", cycle, instruction_id);
                    self.stalls.record_memory_conflict();
                }
            }
            return;
        }

        for idx in order {
            let entry = self.rob.get(idx);
            if !entry.busy {
                continue;
            }
            let instruction_id = entry.instruction_id;
            let inst = &self.instructions[instruction_id];
            if !inst.kind.is_load() {
                continue;
            }
            if inst.execute_complete_cycle.is_none() || inst.execute_complete_cycle == Some(cycle) {
                continue;
            }
            if inst.mem_read_cycle.is_some() {
                continue;
            }

            if self.mem_port_used {
                self.stalls.record_memory_conflict();
                return;
            }

            if self.load_is_blocked_by_alias(instruction_id) {
                self.stalls.record_true_dependency();
                continue;
            }

            self.instructions[instruction_id].mem_read_cycle = Some(cycle);
            self.mem_port_used = true;
            self.free_rs_slot_for_instruction(FuKind::EffAddr, instruction_id);
            log::debug!("cycle {}: instruction {} read memory", cycle, instruction_id);
            return;
        }
    }

    fn broadcast_clear(&mut self, rob_idx: usize) {
        for &fu_kind in FU_KIND_ORDER.iter() {
            for slot in self.pool_mut(fu_kind).slots.iter_mut() {
                if slot.busy {
                    slot.operand1_tag.clear_if_matches(rob_idx);
                    slot.operand2_tag.clear_if_matches(rob_idx);
                }
            }
        }
        self.rob.broadcast_clear(rob_idx);
    }

    fn writeback_stage(&mut self) {
        let cycle = self.cycle;
        let order: Vec<usize> = self.rob.iter_in_order().map(|(idx, _)| idx).collect();
        let mut best: Option<(usize, usize)> = None;

        for idx in order {
            let entry = self.rob.get(idx);
            if !entry.busy {
                continue;
            }
            let inst = &self.instructions[entry.instruction_id];
            if inst.kind.is_store() || inst.kind.is_branch() {
                continue;
            }
            if inst.write_back_cycle.is_some() {
                continue;
            }
            let eligible = if inst.kind.is_load() {
                inst.mem_read_cycle.is_some() && inst.mem_read_cycle != Some(cycle)
            } else {
                inst.execute_complete_cycle.is_some() && inst.execute_complete_cycle != Some(cycle)
            };
            if !eligible {
                continue;
            }
            let issue_cycle = inst.issue_cycle.unwrap_or(usize::MAX);
            match best {
                Some((_, best_issue)) if best_issue <= issue_cycle => {},
                _ => best = Some((idx, issue_cycle)),
            }
        }

        if let Some((rob_idx, _)) = best {
            let instruction_id = self.rob.get(rob_idx).instruction_id;
            self.instructions[instruction_id].write_back_cycle = Some(cycle);
            self.rob.get_mut(rob_idx).ready = true;
            self.broadcast_clear(rob_idx);
            log::debug!("cycle {}: instruction {} wrote back", cycle, instruction_id);
        }
    }

    fn commit_stage(&mut self) {
        let cycle = self.cycle;
        if self.committed_this_cycle {
            return;
        }
        if self.rob.is_empty() {
            return;
        }
        let head = self.rob.head();
        let (busy, ready, store_dependency) = {
            let entry = self.rob.get(head);
            (entry.busy, entry.ready, entry.store_data_dependency)
        };
        if !busy || !ready {
            return;
        }
        let instruction_id = self.rob.get(head).instruction_id;

        let (kind, execute_complete_cycle, mem_read_cycle, write_back_cycle, dest_reg, issue_cycle, execute_start_cycle, original_text) = {
            let inst = &self.instructions[instruction_id];
            (
                inst.kind.clone(),
                inst.execute_complete_cycle,
                inst.mem_read_cycle,
                inst.write_back_cycle,
                inst.dest_reg.clone(),
                inst.issue_cycle,
                inst.execute_start_cycle,
                inst.original_text.clone(),
            )
        };

        if execute_complete_cycle == Some(cycle) || mem_read_cycle == Some(cycle) || write_back_cycle == Some(cycle) {
            return;
        }

        if kind.is_store() {
            if !store_dependency.is_ready() {
                self.stalls.record_true_dependency();
                return;
            }
            if self.mem_port_used {
                self.stalls.record_memory_conflict();
                return;
            }
            self.mem_port_used = true;
        }

        self.instructions[instruction_id].commit_cycle = Some(cycle);
        self.rob.retire_head();
        self.committed += 1;
        self.committed_this_cycle = true;
        self.broadcast_clear(head);
        if let Some(reg) = &dest_reg {
            self.rst.clear_if_matches(reg, head);
        }

        log::info!("cycle {}: instruction {} committed", cycle, instruction_id);
        self.timing.record(TimingRecord {
            original_text,
            issue_cycle: issue_cycle.expect("committing instruction must have issued"),
            execute_start_cycle: execute_start_cycle.expect("committing instruction must have started execute"),
            execute_complete_cycle: execute_complete_cycle.expect("committing instruction must have completed execute"),
            mem_read_cycle,
            write_back_cycle,
            commit_cycle: cycle,
        });
    }
}

/// Runs the engine to completion, returning the committed timing rows and
/// the final stall counters. This is the crate's single entry point into
/// the core simulator.
pub fn simulate(config: EngineConfig, instructions: Vec<InstructionRecord>) -> Result<(TimingRecorder, StallCounters), PipesimError> {
    PipelineEngine::new(config, instructions).run()
}
