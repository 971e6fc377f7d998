use tracing::trace;

use crate::{bits::Bits, emotion_engine::bus::Bus};

use super::{control::Exception, instruction::Instruction, Core};

impl Core {
    pub fn step(&mut self, cycles: u64, bus: &mut Bus) {
        for _ in 0..cycles {
            self.step_instruction(bus);
        }
    }

    /// Retire one instruction, resolve a pending branch, and deliver any
    /// exception or interrupt that results.
    pub fn step_instruction(&mut self, bus: &mut Bus) {
        let program_counter = self.state.program_counter;
        let in_delay_slot = self.state.is_branching;
        let branch_target = self.state.branch_target;
        if in_delay_slot {
            self.cancel_branch();
        }
        match self.execute(bus, program_counter, in_delay_slot) {
            Ok(()) => {
                if in_delay_slot {
                    self.state.program_counter = branch_target;
                }
            }
            Err(exception) => {
                self.cancel_branch();
                self.state.program_counter =
                    self.state
                        .control
                        .raise(exception, program_counter, in_delay_slot);
            }
        }
        self.state.control.step(1);
        if self.state.control.update_interrupts() {
            let in_delay_slot = self.state.is_branching;
            self.cancel_branch();
            self.state.program_counter = self.state.control.raise(
                Exception::Interrupt,
                self.state.program_counter,
                in_delay_slot,
            );
        }
        self.mode = self.state.control.mode();
    }

    fn execute(
        &mut self,
        bus: &mut Bus,
        program_counter: u32,
        in_delay_slot: bool,
    ) -> Result<(), Exception> {
        if program_counter.bits(0..2) != 0 {
            return Err(Exception::AddressErrorLoad(program_counter));
        }
        let data: u32 = self.read_virtual(bus, program_counter);
        if in_delay_slot {
            self.state.next_instruction = data;
        } else {
            self.state.current_instruction = data;
        }
        if data == 0 {
            self.state.program_counter = program_counter.wrapping_add(4);
            return Ok(());
        }
        let instruction = Instruction::decode(data);
        trace!("{:#010x}: {}", program_counter, instruction);
        self.interpret_instruction(instruction, bus)
    }
}

#[cfg(test)]
mod tests {
    use crate::emotion_engine::core::{
        control::{self, Interrupt, Status},
        register::Register,
        testing::{immediate, machine, mmi, regimm, special, PROGRAM_START},
        Mode,
    };

    use super::*;

    const NOP: u32 = 0;

    fn addiu(rt: Register, rs: Register, imm: u16) -> u32 {
        immediate(0x09, rs, rt, imm)
    }

    fn run(program: &[u32], steps: u64) -> (Core, Bus) {
        let (mut core, mut bus) = machine(program);
        core.step(steps, &mut bus);
        (core, bus)
    }

    #[test]
    fn lui_sets_upper_half() {
        let (core, _) = run(&[immediate(0x0F, Register::Zero, Register::T0, 0x1234)], 1);
        assert_eq!(core.get_register::<u64>(Register::T0), 0x1234_0000);
        assert_eq!(core.state.program_counter, PROGRAM_START + 4);

        let (core, _) = run(&[immediate(0x0F, Register::Zero, Register::T0, 0x8000)], 1);
        assert_eq!(core.get_register::<u64>(Register::T0), 0xFFFF_FFFF_8000_0000);
    }

    #[test]
    fn register_zero_stays_zero() {
        let (core, _) = run(&[addiu(Register::Zero, Register::Zero, 5)], 1);
        assert_eq!(core.get_register::<u128>(Register::Zero), 0);
    }

    #[test]
    fn delay_slot_runs_before_branch_target() {
        // beq zero, zero, +2 ; addiu t0, zero, 1 ; addiu t1, zero, 2 ; addiu t2, zero, 3
        let program = [
            immediate(0x04, Register::Zero, Register::Zero, 2),
            addiu(Register::T0, Register::Zero, 1),
            addiu(Register::T1, Register::Zero, 2),
            addiu(Register::T2, Register::Zero, 3),
        ];
        let (mut core, mut bus) = machine(&program);
        core.step_instruction(&mut bus);
        assert!(core.state.is_branching);
        assert_eq!(core.state.delay_slot, 1);
        assert_eq!(core.state.program_counter, PROGRAM_START + 4);
        core.step_instruction(&mut bus);
        assert!(!core.state.is_branching);
        assert_eq!(core.get_register::<u64>(Register::T0), 1);
        assert_eq!(core.state.program_counter, PROGRAM_START + 12);
        core.step_instruction(&mut bus);
        assert_eq!(core.get_register::<u64>(Register::T1), 0);
        assert_eq!(core.get_register::<u64>(Register::T2), 3);
    }

    #[test]
    fn not_taken_likely_branch_skips_delay_slot() {
        // bnel zero, zero, +4 ; addiu t0, zero, 1 ; addiu t1, zero, 2
        let program = [
            immediate(0x15, Register::Zero, Register::Zero, 4),
            addiu(Register::T0, Register::Zero, 1),
            addiu(Register::T1, Register::Zero, 2),
        ];
        let (mut core, mut bus) = machine(&program);
        core.step_instruction(&mut bus);
        assert_eq!(core.state.program_counter, PROGRAM_START + 8);
        assert!(!core.state.is_branching);
        core.step_instruction(&mut bus);
        assert_eq!(core.get_register::<u64>(Register::T0), 0);
        assert_eq!(core.get_register::<u64>(Register::T1), 2);
    }

    #[test]
    fn jump_and_link() {
        // jal 0x2000 ; nop
        let program = [0x0C00_0000 | 0x2000 >> 2, NOP];
        let (core, _) = run(&program, 2);
        assert_eq!(core.get_register::<u64>(Register::Ra), (PROGRAM_START + 8) as u64);
        assert_eq!(core.state.program_counter, 0x2000);
    }

    #[test]
    fn branch_and_link_links_when_not_taken() {
        // bltzal zero, +4
        let (core, _) = run(&[regimm(0x10, Register::Zero, 4)], 1);
        assert_eq!(core.get_register::<u64>(Register::Ra), (PROGRAM_START + 8) as u64);
        assert!(!core.state.is_branching);
    }

    #[test]
    fn misaligned_loads_trap_without_writing() {
        // addiu t0, zero, 0x101 ; lh t1, 0(t0)
        let program = [
            addiu(Register::T0, Register::Zero, 0x101),
            immediate(0x21, Register::T0, Register::T1, 0),
        ];
        let (mut core, mut bus) = machine(&program);
        core.set_register::<u64>(Register::T1, 0x55);
        core.step(2, &mut bus);
        assert_eq!(core.get_register::<u64>(Register::T1), 0x55);
        assert_eq!(core.state.program_counter, 0x8000_0180);
        let cop0 = &core.state.control;
        assert_eq!(cop0.cause().exception_code(), 4);
        assert_eq!(cop0.get_register(control::Register::BadVAddr), 0x101);
        assert_eq!(cop0.get_register(control::Register::Epc), PROGRAM_START + 4);
    }

    #[test]
    fn misaligned_word_load_keeps_destination() {
        // addiu t0, zero, 0x102 ; lw t1, 0(t0)
        let program = [
            addiu(Register::T0, Register::Zero, 0x102),
            immediate(0x23, Register::T0, Register::T1, 0),
        ];
        let (mut core, mut bus) = machine(&program);
        bus.write(0x100u32, 0x1122_3344_5566_7788u64);
        core.set_register::<u64>(Register::T1, 0x77);
        core.step(2, &mut bus);
        assert_eq!(core.get_register::<u64>(Register::T1), 0x77);
        let cop0 = &core.state.control;
        assert_eq!(cop0.cause().exception_code(), 4);
        assert_eq!(cop0.get_register(control::Register::BadVAddr), 0x102);
        assert_eq!(cop0.get_register(control::Register::Epc), PROGRAM_START + 4);
    }

    #[test]
    fn misaligned_quadword_load_keeps_destination() {
        // addiu t0, zero, 0x108 ; lq t1, 0(t0)
        let program = [
            addiu(Register::T0, Register::Zero, 0x108),
            immediate(0x1E, Register::T0, Register::T1, 0),
        ];
        let (mut core, mut bus) = machine(&program);
        bus.write(0x100u32, u128::MAX);
        core.set_register::<u128>(Register::T1, 0x1234);
        core.step(2, &mut bus);
        assert_eq!(core.get_register::<u128>(Register::T1), 0x1234);
        assert_eq!(core.state.program_counter, 0x8000_0180);
        let cop0 = &core.state.control;
        assert_eq!(cop0.cause().exception_code(), 4);
        assert_eq!(cop0.get_register(control::Register::BadVAddr), 0x108);
        assert_eq!(cop0.get_register(control::Register::Epc), PROGRAM_START + 4);
    }

    #[test]
    fn quadword_accesses_need_sixteen_byte_alignment() {
        // addiu t0, zero, 0x108 ; sq t1, 0(t0)
        let program = [
            addiu(Register::T0, Register::Zero, 0x108),
            immediate(0x1F, Register::T0, Register::T1, 0),
        ];
        let (core, bus) = run(&program, 2);
        assert_eq!(core.state.control.cause().exception_code(), 5);
        assert_eq!(bus.read::<u64>(0x108), 0);

        // lw with a word-aligned address succeeds
        let program = [
            addiu(Register::T0, Register::Zero, 0x104),
            immediate(0x23, Register::T0, Register::T1, 0),
        ];
        let (mut core, mut bus) = machine(&program);
        bus.write(0x104u32, 0x8000_0001u32);
        core.step(2, &mut bus);
        assert_eq!(core.get_register::<u64>(Register::T1), 0xFFFF_FFFF_8000_0001);
    }

    #[test]
    fn exception_in_delay_slot_records_branch() {
        // j 0x2000 ; syscall
        let program = [
            0x0800_0000 | 0x2000 >> 2,
            special(Register::Zero, Register::Zero, Register::Zero, 0, 0x0C),
        ];
        let (core, _) = run(&program, 2);
        let cop0 = &core.state.control;
        assert_eq!(core.state.program_counter, 0x8000_0180);
        assert_eq!(cop0.get_register(control::Register::Epc), PROGRAM_START);
        assert!(cop0.cause().branch_delay());
        assert_eq!(cop0.cause().exception_code(), 8);
        assert!(!core.state.is_branching);
    }

    #[test]
    fn bootstrap_vectors() {
        let syscall = special(Register::Zero, Register::Zero, Register::Zero, 0, 0x0C);
        let (mut core, mut bus) = machine(&[syscall]);
        let mut status = Status(0);
        status.set_bootstrap_vectors(true);
        core.state.control.set_status(status);
        core.step_instruction(&mut bus);
        assert_eq!(core.state.program_counter, 0xBFC0_0380);
    }

    #[test]
    fn eret_returns_to_epc_in_user_mode() {
        // eret
        let (mut core, mut bus) = machine(&[0x4200_0018]);
        let mut status = Status(0);
        status.set_kernel_supervisor_user(0b10);
        status.set_exception_level(true);
        core.state.control.set_status(status);
        core.state
            .control
            .set_register(control::Register::Epc, 0x0000_4000);
        core.step_instruction(&mut bus);
        assert_eq!(core.state.program_counter, 0x4000);
        assert_eq!(core.mode, Mode::User);
        assert!(!core.state.control.status().exception_level());
    }

    #[test]
    fn misaligned_jump_faults_on_fetch() {
        // addiu t0, zero, 0x2002 ; jr t0 ; nop
        let program = [
            addiu(Register::T0, Register::Zero, 0x2002),
            special(Register::T0, Register::Zero, Register::Zero, 0, 0x08),
            NOP,
        ];
        let (core, _) = run(&program, 4);
        assert_eq!(core.state.control.cause().exception_code(), 4);
        assert_eq!(
            core.state.control.get_register(control::Register::BadVAddr),
            0x2002
        );
    }

    #[test]
    fn interrupts_are_taken_between_instructions() {
        let (mut core, mut bus) = machine(&[NOP, NOP]);
        let mut status = Status(0);
        status.set_interrupts_enabled(true);
        status.set_master_interrupts_enabled(true);
        status.0 |= 1 << 10;
        core.state.control.set_status(status);
        core.step_instruction(&mut bus);
        assert_eq!(core.state.program_counter, PROGRAM_START + 4);
        core.request_interrupt(Interrupt::Int0);
        core.step_instruction(&mut bus);
        assert_eq!(core.state.program_counter, 0x8000_0200);
        assert_eq!(
            core.state.control.get_register(control::Register::Epc),
            PROGRAM_START + 8
        );
        assert_eq!(core.state.control.cause().exception_code(), 0);
        assert_eq!(core.mode, Mode::Kernel);
    }

    #[test]
    fn unaligned_word_loads_and_stores() {
        // lwl t0, 5(zero) ; lwr t0, 2(zero) ; swl t1, 0x21(zero) ; swr t1, 0x26(zero)
        let program = [
            immediate(0x22, Register::Zero, Register::T0, 5),
            immediate(0x26, Register::Zero, Register::T0, 2),
            immediate(0x2A, Register::Zero, Register::T1, 0x21),
            immediate(0x2E, Register::Zero, Register::T1, 0x26),
        ];
        let (mut core, mut bus) = machine(&program);
        bus.write(0x0u32, 0x4433_2211u32);
        bus.write(0x4u32, 0x8877_6655u32);
        core.set_register::<u64>(Register::T1, 0xAABB_CCDD);
        core.step(1, &mut bus);
        // Offset 1 merges the two low memory bytes into the top of the register.
        assert_eq!(core.get_register::<u32>(Register::T0), 0x6655_0000);
        core.step(1, &mut bus);
        assert_eq!(core.get_register::<u32>(Register::T0), 0x6655_4433);
        core.step(2, &mut bus);
        assert_eq!(bus.read::<u32>(0x20), 0x0000_AABB);
        assert_eq!(bus.read::<u32>(0x24), 0xCCDD_0000);
    }

    #[test]
    fn unaligned_doubleword_loads() {
        // ldl t0, 0xB(zero) ; ldr t0, 4(zero)
        let program = [
            immediate(0x1A, Register::Zero, Register::T0, 0xB),
            immediate(0x1B, Register::Zero, Register::T0, 4),
        ];
        let (mut core, mut bus) = machine(&program);
        bus.write(0x0u32, 0x7766_5544_3322_1100u64);
        bus.write(0x8u32, 0xFFEE_DDCC_BBAA_9988u64);
        core.step(2, &mut bus);
        assert_eq!(core.get_register::<u64>(Register::T0), 0xBBAA_9988_7766_5544);
    }

    #[test]
    fn division_by_zero_and_overflow() {
        // div t0, zero ; mflo t1 ; mfhi t2
        let program = [
            special(Register::T0, Register::Zero, Register::Zero, 0, 0x1A),
            special(Register::Zero, Register::Zero, Register::T1, 0, 0x12),
            special(Register::Zero, Register::Zero, Register::T2, 0, 0x10),
        ];
        let (mut core, mut bus) = machine(&program);
        core.set_register::<i64>(Register::T0, -7);
        core.step(3, &mut bus);
        assert_eq!(core.get_register::<i64>(Register::T1), 1);
        assert_eq!(core.get_register::<i64>(Register::T2), -7);

        // divu t0, zero
        let (mut core, mut bus) =
            machine(&[special(Register::T0, Register::Zero, Register::Zero, 0, 0x1B)]);
        core.set_register::<u64>(Register::T0, 9);
        core.step(1, &mut bus);
        assert_eq!(core.get_register::<u64>(Register::Lo), u64::MAX);
        assert_eq!(core.get_register::<u64>(Register::Hi), 9);

        // div t0, t1 with INT_MIN / -1
        let (mut core, mut bus) =
            machine(&[special(Register::T0, Register::T1, Register::Zero, 0, 0x1A)]);
        core.set_register::<i32>(Register::T0, i32::MIN);
        core.set_register::<i32>(Register::T1, -1);
        core.step(1, &mut bus);
        assert_eq!(core.get_register::<i64>(Register::Lo), i32::MIN as i64);
        assert_eq!(core.get_register::<u64>(Register::Hi), 0);
    }

    #[test]
    fn three_operand_multiply() {
        // mult v0, t0, t1
        let (mut core, mut bus) =
            machine(&[special(Register::T0, Register::T1, Register::V0, 0, 0x18)]);
        core.set_register::<i32>(Register::T0, -3);
        core.set_register::<i32>(Register::T1, 0x4000_0000);
        core.step(1, &mut bus);
        assert_eq!(core.get_register::<i64>(Register::V0), 0x4000_0000);
        assert_eq!(core.get_register::<i64>(Register::Hi), -1);
    }

    #[test]
    fn second_pipeline_uses_upper_halves() {
        // multu1 v0, t0, t1 ; mflo1 t2 ; mfhi1 t3
        let program = [
            mmi(Register::T0, Register::T1, Register::V0, 0, 0x19),
            mmi(Register::Zero, Register::Zero, Register::T2, 0, 0x12),
            mmi(Register::Zero, Register::Zero, Register::T3, 0, 0x10),
        ];
        let (mut core, mut bus) = machine(&program);
        core.set_register::<u64>(Register::T0, 0x1_0000);
        core.set_register::<u64>(Register::T1, 0x1_0003);
        core.step(3, &mut bus);
        assert_eq!(core.get_register::<u64>(Register::T2), 0x3_0000);
        assert_eq!(core.get_register::<u64>(Register::T3), 1);
        assert_eq!(core.get_register::<u64>(Register::Lo), 0);
        assert_eq!(core.get_register::<u64>(Register::V0), 0x3_0000);
    }

    #[test]
    fn multiply_accumulate() {
        // mult zero, t0, t1 ; madd v0, t0, t1
        let program = [
            special(Register::T0, Register::T1, Register::Zero, 0, 0x18),
            mmi(Register::T0, Register::T1, Register::V0, 0, 0x00),
        ];
        let (mut core, mut bus) = machine(&program);
        core.set_register::<u64>(Register::T0, 6);
        core.set_register::<u64>(Register::T1, 7);
        core.step(2, &mut bus);
        assert_eq!(core.get_register::<u64>(Register::V0), 84);
        assert_eq!(core.get_register::<u64>(Register::Lo), 84);
    }

    #[test]
    fn parallel_logic_and_copies() {
        // por v0, t0, t1 ; pcpyld v1, t0, t1 ; pcpyud a0, t0, t1 ; plzcw a1, t2
        let program = [
            mmi(Register::T0, Register::T1, Register::V0, 0x12, 0x29),
            mmi(Register::T0, Register::T1, Register::V1, 0x0E, 0x09),
            mmi(Register::T0, Register::T1, Register::A0, 0x0E, 0x29),
            mmi(Register::T2, Register::Zero, Register::A1, 0, 0x04),
        ];
        let (mut core, mut bus) = machine(&program);
        core.set_register::<u128>(Register::T0, 0x1111_0000_0000_0000_0000_0000_0000_0022);
        core.set_register::<u128>(Register::T1, 0x3300_0000_0000_0000_0000_0000_0000_0044);
        core.set_register::<u128>(Register::T2, 0xFFFF_FFFF_0000_0001);
        core.step(4, &mut bus);
        assert_eq!(
            core.get_register::<u128>(Register::V0),
            0x3311_0000_0000_0000_0000_0000_0000_0066
        );
        assert_eq!(
            core.get_register::<u128>(Register::V1),
            0x0000_0000_0000_0022_0000_0000_0000_0044
        );
        assert_eq!(
            core.get_register::<u128>(Register::A0),
            0x3300_0000_0000_0000_1111_0000_0000_0000
        );
        assert_eq!(core.get_register::<u64>(Register::A1), 31 << 32 | 30);
    }

    #[test]
    fn traps_raise_when_condition_holds() {
        // teq zero, zero
        let (core, _) = run(&[special(Register::Zero, Register::Zero, Register::Zero, 0, 0x34)], 1);
        assert_eq!(core.state.control.cause().exception_code(), 13);
        // tne zero, zero
        let (core, _) = run(&[special(Register::Zero, Register::Zero, Register::Zero, 0, 0x36)], 1);
        assert_eq!(core.state.program_counter, PROGRAM_START + 4);
    }

    #[test]
    fn unknown_instruction_is_skipped() {
        let (core, _) = run(&[0xF400_0000], 1);
        assert_eq!(core.state.program_counter, PROGRAM_START + 4);
    }
}
