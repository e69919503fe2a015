//! Unit tests for individual instructions.
//!
//! Programs are loaded at 0x0000 and run one instruction at a time until
//! they reach a HALT.

use ascii_r800::{
    CF, DebugCommand, HF, Host, NF, PF, Personality, R800, R800Config, Registers, SF, ZF,
};
use emu_core::{Bus, Cpu, IoBus, SimpleBus};

/// Run CPU until it HALTs, return the number of steps taken.
fn run_until_halt<H: Host>(cpu: &mut R800, host: &mut H) -> u32 {
    let mut count = 0;
    while !cpu.is_halted() && count < 10_000 {
        cpu.execute_instruction(host);
        count += 1;
    }
    count
}

fn setup(program: &[u8]) -> (R800, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, program);
    let mut cpu = R800::default();
    cpu.set_pc(0x0000);
    cpu.set_sp(0x8000);
    (cpu, bus)
}

fn run(program: &[u8]) -> (Registers, SimpleBus) {
    let (mut cpu, mut bus) = setup(program);
    run_until_halt(&mut cpu, &mut bus);
    (cpu.registers(), bus)
}

fn r800_cpu() -> R800 {
    let mut cpu = R800::default();
    cpu.set_mode(Personality::R800);
    cpu.flush_personality_switch();
    cpu.set_sp(0x8000);
    cpu
}

#[test]
fn test_nop_then_halt() {
    let (mut cpu, mut bus) = setup(&[0x00, 0x76]); // NOP; HALT

    let steps = run_until_halt(&mut cpu, &mut bus);

    assert_eq!(steps, 2);
    assert_eq!(cpu.pc(), 0x0001, "HALT leaves PC on itself");
    assert!(cpu.is_halted());
}

#[test]
fn test_halt_keeps_refetching() {
    let (mut cpu, mut bus) = setup(&[0x76]); // HALT

    for _ in 0..3 {
        cpu.execute_instruction(&mut bus);
    }

    assert_eq!(cpu.pc(), 0x0000);
    assert_eq!(cpu.instruction_count(), 3);
}

#[test]
fn test_inc_preserves_only_carry() {
    // Power-on F is 0xFF.
    let (regs, _) = run(&[
        0x06, 0x12, // LD B, 0x12
        0x04,       // INC B
        0x76,       // HALT
    ]);

    assert_eq!(regs.bc.high(), 0x13);
    assert_eq!(regs.f(), CF);
}

#[test]
fn test_dec_to_zero() {
    let (regs, _) = run(&[
        0x0E, 0x01, // LD C, 1
        0x0D,       // DEC C
        0x76,       // HALT
    ]);

    assert_eq!(regs.bc.low(), 0x00);
    assert_eq!(regs.f() & (ZF | NF | CF), ZF | NF | CF);
}

#[test]
fn test_push_pop_bc() {
    let (regs, bus) = run(&[
        0x01, 0x34, 0x12, // LD BC, 0x1234
        0xC5,             // PUSH BC
        0x01, 0x00, 0x00, // LD BC, 0x0000
        0xC1,             // POP BC
        0x76,             // HALT
    ]);

    assert_eq!(regs.bc.word(), 0x1234);
    assert_eq!(regs.sp.word(), 0x8000);
    assert_eq!(bus.peek(0x7FFF), 0x12);
    assert_eq!(bus.peek(0x7FFE), 0x34);
}

#[test]
fn test_call_and_ret() {
    let mut program = vec![
        0xCD, 0x10, 0x00, // CALL 0x0010
        0x76,             // HALT
    ];
    program.resize(0x10, 0x00);
    program.extend_from_slice(&[
        0x3E, 0x07, // LD A, 7
        0xC9,       // RET
    ]);
    let (regs, _) = run(&program);

    assert_eq!(regs.a(), 0x07);
    assert_eq!(regs.pc.word(), 0x0003);
    assert_eq!(regs.sp.word(), 0x8000);
    assert_eq!(regs.wz.word(), 0x0003, "RET leaves the return address in MEMPTR");
}

#[test]
fn test_conditional_call_not_taken_sets_memptr() {
    let (regs, _) = run(&[
        0xAF,             // XOR A (sets Z)
        0xC4, 0x00, 0x20, // CALL NZ, 0x2000
        0x76,             // HALT
    ]);

    assert_eq!(regs.pc.word(), 0x0004);
    assert_eq!(regs.sp.word(), 0x8000);
    assert_eq!(regs.wz.word(), 0x2000);
}

#[test]
fn test_djnz_loop() {
    let (regs, _) = run(&[
        0x3E, 0x00, // LD A, 0
        0x06, 0x05, // LD B, 5
        0x3C,       // loop: INC A
        0x10, 0xFD, // DJNZ loop
        0x76,       // HALT
    ]);

    assert_eq!(regs.a(), 0x05);
    assert_eq!(regs.bc.high(), 0x00);
}

#[test]
fn test_jr_conditions() {
    let (regs, _) = run(&[
        0x37,       // SCF
        0x38, 0x02, // JR C, +2
        0x3E, 0x11, // LD A, 0x11 (skipped)
        0x30, 0x02, // JR NC, +2 (not taken)
        0x3E, 0x22, // LD A, 0x22
        0x76,       // HALT
    ]);

    assert_eq!(regs.a(), 0x22);
}

#[test]
fn test_daa_after_bcd_add() {
    let (regs, _) = run(&[
        0x3E, 0x15, // LD A, 0x15
        0xC6, 0x27, // ADD A, 0x27
        0x27,       // DAA
        0x76,       // HALT
    ]);

    assert_eq!(regs.a(), 0x42);
    assert_eq!(regs.f() & (CF | NF), 0);
}

#[test]
fn test_alu_group() {
    let (regs, _) = run(&[
        0x3E, 0xF0, // LD A, 0xF0
        0x06, 0x0F, // LD B, 0x0F
        0xB0,       // OR B
        0xEE, 0xFF, // XOR 0xFF
        0x76,       // HALT
    ]);

    assert_eq!(regs.a(), 0x00);
    assert_eq!(regs.f() & (ZF | PF), ZF | PF);
}

#[test]
fn test_compare_does_not_store() {
    let (regs, _) = run(&[
        0x3E, 0x10, // LD A, 0x10
        0xFE, 0x20, // CP 0x20
        0x76,       // HALT
    ]);

    assert_eq!(regs.a(), 0x10);
    assert_eq!(regs.f() & (CF | NF | ZF), CF | NF);
}

#[test]
fn test_neg() {
    let (regs, _) = run(&[
        0x3E, 0x01, // LD A, 1
        0xED, 0x44, // NEG
        0x76,       // HALT
    ]);

    assert_eq!(regs.a(), 0xFF);
    assert_eq!(regs.f() & (CF | NF | SF), CF | NF | SF);
}

#[test]
fn test_sbc_hl_overflow() {
    let (regs, _) = run(&[
        0x21, 0x00, 0x80, // LD HL, 0x8000
        0x01, 0x01, 0x00, // LD BC, 1
        0xB7,             // OR A (clear carry)
        0xED, 0x42,       // SBC HL, BC
        0x76,             // HALT
    ]);

    assert_eq!(regs.hl.word(), 0x7FFF);
    assert_eq!(regs.f() & (PF | NF | CF | ZF), PF | NF);
    assert_eq!(regs.wz.word(), 0x8001);
}

#[test]
fn test_add_hl_sets_memptr() {
    let (regs, _) = run(&[
        0x21, 0xFF, 0x0F, // LD HL, 0x0FFF
        0x11, 0x01, 0x00, // LD DE, 1
        0x19,             // ADD HL, DE
        0x76,             // HALT
    ]);

    assert_eq!(regs.hl.word(), 0x1000);
    assert_eq!(regs.f() & HF, HF);
    assert_eq!(regs.wz.word(), 0x1000);
}

#[test]
fn test_ex_sp_hl() {
    let (regs, bus) = run(&[
        0x21, 0x34, 0x12, // LD HL, 0x1234
        0xE5,             // PUSH HL
        0x21, 0x78, 0x56, // LD HL, 0x5678
        0xE3,             // EX (SP), HL
        0x76,             // HALT
    ]);

    assert_eq!(regs.hl.word(), 0x1234);
    assert_eq!(regs.wz.word(), 0x1234);
    assert_eq!(bus.peek(0x7FFE), 0x78);
    assert_eq!(bus.peek(0x7FFF), 0x56);
}

#[test]
fn test_exchange_sets() {
    let (regs, _) = run(&[
        0x01, 0x11, 0x11, // LD BC, 0x1111
        0xD9,             // EXX
        0x01, 0x22, 0x22, // LD BC, 0x2222
        0x08,             // EX AF, AF'
        0x76,             // HALT
    ]);

    assert_eq!(regs.bc.word(), 0x2222);
    assert_eq!(regs.bc_alt.word(), 0x1111);
    assert_eq!(regs.af_alt.word(), 0xFFFF);
}

#[test]
fn test_ld_nn_a_memptr() {
    let (regs, bus) = run(&[
        0x3E, 0x5A,       // LD A, 0x5A
        0x32, 0x00, 0x40, // LD (0x4000), A
        0x76,             // HALT
    ]);

    assert_eq!(bus.peek(0x4000), 0x5A);
    assert_eq!(regs.wz.word(), 0x5A00);
}

#[test]
fn test_ld_hl_indirect_word() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x2A, 0x00, 0x40, // LD HL, (0x4000)
        0x22, 0x10, 0x40, // LD (0x4010), HL
        0x76,             // HALT
    ]);
    bus.load(0x4000, &[0xCD, 0xAB]);
    let mut cpu = R800::default();
    cpu.set_sp(0x8000);

    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.registers().hl.word(), 0xABCD);
    assert_eq!(bus.peek(0x4010), 0xCD);
    assert_eq!(bus.peek(0x4011), 0xAB);
    assert_eq!(cpu.registers().wz.word(), 0x4011);
}

#[test]
fn test_rld() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x00, 0x40, // LD HL, 0x4000
        0x3E, 0x7A,       // LD A, 0x7A
        0xED, 0x6F,       // RLD
        0x76,             // HALT
    ]);
    bus.load(0x4000, &[0x31]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.registers().a(), 0x73);
    assert_eq!(bus.peek(0x4000), 0x1A);
    assert_eq!(cpu.registers().wz.word(), 0x4001);
}

#[test]
fn test_rrd() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x00, 0x40, // LD HL, 0x4000
        0x3E, 0x84,       // LD A, 0x84
        0xED, 0x67,       // RRD
        0x76,             // HALT
    ]);
    bus.load(0x4000, &[0x20]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.registers().a(), 0x80);
    assert_eq!(bus.peek(0x4000), 0x42);
}

#[test]
fn test_cpir_exhausts_region() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x00, 0x40, // LD HL, 0x4000
        0x01, 0x03, 0x00, // LD BC, 3
        0x3E, 0xAA,       // LD A, 0xAA
        0xED, 0xB1,       // CPIR
        0x76,             // HALT
    ]);
    bus.load(0x4000, &[0x01, 0x02, 0x03]);
    let mut cpu = R800::default();

    let steps = run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(regs.bc.word(), 0);
    assert_eq!(regs.hl.word(), 0x4003);
    assert_eq!(regs.f() & (PF | ZF), 0, "nothing found and the counter ran out");
    assert_eq!(steps, 7, "three LDs, three CPIR iterations, HALT");
    assert_eq!(cpu.instruction_count(), 5, "repeats don't count as new instructions");
}

#[test]
fn test_cpir_stops_on_match() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x00, 0x40, // LD HL, 0x4000
        0x01, 0x03, 0x00, // LD BC, 3
        0x3E, 0xAA,       // LD A, 0xAA
        0xED, 0xB1,       // CPIR
        0x76,             // HALT
    ]);
    bus.load(0x4000, &[0x01, 0xAA, 0x03]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(regs.bc.word(), 1);
    assert_eq!(regs.hl.word(), 0x4002);
    assert_eq!(regs.f() & (PF | ZF), PF | ZF);
}

#[test]
fn test_ldir_copies_block() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x00, 0x40, // LD HL, 0x4000
        0x11, 0x00, 0x50, // LD DE, 0x5000
        0x01, 0x04, 0x00, // LD BC, 4
        0xED, 0xB0,       // LDIR
        0x76,             // HALT
    ]);
    bus.load(0x4000, &[0xDE, 0xAD, 0xBE, 0xEF]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(
        [bus.peek(0x5000), bus.peek(0x5001), bus.peek(0x5002), bus.peek(0x5003)],
        [0xDE, 0xAD, 0xBE, 0xEF]
    );
    assert_eq!(regs.bc.word(), 0);
    assert_eq!(regs.hl.word(), 0x4004);
    assert_eq!(regs.de.word(), 0x5004);
    assert_eq!(regs.f() & PF, 0);
}

#[test]
fn test_lddr_runs_backwards() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x01, 0x40, // LD HL, 0x4001
        0x11, 0x01, 0x50, // LD DE, 0x5001
        0x01, 0x02, 0x00, // LD BC, 2
        0xED, 0xB8,       // LDDR
        0x76,             // HALT
    ]);
    bus.load(0x4000, &[0x11, 0x22]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    assert_eq!([bus.peek(0x5000), bus.peek(0x5001)], [0x11, 0x22]);
    assert_eq!(cpu.registers().hl.word(), 0x3FFF);
}

#[test]
fn test_otir_writes_each_byte() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x00, 0x40, // LD HL, 0x4000
        0x01, 0x20, 0x03, // LD BC, 0x0320
        0xED, 0xB3,       // OTIR
        0x76,             // HALT
    ]);
    bus.load(0x4000, &[0x11, 0x22, 0x33]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(bus.port(0x20), Some(0x33), "last byte written wins");
    assert_eq!(regs.bc.high(), 0);
    assert_eq!(regs.hl.word(), 0x4003);
    assert_eq!(regs.f() & ZF, ZF);
}

#[test]
fn test_inir_reads_port() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x00, 0x40, // LD HL, 0x4000
        0x01, 0x30, 0x02, // LD BC, 0x0230
        0xED, 0xB2,       // INIR
        0x76,             // HALT
    ]);
    bus.set_port(0x30, 0x5A);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    assert_eq!([bus.peek(0x4000), bus.peek(0x4001)], [0x5A, 0x5A]);
    assert_eq!(cpu.registers().bc.word(), 0x0030);
}

#[test]
fn test_in_and_out() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x01, 0x10, 0x00, // LD BC, 0x0010
        0xED, 0x78,       // IN A, (C)
        0xD3, 0x20,       // OUT (0x20), A
        0x76,             // HALT
    ]);
    bus.set_port(0x10, 0x80);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(regs.a(), 0x80);
    assert_eq!(regs.f(), SF | CF, "sign from the value, carry preserved");
    assert_eq!(bus.port(0x20), Some(0x80));
}

#[test]
fn test_ld_a_r_tracks_refresh() {
    let (regs, _) = run(&[
        0x3E, 0x85, // LD A, 0x85
        0xED, 0x4F, // LD R, A
        0xED, 0x5F, // LD A, R
        0x76,       // HALT
    ]);

    // Two M1 cycles (ED, 5F) between the write and the read; bit 7 sticks.
    assert_eq!(regs.a(), 0x87);
}

#[test]
fn test_z80_ld_a_i_reads_pf_clear_with_interrupt_pending() {
    let (mut cpu, mut bus) = setup(&[
        0xFB,       // EI
        0xED, 0x57, // LD A, I
        0x76,       // HALT
    ]);
    cpu.set_int();

    cpu.execute_instruction(&mut bus); // EI
    cpu.execute_instruction(&mut bus); // LD A, I

    assert_eq!(cpu.registers().f() & PF, 0);
}

#[test]
fn test_r800_ld_a_i_reports_iff2() {
    let mut cpu = r800_cpu();
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[0xFB, 0xED, 0x57, 0x76]); // EI; LD A, I; HALT
    cpu.set_int();

    cpu.execute_instruction(&mut bus);
    cpu.execute_instruction(&mut bus);

    assert_eq!(cpu.registers().f() & PF, PF);
}

#[test]
fn test_mulub_on_r800() {
    let mut cpu = r800_cpu();
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x3E, 0x10, // LD A, 0x10
        0x06, 0x20, // LD B, 0x20
        0xED, 0xC1, // MULUB A, B
        0x76,       // HALT
    ]);

    run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(regs.hl.word(), 0x0200);
    assert_eq!(regs.f(), NF | HF, "N and H survive, Z and C clear");
}

#[test]
fn test_multiply_leaves_z80_untouched() {
    let with_multiply = [
        0x3E, 0x10,       // LD A, 0x10
        0x01, 0x20, 0x30, // LD BC, 0x3020
        0x11, 0x78, 0x56, // LD DE, 0x5678
        0x21, 0x34, 0x12, // LD HL, 0x1234
        0x37,             // SCF
        0xED, 0xC1,       // MULUB A, B
        0xED, 0xC3,       // MULUW HL, BC
        0x76,             // HALT
    ];
    let mut with_nops = with_multiply;
    with_nops[12..16].fill(0x00);

    let (mut multiplied, _) = run(&with_multiply);
    let (mut plain, _) = run(&with_nops);
    multiplied.r = 0;
    plain.r = 0;

    assert_eq!(multiplied, plain);
    assert_eq!(multiplied.hl.word(), 0x1234);
    assert_eq!(multiplied.de.word(), 0x5678);
    assert_eq!(multiplied.f() & CF, CF);
}

#[test]
fn test_muluw_on_r800() {
    let mut cpu = r800_cpu();
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0xFF, 0xFF, // LD HL, 0xFFFF
        0x01, 0xFF, 0xFF, // LD BC, 0xFFFF
        0xED, 0xC3,       // MULUW HL, BC
        0x76,             // HALT
    ]);

    run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(regs.de.word(), 0xFFFE);
    assert_eq!(regs.hl.word(), 0x0001);
    assert_eq!(regs.f() & (CF | ZF), CF);
}

#[test]
fn test_unassigned_multiply_slots_do_nothing() {
    let mut cpu = r800_cpu();
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x21, 0x03, 0x00, // LD HL, 3
        0xED, 0xE3,       // MULUW HL, HL (not wired)
        0xED, 0xF9,       // MULUB A, A (not wired)
        0x76,             // HALT
    ]);

    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.registers().hl.word(), 0x0003);
}

#[test]
fn test_index_displacement_forms() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0xDD, 0x21, 0x00, 0x40, // LD IX, 0x4000
        0xDD, 0x36, 0x05, 0x99, // LD (IX+5), 0x99
        0xDD, 0x7E, 0x05,       // LD A, (IX+5)
        0xDD, 0x34, 0xFF,       // INC (IX-1)
        0x76,                   // HALT
    ]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(bus.peek(0x4005), 0x99);
    assert_eq!(regs.a(), 0x99);
    assert_eq!(bus.peek(0x3FFF), 0x01);
    assert_eq!(regs.wz.word(), 0x3FFF);
}

#[test]
fn test_index_halves_replace_h_and_l() {
    let (regs, _) = run(&[
        0xFD, 0x21, 0x34, 0x12, // LD IY, 0x1234
        0x21, 0x00, 0x00,       // LD HL, 0
        0xFD, 0x7C,             // LD A, IYH
        0xFD, 0x65,             // LD IYH, IYL
        0xFD, 0x2C,             // INC IYL
        0x76,                   // HALT
    ]);

    assert_eq!(regs.a(), 0x12);
    assert_eq!(regs.iy.word(), 0x3435);
    assert_eq!(regs.hl.word(), 0x0000, "HL untouched");
}

#[test]
fn test_index_memory_forms_use_real_h() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0xDD, 0x21, 0x00, 0x40, // LD IX, 0x4000
        0xDD, 0x66, 0x01,       // LD H, (IX+1)
        0x76,                   // HALT
    ]);
    bus.load(0x4001, &[0x77]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.registers().hl.high(), 0x77);
    assert_eq!(cpu.registers().ix.word(), 0x4000);
}

#[test]
fn test_index_prefix_falls_through() {
    let (regs, _) = run(&[
        0x11, 0x11, 0x11, // LD DE, 0x1111
        0x21, 0x22, 0x22, // LD HL, 0x2222
        0xDD, 0xEB,       // EX DE, HL (prefix ignored)
        0xDD, 0x3E, 0x42, // LD A, 0x42 (prefix ignored)
        0x76,             // HALT
    ]);

    assert_eq!(regs.de.word(), 0x2222);
    assert_eq!(regs.hl.word(), 0x1111);
    assert_eq!(regs.a(), 0x42);
    assert_eq!(regs.ix.word(), 0xFFFF);
}

#[test]
fn test_index_cb_copies_into_register() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0xFD, 0x21, 0x00, 0x40, // LD IY, 0x4000
        0xFD, 0xCB, 0x02, 0xC6, // SET 0, (IY+2)
        0xFD, 0xCB, 0x02, 0x00, // RLC (IY+2), B
        0x76,                   // HALT
    ]);
    bus.load(0x4002, &[0x80]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    let regs = cpu.registers();
    assert_eq!(bus.peek(0x4002), 0x03);
    assert_eq!(regs.bc.high(), 0x03);
    assert_eq!(regs.f() & CF, CF);
}

#[test]
fn test_index_cb_bit_takes_xy_from_address() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0xDD, 0x21, 0x00, 0x28, // LD IX, 0x2800
        0xDD, 0xCB, 0x00, 0x46, // BIT 0, (IX+0)
        0x76,                   // HALT
    ]);
    bus.load(0x2800, &[0x00]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    let f = cpu.registers().f();
    assert_eq!(f & ZF, ZF);
    assert_eq!(f & 0x28, 0x28, "X and Y come from the address high byte");
}

#[test]
fn test_index_cb_leaves_refresh_counter_alone() {
    let (regs, _) = run(&[
        0xDD, 0xCB, 0x00, 0x46, // BIT 0, (IX+0)
        0x76,                   // HALT
    ]);

    // DD and CB are M1 cycles; the displacement and final opcode are not.
    // HALT adds the third.
    assert_eq!(regs.r, 3);
}

#[test]
fn test_cb_register_and_memory() {
    let mut bus = SimpleBus::new();
    bus.load(0x0000, &[
        0x06, 0x01,       // LD B, 1
        0xCB, 0x20,       // SLA B
        0x21, 0x00, 0x40, // LD HL, 0x4000
        0xCB, 0xFE,       // SET 7, (HL)
        0xCB, 0x46,       // BIT 0, (HL)
        0x76,             // HALT
    ]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.registers().bc.high(), 0x02);
    assert_eq!(bus.peek(0x4000), 0x80);
    assert_eq!(cpu.registers().f() & ZF, ZF);
}

#[test]
fn test_undefined_ed_is_two_byte_nop() {
    let (regs, _) = run(&[
        0xED, 0x00, // undefined
        0x3E, 0x01, // LD A, 1
        0x76,       // HALT
    ]);

    assert_eq!(regs.a(), 0x01);
    assert_eq!(regs.pc.word(), 0x0004);
}

/// Host that records every hook call.
#[derive(Default)]
struct RecordingHost {
    bus: SimpleBus,
    commands: Vec<DebugCommand>,
    traps: Vec<u8>,
    patches: u32,
}

impl Bus for RecordingHost {
    fn read(&mut self, address: u16) -> u8 {
        self.bus.read(address)
    }

    fn write(&mut self, address: u16, value: u8) {
        self.bus.write(address, value);
    }
}

impl IoBus for RecordingHost {}

impl Host for RecordingHost {
    fn patch(&mut self, regs: &mut Registers) {
        self.patches += 1;
        regs.set_a(0x99);
    }

    fn debug(&mut self, command: &DebugCommand) {
        self.commands.push(command.clone());
    }

    fn trap(&mut self, value: u8) {
        self.traps.push(value);
    }
}

fn debug_cpu() -> R800 {
    let mut cpu = R800::new(R800Config {
        debug_commands: true,
        trap_opcode: true,
        ..R800Config::default()
    });
    cpu.set_sp(0x8000);
    cpu
}

#[test]
fn test_patch_hook_rewrites_registers() {
    let mut host = RecordingHost::default();
    host.bus.load(0x0000, &[0xED, 0xFE, 0x76]); // patch; HALT
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut host);

    assert_eq!(host.patches, 1);
    assert_eq!(cpu.registers().a(), 0x99);
}

#[test]
fn test_breakpoint_command() {
    let mut host = RecordingHost::default();
    host.bus.load(0x0000, &[
        0x40,             // LD B, B
        0x18, 0x02,       // JR +2 (payload size 2)
        0x00, 0xC0,       // address 0xC000
        0x76,             // HALT
    ]);
    let mut cpu = debug_cpu();

    run_until_halt(&mut cpu, &mut host);

    assert_eq!(
        host.commands,
        vec![DebugCommand::SetBreakpoint { slot: 0xFFFF, page: 0xFFFF, address: 0xC000 }]
    );
    assert_eq!(host.commands[0].to_string(), "ffff ffff c000");
    assert_eq!(cpu.pc(), 0x0005, "JR still skips the payload");
}

#[test]
fn test_breakpoint_command_with_slot_and_page() {
    let mut host = RecordingHost::default();
    host.bus.load(0x0000, &[
        0x40,                   // LD B, B
        0x18, 0x04,             // JR +4
        0x03, 0x02, 0x34, 0x12, // slot 3, page 2, address 0x1234
        0x76,                   // HALT
    ]);
    let mut cpu = debug_cpu();

    run_until_halt(&mut cpu, &mut host);

    assert_eq!(
        host.commands,
        vec![DebugCommand::SetBreakpoint { slot: 3, page: 2, address: 0x1234 }]
    );
}

#[test]
fn test_trace_command_appends_newline() {
    let mut host = RecordingHost::default();
    host.bus.load(0x0000, &[
        0x52,                          // LD D, D
        0x18, 0x05,                    // JR +5
        b'H', b'e', b'l', b'l', b'o',  // text
        0x76,                          // HALT
    ]);
    let mut cpu = debug_cpu();

    run_until_halt(&mut cpu, &mut host);

    assert_eq!(host.commands, vec![DebugCommand::Trace("Hello\n".to_owned())]);
}

#[test]
fn test_trace_command_skips_header() {
    let mut host = RecordingHost::default();
    host.bus.load(0x0000, &[
        0x52,                       // LD D, D
        0x18, 0x07,                 // JR +7
        100, 100, 0, 0,             // header
        b'o', b'k', b'\n',          // text
        0x76,                       // HALT
    ]);
    let mut cpu = debug_cpu();

    run_until_halt(&mut cpu, &mut host);

    assert_eq!(host.commands, vec![DebugCommand::Trace("ok\n".to_owned())]);
}

#[test]
fn test_trap_command() {
    let mut host = RecordingHost::default();
    host.bus.load(0x0000, &[
        0x49,             // LD C, C
        0x18, 0x03,       // JR +3 (trap 3)
        0x00, 0x00, 0x00, // skipped
        0x76,             // HALT
    ]);
    let mut cpu = debug_cpu();

    run_until_halt(&mut cpu, &mut host);

    assert_eq!(host.traps, vec![3]);
}

#[test]
fn test_debug_opcodes_are_plain_loads_by_default() {
    let mut host = RecordingHost::default();
    host.bus.load(0x0000, &[
        0x40,       // LD B, B
        0x18, 0x00, // JR +0
        0x49,       // LD C, C
        0x18, 0x00, // JR +0
        0x76,       // HALT
    ]);
    let mut cpu = R800::default();

    run_until_halt(&mut cpu, &mut host);

    assert!(host.commands.is_empty());
    assert!(host.traps.is_empty());
}
