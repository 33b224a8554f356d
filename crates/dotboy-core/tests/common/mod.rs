#![allow(dead_code)]

use once_cell::sync::Lazy;

use dotboy_core::{cartridge::Cartridge, gameboy::GameBoy};

/// A header-complete 32 KiB ROM image with `program` placed at the entry
/// point 0x0100.
pub fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0134..0x013C].copy_from_slice(b"TESTCART");
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
    rom
}

/// Cartridge loaded and post-boot state injected; execution is about to
/// start at 0x0100.
pub fn boot_with_program(program: &[u8]) -> GameBoy {
    let mut gb = GameBoy::new();
    gb.insert_cartridge(Cartridge::load(rom_with_program(program)).unwrap());
    gb.reset();
    gb
}

/// A bare machine: no cartridge, LCD off, open bus reading as NOPs. Useful
/// for driving single instructions out of work RAM.
pub fn bare_machine() -> GameBoy {
    GameBoy::new()
}

/// Store `code` at `addr` in work RAM and point the CPU at it.
pub fn load_code(gb: &mut GameBoy, addr: u16, code: &[u8]) {
    for (i, &byte) in code.iter().enumerate() {
        gb.mmu.write_byte(addr + i as u16, byte);
    }
    gb.cpu.pc = addr;
    gb.cpu.instruction_cycles = 0;
}

/// Program that prints a NUL-terminated string at 0x0150 over the serial
/// stub, then parks in a tight loop.
pub static SERIAL_PRINT_PROGRAM: Lazy<Vec<u8>> = Lazy::new(|| {
    vec![
        0x21, 0x50, 0x01, // LD HL,0x0150
        0x2A, //             loop: LD A,(HL+)
        0xB7, //             OR A
        0x28, 0x08, //       JR Z,done
        0xE0, 0x01, //       LDH (0xFF01),A
        0x3E, 0x81, //       LD A,0x81
        0xE0, 0x02, //       LDH (0xFF02),A
        0x18, 0xF4, //       JR loop
        0x18, 0xFE, //       done: JR done
    ]
});

/// True once the serial output contains a full "Passed" or "Failed" marker.
pub fn serial_contains_result(serial: &[u8]) -> bool {
    const PASSED: &[u8] = b"Passed";
    const FAILED: &[u8] = b"Failed";
    serial.windows(PASSED.len()).any(|w| w == PASSED)
        || serial.windows(FAILED.len()).any(|w| w == FAILED)
}
