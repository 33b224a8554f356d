use crate::{cartridge::Cartridge, cpu::Cpu, mmu::Mmu};

/// The assembled console.
///
/// The host drives it one T-cycle at a time through [`GameBoy::clock`];
/// within a tick the PPU runs first, then the timer, then the CPU (unless
/// halted), so an interrupt raised by the fixed-function hardware is
/// visible to the CPU on the very tick it fires.
pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
        }
    }

    pub fn insert_cartridge(&mut self, cart: Cartridge) {
        self.mmu.load_cart(cart);
    }

    pub fn load_boot_rom(&mut self, data: Vec<u8>) {
        self.mmu.load_boot_rom(data);
    }

    /// Reset to the power-on state, preserving the loaded cartridge and
    /// boot ROM. Without a boot ROM the documented post-boot register state
    /// is injected and execution starts at the cartridge entry point.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        let boot = self.mmu.boot_rom.take();
        self.cpu = Cpu::new();
        self.mmu = Mmu::new();
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
        match boot {
            Some(b) => self.mmu.load_boot_rom(b),
            None => self.apply_post_boot_state(),
        }
    }

    /// Advance the machine by one T-cycle.
    pub fn clock(&mut self) {
        self.mmu.tick();
        if self.cpu.halted {
            // HALT wakes as soon as an enabled interrupt is pending,
            // whether or not IME is set.
            if self.mmu.pending_interrupts() != 0 {
                self.cpu.halted = false;
            }
        } else {
            self.cpu.clock(&mut self.mmu);
        }
    }

    /// Run `n` T-cycles.
    pub fn step(&mut self, n: u32) {
        for _ in 0..n {
            self.clock();
        }
    }

    /// Latest host-side button state; each mask is 4 bits, 0 = pressed.
    pub fn set_input(&mut self, buttons: u8, dpad: u8) {
        if self.mmu.input.set_state(buttons, dpad) {
            self.mmu.if_reg |= 0x10;
        }
    }

    pub fn framebuffer(&self) -> &[u8; 160 * 144] {
        self.mmu.ppu.framebuffer()
    }

    pub fn frame_completed(&self) -> bool {
        self.mmu.ppu.frame_completed()
    }

    pub fn clear_frame_completed(&mut self) {
        self.mmu.ppu.clear_frame_flag();
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.mmu.take_serial()
    }

    pub fn peek_serial(&self) -> &[u8] {
        self.mmu.serial.peek_output()
    }

    /// Register and I/O state documented for the moment the DMG boot ROM
    /// hands control to the cartridge.
    fn apply_post_boot_state(&mut self) {
        let header_checksum = self.mmu.read_byte(0x014D);
        self.cpu
            .set_af(if header_checksum == 0 { 0x0100 } else { 0x01B0 });
        self.cpu.set_bc(0x0013);
        self.cpu.set_de(0x00D8);
        self.cpu.set_hl(0x014D);
        self.cpu.sp = 0xFFFE;
        self.cpu.pc = 0x0100;

        self.mmu.timer.div = 0xABCC;
        self.mmu.if_reg = 0x01; // reads back as 0xE1
        self.mmu.ie_reg = 0x00;
        self.mmu.input.write(0x00); // P1 reads 0xCF
        self.mmu.ppu.apply_post_boot_state();
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
