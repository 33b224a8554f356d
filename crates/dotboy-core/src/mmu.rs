use crate::{cartridge::Cartridge, input::Input, ppu::Ppu, serial::Serial, timer::Timer};

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;
const OAM_SIZE: u16 = 0xA0;

/// The console bus: address decoder plus everything hanging off it.
///
/// The CPU lives outside and reaches the rest of the machine exclusively
/// through `read_byte`/`write_byte`; the PPU and timer are advanced through
/// [`Mmu::tick`] so interrupt requests land in `if_reg` before the CPU's
/// next fetch.
pub struct Mmu {
    pub wram: [u8; WRAM_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub cart: Option<Cartridge>,
    pub boot_rom: Option<Vec<u8>>,
    pub boot_mapped: bool,
    /// Last value written to the boot-ROM latch at 0xFF50.
    boot_latch: u8,
    pub if_reg: u8,
    pub ie_reg: u8,
    pub serial: Serial,
    pub ppu: Ppu,
    pub timer: Timer,
    pub input: Input,
}

impl Mmu {
    pub fn new() -> Self {
        Self {
            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],
            cart: None,
            boot_rom: None,
            boot_mapped: false,
            boot_latch: 0,
            if_reg: 0xE1,
            ie_reg: 0,
            serial: Serial::new(),
            ppu: Ppu::new(),
            timer: Timer::new(),
            input: Input::new(),
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    pub fn load_boot_rom(&mut self, data: Vec<u8>) {
        self.boot_rom = Some(data);
        self.boot_mapped = true;
        self.boot_latch = 0;
    }

    /// Advance the fixed-function hardware by one T-cycle: PPU first, then
    /// the timer. The ordering is part of the machine contract.
    pub fn tick(&mut self) {
        self.ppu.step(&mut self.if_reg);
        self.timer.tick(&mut self.if_reg);
    }

    #[inline]
    pub fn pending_interrupts(&self) -> u8 {
        self.if_reg & self.ie_reg & 0x1F
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x00FF if self.boot_mapped => self
                .boot_rom
                .as_ref()
                .and_then(|b| b.get(addr as usize).copied())
                .unwrap_or(0x00),
            0x0000..=0x7FFF | 0xA000..=0xBFFF => self
                .cart
                .as_ref()
                .and_then(|c| c.read(addr))
                .unwrap_or(0x00),
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize],
            // WRAM and its echo index by the low 13 bits.
            0xC000..=0xFDFF => self.wram[(addr & 0x1FFF) as usize],
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize],
            0xFEA0..=0xFEFF => 0x00,
            0xFF00 => self.input.read(),
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => 0xE0 | self.if_reg,
            0xFF40..=0xFF45 | 0xFF47..=0xFF4B => self.ppu.read_reg(addr),
            0xFF46 => self.ppu.dma,
            0xFF50 => self.boot_latch,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg,
            _ => 0x00,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            // The boot ROM shadows the cartridge; writes go nowhere.
            0x0000..=0x00FF if self.boot_mapped => {}
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    // The mapper may ignore the write.
                    let _ = cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => self.ppu.vram[(addr - 0x8000) as usize] = val,
            0xC000..=0xFDFF => self.wram[(addr & 0x1FFF) as usize] = val,
            0xFE00..=0xFE9F => self.ppu.oam[(addr - 0xFE00) as usize] = val,
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.input.write(val),
            0xFF01 | 0xFF02 => self.serial.write(addr, val, &mut self.if_reg),
            0xFF04..=0xFF07 => self.timer.write(addr, val, &mut self.if_reg),
            0xFF0F => self.if_reg = val & 0x1F,
            0xFF40..=0xFF45 | 0xFF47..=0xFF4B => self.ppu.write_reg(addr, val),
            0xFF46 => {
                self.ppu.dma = val;
                self.oam_dma(val);
            }
            0xFF50 => {
                self.boot_latch = val;
                if val & 0x01 != 0 && self.boot_mapped {
                    // Latched for the rest of the session.
                    self.boot_mapped = false;
                    core_trace!(Bus, "boot ROM unmapped");
                }
            }
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie_reg = val,
            _ => {}
        }
    }

    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write_word(&mut self, addr: u16, val: u16) {
        self.write_byte(addr, val as u8);
        self.write_byte(addr.wrapping_add(1), (val >> 8) as u8);
    }

    /// OAM DMA: copy 160 bytes from `src << 8` into OAM through the bus,
    /// atomically with respect to the rest of the machine.
    fn oam_dma(&mut self, src: u8) {
        let base = (src as u16) << 8;
        for i in 0..OAM_SIZE {
            let byte = self.read_byte(base.wrapping_add(i));
            self.ppu.oam[i as usize] = byte;
        }
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
