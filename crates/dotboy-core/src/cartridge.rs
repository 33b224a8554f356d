use std::{fs, io, path::Path};

use thiserror::Error;

/// Everything the loader needs lives in 0x0100-0x014F.
const HEADER_END: usize = 0x0150;

const OFFSET_TITLE: usize = 0x0134;
const OFFSET_CART_TYPE: usize = 0x0147;
const OFFSET_ROM_SIZE: usize = 0x0148;
const OFFSET_RAM_SIZE: usize = 0x0149;

/// ROM sizes by header code 0x00-0x08.
const ROM_SIZES: [usize; 9] = [
    32 * 1024,
    64 * 1024,
    128 * 1024,
    256 * 1024,
    512 * 1024,
    1024 * 1024,
    2 * 1024 * 1024,
    4 * 1024 * 1024,
    8 * 1024 * 1024,
];

/// Cartridge RAM sizes by header code 0x00-0x05. Code 0x01 is unused.
const RAM_SIZES: [usize; 6] = [0, 0, 8 * 1024, 32 * 1024, 128 * 1024, 64 * 1024];

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("ROM image truncated: {0} bytes, header needs at least 0x150")]
    Truncated(usize),
    #[error("ROM image shorter than declared: {have} bytes, header declares {declared}")]
    ShortRom { have: usize, declared: usize },
    #[error("unknown ROM size code {0:#04X}")]
    BadRomSize(u8),
    #[error("unknown RAM size code {0:#04X}")]
    BadRamSize(u8),
    #[error("unsupported cartridge type {0:#04X}")]
    UnsupportedMapper(u8),
    #[error("failed to read ROM file: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of a bus write routed into the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEffect {
    /// The cartridge does not respond to this write.
    Ignored,
    /// Store the byte at this offset into cartridge RAM.
    Ram(usize),
    /// The write updated a controller register; nothing to store.
    Control,
}

/// Address-translation seam for memory bank controllers.
///
/// `NoMbc` is the only controller implemented here; banked families (MBC1,
/// MBC2, MBC3, MBC5) plug in through this trait.
pub trait Mapper {
    /// Map a bus address in 0x0000-0x7FFF / 0xA000-0xBFFF to a ROM offset.
    /// `None` means the cartridge does not drive the bus for this address.
    fn map_read(&self, addr: u16) -> Option<usize>;

    /// React to a bus write in the cartridge ranges.
    fn map_write(&mut self, addr: u16, data: u8) -> WriteEffect;
}

/// The trivial 32 KiB cartridge: ROM is mapped flat, writes go nowhere.
struct NoMbc;

impl Mapper for NoMbc {
    fn map_read(&self, addr: u16) -> Option<usize> {
        match addr {
            0x0000..=0x7FFF => Some(addr as usize),
            _ => None,
        }
    }

    fn map_write(&mut self, _addr: u16, _data: u8) -> WriteEffect {
        WriteEffect::Ignored
    }
}

pub struct Cartridge {
    rom: Vec<u8>,
    ram: Vec<u8>,
    pub title: String,
    cart_type: u8,
    mapper: Box<dyn Mapper + Send>,
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("rom_len", &self.rom.len())
            .field("ram_len", &self.ram.len())
            .field("title", &self.title)
            .field("cart_type", &self.cart_type)
            .finish()
    }
}

impl Cartridge {
    /// Parse the header and build a cartridge from a raw ROM image.
    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        let header = Header::parse(&data)?;

        let declared = header.rom_size()?;
        if data.len() < declared {
            return Err(CartridgeError::ShortRom {
                have: data.len(),
                declared,
            });
        }
        let ram_size = header.ram_size()?;

        let cart_type = header.cart_type();
        let mapper: Box<dyn Mapper + Send> = match cart_type {
            0x00 => Box::new(NoMbc),
            other => return Err(CartridgeError::UnsupportedMapper(other)),
        };

        let title = header.title();
        core_info!(
            Cartridge,
            "loaded \"{}\" (type {:02X}, ROM {} KiB, RAM {} KiB)",
            title,
            cart_type,
            declared / 1024,
            ram_size / 1024
        );

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            title,
            cart_type,
            mapper,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let data = fs::read(path)?;
        Self::load(data)
    }

    pub fn cart_type(&self) -> u8 {
        self.cart_type
    }

    /// Bus read. `None` means the cartridge leaves the bus floating and the
    /// console substitutes the open-bus value.
    pub fn read(&self, addr: u16) -> Option<u8> {
        if let Some(offset) = self.mapper.map_read(addr) {
            return self.rom.get(offset).copied();
        }
        if (0xA000..=0xBFFF).contains(&addr) && !self.ram.is_empty() {
            let idx = (addr as usize - 0xA000) % self.ram.len();
            return Some(self.ram[idx]);
        }
        None
    }

    /// Bus write. Returns whether the cartridge claimed the write.
    pub fn write(&mut self, addr: u16, data: u8) -> bool {
        match self.mapper.map_write(addr, data) {
            WriteEffect::Ignored => false,
            WriteEffect::Control => true,
            WriteEffect::Ram(offset) => {
                if let Some(byte) = self.ram.get_mut(offset) {
                    *byte = data;
                    true
                } else {
                    false
                }
            }
        }
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::Truncated(data.len()));
        }
        Ok(Self { data })
    }

    fn title(&self) -> String {
        let mut slice = &self.data[OFFSET_TITLE..OFFSET_TITLE + 16];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn cart_type(&self) -> u8 {
        self.data[OFFSET_CART_TYPE]
    }

    fn rom_size(&self) -> Result<usize, CartridgeError> {
        let code = self.data[OFFSET_ROM_SIZE];
        ROM_SIZES
            .get(code as usize)
            .copied()
            .ok_or(CartridgeError::BadRomSize(code))
    }

    fn ram_size(&self) -> Result<usize, CartridgeError> {
        let code = self.data[OFFSET_RAM_SIZE];
        RAM_SIZES
            .get(code as usize)
            .copied()
            .ok_or(CartridgeError::BadRamSize(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_image() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[OFFSET_TITLE..OFFSET_TITLE + 8].copy_from_slice(b"TESTCART");
        rom
    }

    #[test]
    fn parses_title_and_type() {
        let cart = Cartridge::load(rom_image()).unwrap();
        assert_eq!(cart.title, "TESTCART");
        assert_eq!(cart.cart_type(), 0x00);
    }

    #[test]
    fn no_mbc_reads_rom_flat() {
        let mut rom = rom_image();
        rom[0x0000] = 0x12;
        rom[0x7FFF] = 0x34;
        let cart = Cartridge::load(rom).unwrap();
        assert_eq!(cart.read(0x0000), Some(0x12));
        assert_eq!(cart.read(0x7FFF), Some(0x34));
        // No cartridge RAM on a plain 32 KiB cart.
        assert_eq!(cart.read(0xA000), None);
    }

    #[test]
    fn no_mbc_rejects_writes() {
        let mut cart = Cartridge::load(rom_image()).unwrap();
        assert!(!cart.write(0x2000, 0xFF));
        assert_eq!(cart.read(0x2000), Some(0x00));
    }

    #[test]
    fn truncated_image_is_rejected() {
        let err = Cartridge::load(vec![0; 0x100]).unwrap_err();
        assert!(matches!(err, CartridgeError::Truncated(0x100)));
    }

    #[test]
    fn short_rom_is_rejected() {
        let mut rom = rom_image();
        rom[OFFSET_ROM_SIZE] = 0x01; // declares 64 KiB, image is 32 KiB
        let err = Cartridge::load(rom).unwrap_err();
        assert!(matches!(
            err,
            CartridgeError::ShortRom {
                have: 0x8000,
                declared: 0x10000
            }
        ));
    }

    #[test]
    fn bad_size_codes_are_rejected() {
        let mut rom = rom_image();
        rom[OFFSET_ROM_SIZE] = 0x52;
        assert!(matches!(
            Cartridge::load(rom).unwrap_err(),
            CartridgeError::BadRomSize(0x52)
        ));

        let mut rom = rom_image();
        rom[OFFSET_RAM_SIZE] = 0x09;
        assert!(matches!(
            Cartridge::load(rom).unwrap_err(),
            CartridgeError::BadRamSize(0x09)
        ));
    }

    #[test]
    fn banked_mappers_are_reported() {
        let mut rom = rom_image();
        rom[OFFSET_CART_TYPE] = 0x01; // MBC1
        assert!(matches!(
            Cartridge::load(rom).unwrap_err(),
            CartridgeError::UnsupportedMapper(0x01)
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.gb");
        std::fs::write(&path, rom_image()).unwrap();
        let cart = Cartridge::from_file(&path).unwrap();
        assert_eq!(cart.title, "TESTCART");
    }
}
