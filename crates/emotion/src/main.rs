use argh::FromArgs;
use elf::{abi::PT_LOAD, endian::LittleEndian, ElfBytes};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use emotion::{
    bytes::Bytes,
    config::Config,
    emotion_engine::{core::instruction::Instruction, system::System},
};

#[derive(FromArgs)]
#[argh(description = "Emotion Engine interpreter")]
struct Arguments {
    #[argh(switch, short = 'd', description = "disassemble the ELF file")]
    disassemble: bool,
    #[argh(option, short = 'b', description = "BIOS file")]
    bios: Option<String>,
    #[argh(option, description = "log filter, e.g. `emotion=debug`")]
    log: Option<String>,
    #[argh(option, description = "number of core cycles to run")]
    cycles: Option<u64>,
    #[argh(
        option,
        short = 'e',
        from_str_fn(parse_address),
        description = "start executing at this hex address"
    )]
    entry: Option<u32>,
    #[argh(option, description = "bus clock divider (default 2)")]
    bus_divider: Option<u64>,
    #[argh(positional, description = "ELF file")]
    file: Option<String>,
}

fn parse_address(value: &str) -> Result<u32, String> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|error| format!("{value}: {error}"))
}

#[derive(Debug, Error)]
enum LoadError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed ELF: {0}")]
    Elf(#[from] elf::ParseError),
    #[error("segment of {size:#x} bytes at {address:#010x} does not fit in {target}")]
    TooLarge {
        target: &'static str,
        address: u64,
        size: usize,
    },
    #[error("nothing to run: pass an ELF file or --bios")]
    NoImage,
}

struct Segment<'a> {
    virtual_address: u64,
    physical_address: u64,
    data: &'a [u8],
}

fn segments<'a>(elf: &ElfBytes<'a, LittleEndian>) -> Result<Vec<Segment<'a>>, LoadError> {
    let Some(table) = elf.segments() else {
        return Ok(Vec::new());
    };
    table
        .iter()
        .filter(|header| header.p_type == PT_LOAD)
        .map(|header| -> Result<Segment<'a>, LoadError> {
            Ok(Segment {
                virtual_address: header.p_vaddr,
                physical_address: header.p_paddr,
                data: elf.segment_data(&header)?,
            })
        })
        .collect()
}

fn disassemble(file: &str) -> Result<(), LoadError> {
    let elf_data = std::fs::read(file)?;
    let elf = ElfBytes::<LittleEndian>::minimal_parse(&elf_data)?;
    println!("Entry point: {:#x}", elf.ehdr.e_entry);
    for segment in segments(&elf)? {
        for (word_index, bytes) in segment.data.chunks_exact(4).enumerate() {
            let address = (segment.virtual_address + word_index as u64 * 4) as u32;
            let instruction = Instruction::decode(u32::from_bytes(bytes));
            print!(
                "{:8x}:    {:02x} {:02x} {:02x} {:02x}    {}",
                address, bytes[3], bytes[2], bytes[1], bytes[0], instruction
            );
            if instruction.is_nop() {
                println!(" # NOP");
            } else if let Some(branch_target) = instruction.branch_target(address) {
                println!(" # {:#x}", branch_target);
            } else {
                println!();
            }
        }
    }
    Ok(())
}

fn load_bios(system: &mut System, bios: &str) -> Result<(), LoadError> {
    let bios_data = std::fs::read(bios)?;
    let boot_memory = &mut system.bus.boot_memory;
    if bios_data.len() > boot_memory.len() {
        return Err(LoadError::TooLarge {
            target: "boot ROM",
            address: 0,
            size: bios_data.len(),
        });
    }
    boot_memory[..bios_data.len()].copy_from_slice(&bios_data);
    info!("Loaded {} byte BIOS", bios_data.len());
    Ok(())
}

fn load_elf(system: &mut System, file: &str) -> Result<u32, LoadError> {
    let elf_data = std::fs::read(file)?;
    let elf = ElfBytes::<LittleEndian>::minimal_parse(&elf_data)?;
    for segment in segments(&elf)? {
        // Segments are linked for kseg0; strip the segment bits.
        let address = segment.physical_address & 0x1FFF_FFFF;
        let start = address as usize;
        let end = start + segment.data.len();
        let Some(memory) = system.bus.main_memory.get_mut(start..end) else {
            return Err(LoadError::TooLarge {
                target: "main memory",
                address: segment.physical_address,
                size: segment.data.len(),
            });
        };
        memory.copy_from_slice(segment.data);
        info!(
            "Loaded {:#x} bytes at {:#010x} (virtual {:#010x})",
            segment.data.len(),
            address,
            segment.virtual_address
        );
    }
    Ok(elf.ehdr.e_entry as u32)
}

fn main() -> Result<(), LoadError> {
    let arguments: Arguments = argh::from_env();
    let filter = match &arguments.log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if arguments.disassemble {
        let file = arguments.file.as_deref().ok_or(LoadError::NoImage)?;
        return disassemble(file);
    }

    let mut config = Config {
        cycles: arguments.cycles,
        entry_point: arguments.entry,
        ..Config::default()
    };
    if let Some(bus_divider) = arguments.bus_divider {
        config.bus_divider = bus_divider;
    }
    let mut system = System::new(config);
    match (&arguments.bios, &arguments.file) {
        (Some(bios), _) => load_bios(&mut system, bios)?,
        (None, Some(file)) => {
            let entry_point = load_elf(&mut system, file)?;
            info!("Entry point: {:#010x}", entry_point);
            if arguments.entry.is_none() {
                system.core.set_entry_point(entry_point);
            }
        }
        (None, None) => return Err(LoadError::NoImage),
    }
    system.run(None);
    info!(
        "Stopped after {} cycles at {:#010x}",
        system.cycle(),
        system.core.state.program_counter
    );
    Ok(())
}
