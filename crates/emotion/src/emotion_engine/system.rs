use std::{cell::RefCell, rc::Rc};

use tracing::{debug, info};

use crate::{bits::Bits, config::Config};

use super::{
    bus::{Bus, Region},
    core::{control::Interrupt, Core},
    dmac::{self, Dmac},
    gs::Gs,
    intc::{self, Intc, InterruptSource},
    peripheral::{Peripheral, SharedPeripheral},
    rdram::{self, Rdram},
    register_file::RegisterFile,
    scheduler::{Event, Scheduler},
    sif::Sif,
    timer::Timer,
};

/// The emotion engine with its bus and devices, stepped together.
pub struct System {
    pub core: Core,
    pub bus: Bus,
    pub intc: Rc<RefCell<Intc>>,
    pub timer: Rc<RefCell<Timer>>,
    pub gs: Rc<RefCell<Gs>>,
    scheduler: Scheduler,
    config: Config,
}

fn shared<T: Peripheral + 'static>(device: &Rc<RefCell<T>>) -> SharedPeripheral {
    device.clone()
}

impl System {
    /// A reset core on a bus carrying the standard device map.
    pub fn new(config: Config) -> System {
        let intc = Rc::new(RefCell::new(Intc::new()));
        let timer = Rc::new(RefCell::new(Timer::new()));
        let gs = Rc::new(RefCell::new(Gs::new()));
        let rdram = Rc::new(RefCell::new(Rdram::new()));
        let dmac = Rc::new(RefCell::new(Dmac::new()));
        let sif = Rc::new(RefCell::new(Sif::new()));
        let vif = Rc::new(RefCell::new(RegisterFile::new("VIF")));
        let ipu = Rc::new(RefCell::new(RegisterFile::new("IPU")));

        let mut bus = Bus::new();
        bus.register(Region::Address(intc::STATUS_ADDRESS), shared(&intc));
        bus.register(Region::Address(intc::MASK_ADDRESS), shared(&intc));
        bus.register(Region::Address(rdram::RICM_ADDRESS), shared(&rdram));
        bus.register(Region::Address(rdram::DRD_ADDRESS), shared(&rdram));
        bus.register(Region::Range(0x1000_8000..0x1000_F000), shared(&dmac));
        bus.register(Region::Address(dmac::ENABLE_READ_ADDRESS), shared(&dmac));
        bus.register(Region::Address(dmac::ENABLE_WRITE_ADDRESS), shared(&dmac));
        bus.register(Region::Range(0x1000_F200..0x1000_F260), shared(&sif));
        bus.register(Region::Range(0x1000_3800..0x1000_4000), shared(&vif));
        bus.register(Region::Range(0x1000_2000..0x1000_3000), shared(&ipu));
        bus.register(Region::Range(0x1000_0000..0x1000_2000), shared(&timer));
        bus.register(Region::Range(0x1200_0000..0x1200_2000), shared(&gs));

        let mut core = Core::new();
        if let Some(entry_point) = config.entry_point {
            core.set_entry_point(entry_point);
        }
        System {
            core,
            bus,
            intc,
            timer,
            gs,
            scheduler: Scheduler::new(),
            config,
        }
    }

    pub fn cycle(&self) -> u64 {
        self.scheduler.cycle
    }

    /// Run for `cycles` core cycles, or until the configured budget when
    /// `None`. Event boundaries may overshoot by a few cycles.
    pub fn run(&mut self, cycles: Option<u64>) {
        let budget = cycles.or(self.config.cycles);
        let end = budget.map(|cycles| self.scheduler.cycle + cycles);
        info!("Running from {:#010x}", self.core.state.program_counter);
        while end.map_or(true, |end| self.scheduler.cycle < end) {
            match self.scheduler.next_event() {
                Event::Run(cycles) => {
                    let cycles = match end {
                        Some(end) => cycles.min(end - self.scheduler.cycle),
                        None => cycles,
                    };
                    self.run_cycles(cycles);
                }
                Event::VBlankStart => {
                    debug!("VBlank start");
                    self.intc.borrow_mut().raise(InterruptSource::VBlankStart);
                }
                Event::GsVBlank => {
                    if self.gs.borrow_mut().vblank() {
                        self.intc.borrow_mut().raise(InterruptSource::Gs);
                    }
                }
                Event::VBlankEnd => {
                    debug!("VBlank end");
                    self.intc.borrow_mut().raise(InterruptSource::VBlankEnd);
                }
            }
            self.update_interrupt_line();
        }
    }

    fn run_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.core.step_instruction(&mut self.bus);
            self.scheduler.tick(1);
            if self.scheduler.cycle % self.config.bus_divider.max(1) == 0 {
                self.step_bus();
            }
            // A store to I_STAT or I_MASK changes INT0 before the next fetch.
            self.update_interrupt_line();
        }
    }

    fn step_bus(&mut self) {
        let raised = {
            let mut timer = self.timer.borrow_mut();
            timer.step();
            timer.take_interrupts()
        };
        if raised != 0 {
            let mut intc = self.intc.borrow_mut();
            for index in (0..4u8).filter(|&index| raised.bit(index)) {
                intc.raise(InterruptSource::timer(index as usize));
            }
        }
    }

    fn update_interrupt_line(&mut self) {
        if self.intc.borrow().pending() {
            self.core.request_interrupt(Interrupt::Int0);
        } else {
            self.core.clear_interrupt(Interrupt::Int0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion_engine::{
        core::{
            control::{self, Status},
            register::Register,
            testing::immediate,
        },
        scheduler::CYCLES_PER_FRAME,
    };

    const PROGRAM_START: u32 = 0x0000_1000;

    fn system(program: &[u32]) -> System {
        let mut system = System::new(Config {
            entry_point: Some(PROGRAM_START),
            ..Config::default()
        });
        system.core.state.control.set_status(Status(0));
        for (index, word) in program.iter().enumerate() {
            system.bus.write(PROGRAM_START + index as u32 * 4, *word);
        }
        system
    }

    #[test]
    fn store_through_kseg1_reaches_intc() {
        // lui t0, 0xb001; ori t1, zero, 0x400; sw t1, -0xff0(t0)
        let mut system = system(&[
            immediate(0x0F, Register::Zero, Register::T0, 0xB001),
            immediate(0x0D, Register::Zero, Register::T1, 0x0400),
            immediate(0x2B, Register::T0, Register::T1, 0xF010),
        ]);
        system.run(Some(3));
        assert_eq!(system.bus.read::<u32>(intc::MASK_ADDRESS), 0x400);
        assert_eq!(system.bus.read::<u32>(0x0000_F010), 0);
        assert_eq!(system.cycle(), 3);
    }

    #[test]
    fn acknowledge_lowers_int0_before_eret() {
        // sw t1, -0x1000(t0) ; eret
        let mut system = system(&[
            immediate(0x2B, Register::T0, Register::T1, 0xF000),
            0x4200_0018,
        ]);
        system.core.set_register::<u32>(Register::T0, 0xB001_0000);
        system.core.set_register::<u32>(Register::T1, 1 << 2);
        // IE, EXL, IM2, EIE
        system
            .core
            .state
            .control
            .set_status(Status(1 | 1 << 1 | 1 << 10 | 1 << 16));
        system
            .core
            .state
            .control
            .set_register(control::Register::Epc, 0x2000);
        system.bus.write::<u32>(intc::MASK_ADDRESS, 1 << 2);
        system.intc.borrow_mut().raise(InterruptSource::VBlankStart);
        system.update_interrupt_line();

        system.run(Some(2));
        assert_eq!(system.bus.read::<u32>(intc::STATUS_ADDRESS), 0);
        assert_eq!(system.core.state.program_counter, 0x2000);
        assert!(!system.core.state.control.status().exception_level());
        assert_eq!(system.core.state.control.cause().interrupts_pending(), 0);
    }

    #[test]
    fn byte_acknowledge_through_bus_keeps_timer_pending() {
        let mut system = system(&[]);
        system.bus.write::<u32>(intc::MASK_ADDRESS, 1 << 9);
        system.intc.borrow_mut().raise(InterruptSource::VBlankStart);
        system.intc.borrow_mut().raise(InterruptSource::Timer0);
        system.bus.write::<u8>(intc::STATUS_ADDRESS, 1 << 2);
        assert_eq!(system.bus.read::<u32>(intc::STATUS_ADDRESS), 1 << 9);
        assert!(system.intc.borrow().pending());
    }

    #[test]
    fn timer_interrupt_reaches_core() {
        let mut system = system(&[]);
        // IE, EIE, IM2
        system
            .core
            .state
            .control
            .set_status(Status(1 | 1 << 16 | 1 << 10));
        system.bus.write::<u32>(intc::MASK_ADDRESS, 1 << 9);
        system.bus.write::<u32>(0x1000_0020, 2);
        system.bus.write::<u32>(0x1000_0010, 1 << 7 | 1 << 8);
        system.run(Some(8));

        let cause = system.core.state.control.cause();
        assert_eq!(cause.exception_code(), 0);
        assert_eq!(cause.interrupts_pending(), 1 << 10);
        assert!(system.core.state.control.status().exception_level());
        assert_eq!(system.core.state.program_counter & 0xFFFF_F000, 0x8000_0000);
        assert_eq!(
            system.core.state.control.get_register(control::Register::Epc) & 0xFFFF_F000,
            PROGRAM_START
        );
    }

    #[test]
    fn vblank_latches_intc_status() {
        let mut system = system(&[]);
        system.scheduler.tick(CYCLES_PER_FRAME);
        system.run(Some(1));
        let status = system.bus.read::<u32>(intc::STATUS_ADDRESS);
        // The GS line stays low while IMR masks VSYNC.
        assert_eq!(status, 0b1100);
    }
}
