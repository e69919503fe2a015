//! Save-state support.
//!
//! Every field is written under a fixed name. The delay table is stored
//! verbatim rather than re-derived, so a restored CPU keeps the exact timing
//! it was saved with even if the derivation rules or clocks change later.

use emu_core::{SaveState, StateStore};

use crate::cpu::R800;
use crate::registers::{RegisterPair, Registers};
use crate::timing::{Delay, DelayTable, Personality};

fn save_registers(store: &mut StateStore, prefix: &str, regs: &Registers) {
    let pairs = [
        ("af", regs.af),
        ("bc", regs.bc),
        ("de", regs.de),
        ("hl", regs.hl),
        ("ix", regs.ix),
        ("iy", regs.iy),
        ("sp", regs.sp),
        ("pc", regs.pc),
        ("af_alt", regs.af_alt),
        ("bc_alt", regs.bc_alt),
        ("de_alt", regs.de_alt),
        ("hl_alt", regs.hl_alt),
        ("memptr", regs.wz),
    ];
    for (name, pair) in pairs {
        store.set(&format!("{prefix}.{name}"), u32::from(pair.word()));
    }
    store.set(&format!("{prefix}.i"), u32::from(regs.i));
    store.set(&format!("{prefix}.r"), u32::from(regs.r));
    store.set(&format!("{prefix}.r2"), u32::from(regs.r2));
    store.set(&format!("{prefix}.iff1"), u32::from(regs.iff1));
    store.set(&format!("{prefix}.iff2"), u32::from(regs.iff2));
    store.set(&format!("{prefix}.im"), u32::from(regs.im));
    store.set(&format!("{prefix}.halted"), u32::from(regs.halted));
    store.set(&format!("{prefix}.ei_pending"), u32::from(regs.ei_pending));
}

#[allow(clippy::cast_possible_truncation)] // Stored fields are written from narrower types.
fn load_registers(store: &StateStore, prefix: &str) -> Registers {
    let word = |name: &str| RegisterPair::new(store.get(&format!("{prefix}.{name}")) as u16);
    let byte = |name: &str| store.get(&format!("{prefix}.{name}")) as u8;
    let flag = |name: &str| store.get(&format!("{prefix}.{name}")) != 0;
    Registers {
        af: word("af"),
        bc: word("bc"),
        de: word("de"),
        hl: word("hl"),
        ix: word("ix"),
        iy: word("iy"),
        sp: word("sp"),
        pc: word("pc"),
        af_alt: word("af_alt"),
        bc_alt: word("bc_alt"),
        de_alt: word("de_alt"),
        hl_alt: word("hl_alt"),
        wz: word("memptr"),
        i: byte("i"),
        r: byte("r"),
        r2: byte("r2"),
        iff1: flag("iff1"),
        iff2: flag("iff2"),
        im: byte("im"),
        halted: flag("halted"),
        ei_pending: flag("ei_pending"),
    }
}

/// Pending switch: 0 none, otherwise bank + 1.
fn encode_pending(pending: Option<Personality>) -> u32 {
    pending.map_or(0, |p| p.bank() as u32 + 1)
}

fn decode_pending(value: u32) -> Option<Personality> {
    value.checked_sub(1).map(Personality::from_bank)
}

impl SaveState for R800 {
    fn save_state(&self, store: &mut StateStore) {
        store.set("system_time", self.system_time);
        store.set("vdp_time", self.vdp_time);
        store.set("last_refresh", self.last_refresh);
        store.set("cache_page", u32::from(self.cache_page));
        store.set("instruction_count", self.instruction_count);
        store.set("timeout", self.signals.timeout);

        store.set("data_bus", u32::from(self.signals.data_bus));
        store.set("default_data_bus", u32::from(self.signals.default_data_bus));
        store.set("int", u32::from(self.signals.int_asserted));
        store.set("nmi", u32::from(self.signals.nmi_asserted));
        store.set("nmi_edge", u32::from(self.signals.nmi_edge));

        store.set("mode", self.personality.bank() as u32);
        store.set("pending", encode_pending(self.pending));
        store.set("frequency_z80", self.frequencies[Personality::Z80.bank()]);
        store.set("frequency_r800", self.frequencies[Personality::R800.bank()]);

        for (i, ticks) in self.delays.raw().iter().enumerate() {
            store.set(&format!("delay{i:02}"), *ticks);
        }

        save_registers(store, "regs", &self.regs);
        save_registers(store, "bank0", &self.banks[0]);
        save_registers(store, "bank1", &self.banks[1]);
    }

    #[allow(clippy::cast_possible_truncation)] // Stored fields are written from narrower types.
    fn load_state(&mut self, store: &StateStore) {
        self.system_time = store.get("system_time");
        self.vdp_time = store.get("vdp_time");
        self.last_refresh = store.get("last_refresh");
        self.cache_page = store.get("cache_page") as u16;
        self.instruction_count = store.get("instruction_count");
        self.signals.timeout = store.get("timeout");

        self.signals.data_bus = store.get("data_bus") as u8;
        self.signals.default_data_bus = store.get("default_data_bus") as u8;
        self.signals.int_asserted = store.get("int") != 0;
        self.signals.nmi_asserted = store.get("nmi") != 0;
        self.signals.nmi_edge = store.get("nmi_edge") != 0;

        self.personality = Personality::from_bank(store.get("mode"));
        self.pending = decode_pending(store.get("pending"));
        self.frequencies = [
            store.get("frequency_z80").max(1),
            store.get("frequency_r800").max(1),
        ];

        let mut slots = [0; Delay::COUNT];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = store.get(&format!("delay{i:02}"));
        }
        self.delays = DelayTable::from_raw(slots);

        self.regs = load_registers(store, "regs");
        self.banks = [load_registers(store, "bank0"), load_registers(store, "bank1")];

        log::debug!(
            "R800: state loaded, {} at PC {:#06X}, time {}",
            self.personality,
            self.regs.pc.word(),
            self.system_time
        );
    }
}
