//! Instruction set of the 6502.
//!
//! Tables for the 13 addressing modes and the 56 documented instructions, plus the lookups the
//! line parser and the compiler need: mnemonic and mode by name, opcode by (mnemonic, mode) and
//! (mnemonic, mode, cycles) by opcode.

use std::collections::HashMap;
use std::fmt;

use edit_distance::edit_distance;
use lazy_static::lazy_static;

/// Addressing modes, with the mode names used by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddrMode {
    /// Absolute, `OPC HHLL`.
    ABS,
    /// Absolute indexed with X, `OPC HHLL,X`.
    ABX,
    /// Absolute indexed with Y, `OPC HHLL,Y`.
    ABY,
    /// Accumulator, `OPC A`.
    ACC,
    /// Immediate, `OPC #NN`.
    IMM,
    /// Implied, `OPC`.
    IMP,
    /// Indirect, `OPC (HHLL)`.
    IND,
    /// Relative to PC, `OPC +NN`.
    REL,
    /// Zero page indirect indexed with Y, `OPC (LL),Y`.
    ZIY,
    /// Zero page, `OPC *LL`.
    ZPG,
    /// Zero page indexed with X, `OPC *LL,X`.
    ZPX,
    /// Zero page indexed with Y, `OPC *LL,Y`.
    ZPY,
    /// Zero page indexed with X indirect, `OPC (LL,X)`.
    ZXI,
}

const ADDR_MODES: [AddrMode; 13] = [
    AddrMode::ABS,
    AddrMode::ABX,
    AddrMode::ABY,
    AddrMode::ACC,
    AddrMode::IMM,
    AddrMode::IMP,
    AddrMode::IND,
    AddrMode::REL,
    AddrMode::ZIY,
    AddrMode::ZPG,
    AddrMode::ZPX,
    AddrMode::ZPY,
    AddrMode::ZXI,
];

impl AddrMode {
    /// All addressing modes, alphabetically.
    pub fn all() -> &'static [AddrMode] {
        &ADDR_MODES
    }

    /// Case-insensitive lookup by mode name.
    pub fn find(name: &str) -> Option<AddrMode> {
        ADDR_MODES
            .iter()
            .copied()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            AddrMode::ABS => "ABS",
            AddrMode::ABX => "ABX",
            AddrMode::ABY => "ABY",
            AddrMode::ACC => "ACC",
            AddrMode::IMM => "IMM",
            AddrMode::IMP => "IMP",
            AddrMode::IND => "IND",
            AddrMode::REL => "REL",
            AddrMode::ZIY => "ZIY",
            AddrMode::ZPG => "ZPG",
            AddrMode::ZPX => "ZPX",
            AddrMode::ZPY => "ZPY",
            AddrMode::ZXI => "ZXI",
        }
    }

    /// Size of an instruction in this mode, opcode included.
    pub fn bytes(self) -> u16 {
        match self {
            AddrMode::IMP | AddrMode::ACC => 1,
            AddrMode::ABS | AddrMode::ABX | AddrMode::ABY | AddrMode::IND => 3,
            _ => 2,
        }
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_bytes(self) -> u16 {
        self.bytes() - 1
    }

    pub fn description(self) -> &'static str {
        match self {
            AddrMode::ABS => "Absolute",
            AddrMode::ABX => "Absolute, indexed with X",
            AddrMode::ABY => "Absolute, indexed with Y",
            AddrMode::ACC => "Accumulator",
            AddrMode::IMM => "Immediate",
            AddrMode::IMP => "Implied",
            AddrMode::IND => "Indirect",
            AddrMode::REL => "Relative to PC",
            AddrMode::ZIY => "Zero page, indirect, indexed with Y",
            AddrMode::ZPG => "Zero page",
            AddrMode::ZPX => "Zero page, indexed with X",
            AddrMode::ZPY => "Zero page, indexed with Y",
            AddrMode::ZXI => "Zero page, indexed with X, indirect",
        }
    }

    /// The assembler notation of the mode, e.g. `OPC (LL),Y`.
    pub fn syntax(self) -> &'static str {
        match self {
            AddrMode::ABS => "OPC HHLL",
            AddrMode::ABX => "OPC HHLL,X",
            AddrMode::ABY => "OPC HHLL,Y",
            AddrMode::ACC => "OPC A",
            AddrMode::IMM => "OPC #NN",
            AddrMode::IMP => "OPC",
            AddrMode::IND => "OPC (HHLL)",
            AddrMode::REL => "OPC +NN",
            AddrMode::ZIY => "OPC (LL),Y",
            AddrMode::ZPG => "OPC *LL",
            AddrMode::ZPX => "OPC *LL,X",
            AddrMode::ZPY => "OPC *LL,Y",
            AddrMode::ZXI => "OPC (LL,X)",
        }
    }

    /// Modes whose operand is a single byte.
    pub fn is_byte_operand(self) -> bool {
        self.operand_bytes() == 1
    }

    /// The zero page counterpart of an absolute mode.
    pub fn zero_page_variant(self) -> Option<AddrMode> {
        match self {
            AddrMode::ABS => Some(AddrMode::ZPG),
            AddrMode::ABX => Some(AddrMode::ZPX),
            AddrMode::ABY => Some(AddrMode::ZPY),
            _ => None,
        }
    }
}

impl fmt::Display for AddrMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Renders `operand` in the notation of `mode`, without the mnemonic. `operand` replaces the
/// `HHLL`, `LL` or `NN` placeholder of the syntax template.
pub fn format_operand(mode: AddrMode, operand: &str) -> String {
    let template = mode.syntax().trim_start_matches("OPC").trim_start();

    for placeholder in &["HHLL", "LL", "NN"] {
        if template.contains(placeholder) {
            return template.replacen(placeholder, operand, 1);
        }
    }

    template.to_string()
}

/// One addressing mode variant of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub mode: AddrMode,
    pub opcode: u8,
    pub cycles: u8,
    /// Worst case extra cycles (page crossing, branch taken).
    pub xcycles: u8,
}

macro_rules! mnemonics {
    ( $( $name:ident $desc:literal [ $( $mode:ident $opcode:literal $cycles:literal $xcycles:literal ),* ] )* ) => {
        /// The documented 6502 instructions.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Mnemonic {
            $( $name, )*
        }

        const MNEMONICS: &[Mnemonic] = &[ $( Mnemonic::$name, )* ];

        impl Mnemonic {
            pub fn name(self) -> &'static str {
                match self {
                    $( Mnemonic::$name => stringify!($name), )*
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $( Mnemonic::$name => $desc, )*
                }
            }

            /// All addressing mode variants of the instruction.
            pub fn variants(self) -> &'static [Variant] {
                match self {
                    $( Mnemonic::$name => &[ $( Variant {
                        mode: AddrMode::$mode,
                        opcode: $opcode,
                        cycles: $cycles,
                        xcycles: $xcycles,
                    }, )* ], )*
                }
            }
        }
    };
}

mnemonics! {
    ADC "add memory to accumulator with carry" [IMM 0x69 2 0, ZPG 0x65 3 0, ZPX 0x75 4 0, ABS 0x6D 4 0, ABX 0x7D 4 1, ABY 0x79 4 1, ZXI 0x61 6 0, ZIY 0x71 5 1]
    AND "AND memory with accumulator" [IMM 0x29 2 0, ZPG 0x25 3 0, ZPX 0x35 4 0, ABS 0x2D 4 0, ABX 0x3D 4 1, ABY 0x39 4 1, ZXI 0x21 6 0, ZIY 0x31 5 1]
    ASL "arithmetic shift one bit left (memory or accumulator)" [ACC 0x0A 2 0, ZPG 0x06 5 0, ZPX 0x16 6 0, ABS 0x0E 6 0, ABX 0x1E 7 0]
    BCC "branch on carry clear" [REL 0x90 2 2]
    BCS "branch on carry set" [REL 0xB0 2 2]
    BEQ "branch on result zero" [REL 0xF0 2 2]
    BIT "test bits in memory with accumulator" [ZPG 0x24 3 0, ABS 0x2C 4 0]
    BMI "branch on result minus" [REL 0x30 2 2]
    BNE "branch on result not zero" [REL 0xD0 2 2]
    BPL "branch on result plus" [REL 0x10 2 2]
    BRK "force break" [IMP 0x00 7 0]
    BVC "branch on overflow clear" [REL 0x50 2 2]
    BVS "branch on overflow set" [REL 0x70 2 2]
    CLC "clear carry flag" [IMP 0x18 2 0]
    CLD "clear decimal flag" [IMP 0xD8 2 0]
    CLI "clear interrupt disable flag" [IMP 0x58 2 0]
    CLV "clear overflow flag" [IMP 0xB8 2 0]
    CMP "compare memory with accumulator" [IMM 0xC9 2 0, ZPG 0xC5 3 0, ZPX 0xD5 4 0, ABS 0xCD 4 0, ABX 0xDD 4 1, ABY 0xD9 4 1, ZXI 0xC1 6 0, ZIY 0xD1 5 1]
    CPX "compare memory and index X" [IMM 0xE0 2 0, ZPG 0xE4 3 0, ABS 0xEC 4 0]
    CPY "compare memory and index Y" [IMM 0xC0 2 0, ZPG 0xC4 3 0, ABS 0xCC 4 0]
    DEC "decrement memory by one" [ZPG 0xC6 5 0, ZPX 0xD6 6 0, ABS 0xCE 6 0, ABX 0xDE 7 0]
    DEX "decrement index X by one" [IMP 0xCA 2 0]
    DEY "decrement index Y by one" [IMP 0x88 2 0]
    EOR "exclusive-or memory with accumulator" [IMM 0x49 2 0, ZPG 0x45 3 0, ZPX 0x55 4 0, ABS 0x4D 4 0, ABX 0x5D 4 1, ABY 0x59 4 1, ZXI 0x41 6 0, ZIY 0x51 5 1]
    INC "increment memory by one" [ZPG 0xE6 5 0, ZPX 0xF6 6 0, ABS 0xEE 6 0, ABX 0xFE 7 0]
    INX "increment index X by one" [IMP 0xE8 2 0]
    INY "increment index Y by one" [IMP 0xC8 2 0]
    JMP "jump to new location" [ABS 0x4C 3 0, IND 0x6C 5 0]
    JSR "jump to new location saving return address" [ABS 0x20 6 0]
    LDA "load accumulator with memory" [IMM 0xA9 2 0, ZPG 0xA5 3 0, ZPX 0xB5 4 0, ABS 0xAD 4 0, ABX 0xBD 4 1, ABY 0xB9 4 1, ZXI 0xA1 6 0, ZIY 0xB1 5 1]
    LDX "load index X with memory" [IMM 0xA2 2 0, ZPG 0xA6 3 0, ZPY 0xB6 4 0, ABS 0xAE 4 0, ABY 0xBE 4 1]
    LDY "load index Y with memory" [IMM 0xA0 2 0, ZPG 0xA4 3 0, ZPX 0xB4 4 0, ABS 0xAC 4 0, ABX 0xBC 4 1]
    LSR "logic shift one bit right (memory or accumulator)" [ACC 0x4A 2 0, ZPG 0x46 5 0, ZPX 0x56 6 0, ABS 0x4E 6 0, ABX 0x5E 7 0]
    NOP "no operation" [IMP 0xEA 2 0]
    ORA "OR memory with accumulator" [IMM 0x09 2 0, ZPG 0x05 3 0, ZPX 0x15 4 0, ABS 0x0D 4 0, ABX 0x1D 4 1, ABY 0x19 4 1, ZXI 0x01 6 0, ZIY 0x11 5 1]
    PHA "push accumulator on stack" [IMP 0x48 3 0]
    PHP "push processor status register on stack" [IMP 0x08 3 0]
    PLA "pull accumulator from stack" [IMP 0x68 4 0]
    PLP "pull processor status register from stack" [IMP 0x28 4 0]
    ROL "rotate one bit left (memory or accumulator)" [ACC 0x2A 2 0, ZPG 0x26 5 0, ZPX 0x36 6 0, ABS 0x2E 6 0, ABX 0x3E 7 0]
    ROR "rotate one bit right (memory or accumulator)" [ACC 0x6A 2 0, ZPG 0x66 5 0, ZPX 0x76 6 0, ABS 0x6E 6 0, ABX 0x7E 7 0]
    RTI "return from interrupt" [IMP 0x40 6 0]
    RTS "return from subroutine" [IMP 0x60 6 0]
    SBC "subtract memory from accumulator with borrow" [IMM 0xE9 2 0, ZPG 0xE5 3 0, ZPX 0xF5 4 0, ABS 0xED 4 0, ABX 0xFD 4 1, ABY 0xF9 4 1, ZXI 0xE1 6 0, ZIY 0xF1 5 1]
    SEC "set carry flag" [IMP 0x38 2 0]
    SED "set decimal flag" [IMP 0xF8 2 0]
    SEI "set interrupt disable flag" [IMP 0x78 2 0]
    STA "store accumulator in memory" [ZPG 0x85 3 0, ZPX 0x95 4 0, ABS 0x8D 4 0, ABX 0x9D 5 0, ABY 0x99 5 0, ZXI 0x81 6 0, ZIY 0x91 6 0]
    STX "store index X in memory" [ZPG 0x86 3 0, ZPY 0x96 4 0, ABS 0x8E 4 0]
    STY "store index Y in memory" [ZPG 0x84 3 0, ZPX 0x94 4 0, ABS 0x8C 4 0]
    TAX "transfer accumulator to index X" [IMP 0xAA 2 0]
    TAY "transfer accumulator to index Y" [IMP 0xA8 2 0]
    TSX "transfer stack pointer to index X" [IMP 0xBA 2 0]
    TXA "transfer index X to accumulator" [IMP 0x8A 2 0]
    TXS "transfer index X to stack register" [IMP 0x9A 2 0]
    TYA "transfer index Y to accumulator" [IMP 0x98 2 0]
}

/// Everything the decoder knows about one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub mnemonic: Mnemonic,
    pub mode: AddrMode,
    pub cycles: u8,
    pub xcycles: u8,
}

lazy_static! {
    static ref BY_NAME: HashMap<String, Mnemonic> = MNEMONICS
        .iter()
        .map(|m| (m.name().to_string(), *m))
        .collect();

    static ref DECODE: Vec<Option<OpcodeInfo>> = {
        let mut table = vec![None; 256];

        for mnemonic in MNEMONICS {
            for variant in mnemonic.variants() {
                table[variant.opcode as usize] = Some(OpcodeInfo {
                    mnemonic: *mnemonic,
                    mode: variant.mode,
                    cycles: variant.cycles,
                    xcycles: variant.xcycles,
                });
            }
        }

        table
    };
}

impl Mnemonic {
    /// All instructions, alphabetically.
    pub fn all() -> &'static [Mnemonic] {
        MNEMONICS
    }

    /// Case-insensitive lookup by mnemonic.
    pub fn find(name: &str) -> Option<Mnemonic> {
        BY_NAME.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn variant(self, mode: AddrMode) -> Option<&'static Variant> {
        self.variants().iter().find(|v| v.mode == mode)
    }

    /// The opcode of this instruction in `mode`, if it has such a variant.
    pub fn opcode(self, mode: AddrMode) -> Option<u8> {
        self.variant(mode).map(|v| v.opcode)
    }

    pub fn has_mode(self, mode: AddrMode) -> bool {
        self.variant(mode).is_some()
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The mnemonic closest to `name`, when it is at most two edits away.
pub fn suggest(name: &str) -> Option<Mnemonic> {
    let upper = name.to_ascii_uppercase();

    MNEMONICS
        .iter()
        .map(|m| (edit_distance(&upper, m.name()), *m))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, m)| m)
}

/// Looks up the instruction and addressing mode of an opcode.
pub fn decode(opcode: u8) -> Option<OpcodeInfo> {
    DECODE[opcode as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An opcode no variant encodes.
    const INVALID_OPCODE: u8 = 0xBB;

    #[test]
    fn table_size() {
        assert_eq!(Mnemonic::all().len(), 56);

        let variants: usize = Mnemonic::all().iter().map(|m| m.variants().len()).sum();
        assert_eq!(variants, 151);
    }

    #[test]
    fn opcodes_are_unique() {
        let mut seen = std::collections::HashSet::new();

        for m in Mnemonic::all() {
            for v in m.variants() {
                assert!(seen.insert(v.opcode), "duplicate opcode {:02X}", v.opcode);
                assert_ne!(v.opcode, INVALID_OPCODE);
            }
        }
    }

    #[test]
    fn lookups() {
        assert_eq!(Mnemonic::find("lda"), Some(Mnemonic::LDA));
        assert_eq!(Mnemonic::find("LDZ"), None);
        assert_eq!(AddrMode::find("zpx"), Some(AddrMode::ZPX));
        assert_eq!(Mnemonic::LDA.opcode(AddrMode::IMM), Some(0xA9));
        assert_eq!(Mnemonic::STA.opcode(AddrMode::IMM), None);
    }

    #[test]
    fn decode_opcode() {
        let info = decode(0xF0).unwrap();

        assert_eq!(info.mnemonic, Mnemonic::BEQ);
        assert_eq!(info.mode, AddrMode::REL);
        assert_eq!((info.cycles, info.xcycles), (2, 2));
        assert_eq!(decode(INVALID_OPCODE), None);
    }

    #[test]
    fn operand_templates() {
        assert_eq!(format_operand(AddrMode::ZIY, "10"), "(10),Y");
        assert_eq!(format_operand(AddrMode::ABX, "0300"), "0300,X");
        assert_eq!(format_operand(AddrMode::IMM, "05"), "#05");
        assert_eq!(format_operand(AddrMode::ACC, ""), "A");
        assert_eq!(format_operand(AddrMode::IMP, ""), "");
    }

    #[test]
    fn suggestions() {
        assert!(suggest("LAD").is_some());
        assert_eq!(suggest("JMPP"), Some(Mnemonic::JMP));
        assert_eq!(suggest("XXXXXXXX"), None);
    }
}
