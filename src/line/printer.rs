//! Source reconstruction of [Line] records, the inverse of the line parser.

use crate::arena::{StringArena, SLOT_SIZE};
use crate::isa;

use super::{InstructionLine, Line, Operand};

/// Prints `line` the way it would be typed, with labels aligned in a column of [SLOT_SIZE]
/// characters.
pub fn print_line(arena: &StringArena, line: &Line) -> String {
    match line {
        Line::Comment { text } => {
            if text.is_empty() {
                return ";".to_string();
            }

            let bytes: Vec<u8> = text.iter().flat_map(|h| arena.get(*h).to_vec()).collect();

            format!("; {}", String::from_utf8_lossy(&bytes))
        }
        Line::Org { address } => {
            format!("{} .ORG {:04X}", arena.get_padded(None, SLOT_SIZE), address)
        }
        Line::Bytes { label, data } => {
            let values: Vec<String> = arena
                .get_raw(*data)
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect();

            format!("{} .DB {}", arena.get_padded(*label, SLOT_SIZE), values.join(","))
        }
        Line::Words { label, data } => {
            let values: Vec<String> = arena
                .get_raw(*data)
                .chunks(2)
                .map(|pair| format!("{:04X}", le_word(pair)))
                .collect();

            format!("{} .DW {}", arena.get_padded(*label, SLOT_SIZE), values.join(","))
        }
        Line::EqByte { label, value } => {
            format!("{} .EB {:02X}", arena.get_padded(Some(*label), SLOT_SIZE), value)
        }
        Line::EqWord { label, value } => {
            format!("{} .EW {:04X}", arena.get_padded(Some(*label), SLOT_SIZE), value)
        }
        Line::Instruction(ins) => print_instruction(arena, ins),
    }
}

/// Little endian word from up to two bytes.
pub(crate) fn le_word(pair: &[u8]) -> u16 {
    let lo = pair.get(0).copied().unwrap_or(0) as u16;
    let hi = pair.get(1).copied().unwrap_or(0) as u16;

    lo | hi << 8
}

fn print_instruction(arena: &StringArena, ins: &InstructionLine) -> String {
    let info = match isa::decode(ins.opcode) {
        Some(info) => info,
        None => return format!("?? {:02X}", ins.opcode),
    };

    let mode = ins.written_mode().unwrap_or(info.mode);

    let operand = match ins.operand {
        Operand::Symbol(handle) => arena.get_str(handle),
        Operand::Literal(value) if mode.is_byte_operand() => format!("{:02X}", value),
        Operand::Literal(value) => format!("{:04X}", value),
        Operand::None => String::new(),
    };

    let text = format!(
        "{}{:<4}{}",
        arena.get_padded(ins.label, SLOT_SIZE + 1),
        info.mnemonic.name(),
        isa::format_operand(mode, &operand),
    );

    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::parse_line;
    use super::*;

    fn reprint(arena: &mut StringArena, text: &str) -> String {
        let fields: Vec<&str> = text.split_whitespace().collect();
        let line = parse_line(arena, &fields).unwrap().line;
        print_line(arena, &line)
    }

    #[test]
    fn layout() {
        let mut arena = StringArena::new(32);

        assert_eq!(reprint(&mut arena, ".org 200"), "         .ORG 0200");
        assert_eq!(reprint(&mut arena, "lda #5"), "         LDA #05");
        assert_eq!(reprint(&mut arena, "loop dex"), "loop     DEX");
        assert_eq!(reprint(&mut arena, "sta 300,x"), "         STA 0300,X");
        assert_eq!(reprint(&mut arena, "beq loop"), "         BEQ loop");
        assert_eq!(reprint(&mut arena, "bne +fe"), "         BNE +FE");
        assert_eq!(reprint(&mut arena, "lda (ptr),y"), "         LDA (ptr),Y");
        assert_eq!(reprint(&mut arena, "asl a"), "         ASL A");
        assert_eq!(reprint(&mut arena, "tbl .bytes 1,2"), "tbl      .DB 01,02");
        assert_eq!(reprint(&mut arena, ".dw 200,fffc"), "         .DW 0200,FFFC");
        assert_eq!(reprint(&mut arena, "k .eb 7"), "k        .EB 07");
        assert_eq!(reprint(&mut arena, "io .ew d010"), "io       .EW D010");
        assert_eq!(reprint(&mut arena, "; hello   world"), "; hello world");
        assert_eq!(reprint(&mut arena, ";"), ";");
    }

    #[test]
    fn long_label_keeps_a_separator() {
        let mut arena = StringArena::new(8);

        assert_eq!(reprint(&mut arena, "abcdefgh NOP"), "abcdefgh NOP");
        assert_eq!(reprint(&mut arena, "abcdefgh .EB 01"), "abcdefgh .EB 01");
    }
}
