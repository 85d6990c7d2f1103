use prog6502::{
    arena::StringArena,
    line::{parse_line, print_line, Line},
};

fn parse(arena: &mut StringArena, text: &str) -> Line {
    let fields: Vec<&str> = text.split_whitespace().collect();
    parse_line(arena, &fields).unwrap().line
}

/// Printing, parsing the printed text and printing again gives the same text and the same kind
/// of line.
fn assert_round_trip(source: &str) {
    let mut arena = StringArena::default();

    let first = parse(&mut arena, source);
    let printed = print_line(&arena, &first);

    let second = parse(&mut arena, &printed);
    let reprinted = print_line(&arena, &second);

    assert_eq!(printed, reprinted, "source: {}", source);
    assert_eq!(first.tag(), second.tag(), "source: {}", source);
    assert_eq!(first.size(&arena), second.size(&arena), "source: {}", source);
    assert_eq!(first.label().is_some(), second.label().is_some());

    if let (Line::Instruction(a), Line::Instruction(b)) = (&first, &second) {
        assert_eq!(a.opcode, b.opcode, "source: {}", source);
        assert_eq!(a.abs_for_rel, b.abs_for_rel, "source: {}", source);
    }
}

#[test]
fn test_comment() {
    assert_round_trip(";   several   words of    text");
    assert_round_trip(";");
}

#[test]
fn test_org() {
    assert_round_trip(".org c000");
}

#[test]
fn test_bytes() {
    assert_round_trip("tbl .bytes 0,ff,80,7f");
    assert_round_trip(".db 1");
}

#[test]
fn test_words() {
    assert_round_trip("vec .words 200,fffc,0");
}

#[test]
fn test_eq_byte() {
    assert_round_trip("size .eqbyte 10");
}

#[test]
fn test_eq_word() {
    assert_round_trip("port .eqword d010");
}

#[test]
fn test_instructions() {
    for source in &[
        "start lda #01",
        "asl a",
        "clc",
        "sta 0300,x",
        "lda *10,x",
        "ldx *10,y",
        "lda (ptr,x)",
        "lda (ptr),y",
        "jmp (vector)",
        "loop beq loop",
        "bne +f0",
        "bcc 0210",
        "inc *count",
    ] {
        assert_round_trip(source);
    }
}
