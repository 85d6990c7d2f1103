use prog6502::{
    emit::{self, install, listing},
    error::{EmitError, Severity},
    Program,
};

fn load(source: &str) -> Program {
    let mut program = Program::new();

    for line in source.lines().filter(|line| !line.trim().is_empty()) {
        program.append_line(line).unwrap();
    }

    program
}

fn messages(program: &Program, severity: Severity) -> Vec<String> {
    program
        .compile()
        .diagnostics
        .into_iter()
        .filter(|d| d.severity == severity)
        .map(|d| d.message)
        .collect()
}

#[test]
fn test_simple_program() {
    let program = load(include_str!("programs/simple.s"));
    let result = program.compile();

    assert_eq!(result.errors(), 0);
    assert_eq!(result.warnings(), 0);
    assert!(!result.synthesize_reset_vector);

    assert_eq!(result.addresses[2], Some(0x0200));
    assert_eq!(result.addresses[3], Some(0x0202));
    assert_eq!(program.lines().get(2).unwrap().size(program.arena()), 2);
    assert_eq!(program.lines().get(3).unwrap().size(program.arena()), 3);

    let mut memory = vec![0u8; 0x10000];
    let written = install(program.arena(), program.lines(), &result, &mut memory).unwrap();

    assert_eq!(written, 7);
    assert_eq!(&memory[0xFFFC..], &[0x00, 0x02]);
}

#[test]
fn test_undefined_label() {
    let program = load(include_str!("programs/undefined.s"));
    let result = program.compile();

    assert_eq!(result.errors(), 1);
    assert_eq!(messages(&program, Severity::Error), vec!["no definition for away"]);

    let mut memory = vec![0u8; 0x10000];

    assert_eq!(
        install(program.arena(), program.lines(), &result, &mut memory),
        Err(EmitError::CompileErrors { errors: 1 })
    );
    assert!(listing(program.arena(), program.lines(), &result).is_err());
    assert!(memory.iter().all(|b| *b == 0));
}

#[test]
fn test_unused_label() {
    let program = load(include_str!("programs/unused.s"));
    let result = program.compile();

    assert_eq!(result.errors(), 0);
    assert_eq!(messages(&program, Severity::Warning), vec!["no usage of cnt"]);

    let mut memory = vec![0u8; 0x10000];
    assert_eq!(install(program.arena(), program.lines(), &result, &mut memory), Ok(3));
    assert_eq!(memory[0x200], 0xEA);
}

#[test]
fn test_synthesized_reset_vector() {
    let program = load(include_str!("programs/no_org.s"));
    let result = program.compile();

    assert_eq!(result.errors(), 0);
    assert!(result.synthesize_reset_vector);
    assert_eq!(
        messages(&program, Severity::Warning),
        vec![
            "no .ORG, assuming 0200",
            "reset vector missing (FFFC/FFFD), assuming 0200",
        ]
    );

    let mut memory = vec![0u8; 0x10000];
    let written = install(program.arena(), program.lines(), &result, &mut memory).unwrap();

    assert_eq!(written, 5);
    assert_eq!(&memory[0x200..0x203], &[0xA9, 0x01, 0x60]);
    assert_eq!(&memory[0xFFFC..], &[0x00, 0x02]);
}

#[test]
fn test_branch_too_far() {
    let program = load(include_str!("programs/branch_far.s"));
    let result = program.compile();

    assert_eq!(result.errors(), 1);

    let errors = messages(&program, Severity::Error);
    assert!(errors[0].starts_with("branch too far"), "{:?}", errors);
}

#[test]
fn test_branch_crossing_page() {
    let program = load(include_str!("programs/branch_near.s"));
    let result = program.compile();

    assert_eq!(result.errors(), 0);
    assert_eq!(result.warnings(), 1);

    let warnings = messages(&program, Severity::Warning);
    assert!(warnings[0].starts_with("extra cycle, page crossed"), "{:?}", warnings);

    let placed = emit::placed(program.arena(), program.lines(), &result);
    assert_eq!(placed[0].bytes, vec![0xF0, 100]);
}

#[test]
fn test_zero_page_suggestion() {
    let program = load(include_str!("programs/zero_page.s"));
    let result = program.compile();

    assert_eq!(result.errors(), 0);

    let warnings = messages(&program, Severity::Warning);
    assert_eq!(warnings, vec!["operand 0050 is in zero page, suggest ZPG"]);

    let flagged: Vec<_> = result.diagnostics.iter().map(|d| d.line).collect();
    assert_eq!(flagged, vec![Some(1)]);
}

#[test]
fn test_count_listing() {
    let program = load(include_str!("programs/count.s"));
    let result = program.compile();

    assert_eq!(result.errors(), 0);
    assert_eq!(messages(&program, Severity::Warning), vec!["no usage of table"]);

    let rows = listing(program.arena(), program.lines(), &result).unwrap();

    assert_eq!(
        rows,
        vec![
            "     |             | 000 ; count down from ten",
            "     |             | 001          .ORG 0300",
            "     |             | 002 count    .EB 0A",
            "     |             | 003 screen   .EW D012",
            "0300 | A2 0A       | 004 start    LDX #count",
            "0302 | 8A          | 005 loop     TXA",
            "0303 | 8D 12 D0    | 006          STA screen",
            "0306 | CA          | 007          DEX",
            "0307 | D0 F9       | 008          BNE loop",
            "0309 | 4C 00 03    | 009          JMP start",
            "030C | 01 02 04 08 | 00A table    .DB 01,02,04,08,10,20,40",
            "0310 | 10 20 40    | more bytes",
            "0313 |             | end",
            "     |             | 00B          .ORG FFFC",
            "FFFC | 00 03       | 00C          .DW 0300",
            "0000 |             | end",
        ]
    );
}

#[test]
fn test_count_hex_dump() {
    let program = load(include_str!("programs/count.s"));
    let result = program.compile();

    let rows = emit::hex_dump(program.arena(), program.lines(), &result).unwrap();

    assert_eq!(
        rows,
        vec![
            "0300: A2 0A 8A 8D 12 D0 CA D0 F9 4C 00 03 01 02 04 08",
            "0310: 10 20 40",
            "FFFC: 00 03",
        ]
    );
}
