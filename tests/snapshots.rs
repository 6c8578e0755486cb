use lasm::{assemble, Source};

fn assemble_hex(text: &str) -> String {
    let bytes = assemble(&[Source::new("snap.lasm", text)]).unwrap();
    bytes
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn snapshot_hlt() {
    insta::assert_snapshot!(
        assemble_hex("hlt"),
        @"02 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00"
    );
}

#[test]
fn snapshot_data_word() {
    insta::assert_snapshot!(assemble_hex("dw 42"), @"2a 00 00 00 00 00 00 00");
}

#[test]
fn snapshot_mov_indirect_destination() {
    insta::assert_snapshot!(
        assemble_hex("mov [r1], 42"),
        @"01 26 00 01 00 00 00 00 00 00 00 2a 00 00 00 00 00 00 00"
    );
}

#[test]
fn snapshot_forward_jump() {
    insta::assert_snapshot!(
        assemble_hex("jmp fin\nfin: hlt\n"),
        @"03 08 00 13 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 02 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00"
    );
}
