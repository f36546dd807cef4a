use emu8_core::{Chip8, Config, Cycle, Error};

fn load(config: Config, words: &[u16]) -> Chip8 {
    let program: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    let mut chip8 = Chip8::with_seed(config, 0);
    chip8.load_program(&program).unwrap();
    chip8
}

fn run(chip8: &mut Chip8, cycles: usize) {
    for _ in 0..cycles {
        chip8.step().unwrap();
    }
}

#[test]
fn store_then_load_v0() {
    // V0 = 5; I = 0; M[0] = V0; V0 = 0; I = 0; V0 = M[0]
    let mut chip8 = load(Config::default(), &[0x6005, 0xA000, 0xF055, 0x6000, 0xA000, 0xF065]);
    run(&mut chip8, 3);
    assert_eq!(chip8.state().memory[0], 5);
    run(&mut chip8, 3);
    assert_eq!(chip8.state().v[0x0], 5);
}

#[test]
fn store_then_load_v1() {
    // V1 = 5; I = 0; M[0..2] = V0..V1; V1 = 0; I = 0; V0..V1 = M[0..2]
    let mut chip8 = load(Config::default(), &[0x6105, 0xA000, 0xF155, 0x6100, 0xA000, 0xF165]);
    run(&mut chip8, 6);
    assert_eq!(chip8.state().memory[1], 5);
    assert_eq!(chip8.state().v[0x1], 5);
    assert_eq!(chip8.state().i, 2);
}

#[test]
fn clear_screen_blanks_and_redraws() {
    let mut chip8 = load(Config::default(), &[0x00E0]);
    chip8.state_mut().frame_buffer.draw(3, 4, &[0xFF, 0x81]);
    assert_eq!(chip8.step().unwrap(), Cycle::Redraw);
    assert!(chip8.frame().is_blank());
}

#[test]
fn draws_a_bcd_digit() {
    // V0 = 137; I = 0x300; bcd(V0); V0..V2 = M[I..I+3]; I = glyph(V1); draw V3,V3
    let mut chip8 = load(
        Config::default(),
        &[0x6089, 0xA300, 0xF033, 0xF265, 0xF129, 0xD335],
    );
    run(&mut chip8, 5);
    assert_eq!(chip8.state().v[..3], [1, 3, 7]);
    assert_eq!(chip8.state().i, 15);
    assert_eq!(chip8.step().unwrap(), Cycle::Redraw);
    // the "3" glyph is 0xF0 0x10 0xF0 0x10 0xF0
    assert!(chip8.frame().is_lit(0, 0));
    assert!(!chip8.frame().is_lit(0, 1));
    assert!(chip8.frame().is_lit(3, 1));
}

#[test]
fn subroutine_round_trip() {
    // call 0x206; V0 = 1; jump to self; (0x206) V1 = 2; return
    let mut chip8 = load(Config::default(), &[0x2206, 0x6001, 0x1204, 0x6102, 0x00EE]);
    run(&mut chip8, 4);
    assert_eq!(chip8.state().v[..2], [1, 2]);
    assert_eq!(chip8.state().pc, 0x204);
    assert!(chip8.state().stack.is_empty());
}

#[test]
fn returning_from_top_level_fails() {
    let mut chip8 = load(Config::default(), &[0x00EE]);
    assert!(matches!(chip8.step(), Err(Error::EmptyCallStack { address: 0x200 })));
}

#[test]
fn running_off_the_end_of_memory_fails() {
    // 0FFE holds 0x0000 (sys) which advances pc to 0x1000
    let mut chip8 = load(Config::default(), &[0x1FFE]);
    run(&mut chip8, 2);
    assert!(matches!(chip8.step(), Err(Error::OutOfBoundsFetch { pc: 0x1000 })));
}

#[test]
fn oversized_rom_is_rejected() {
    let mut chip8 = Chip8::default();
    let rom = vec![0u8; 4096];
    let mut reader: &[u8] = &rom;
    assert!(matches!(
        chip8.load_rom(&mut reader),
        Err(Error::ProgramTooLarge { size: 4096, capacity: 3584 })
    ));
}

#[test]
fn errors_name_the_culprit() {
    let err = Error::UnrecognisedOpcode {
        opcode: 0x5121,
        address: 0x202,
    };
    assert_eq!(err.to_string(), "unrecognised opcode 0x5121 at 0x202");
}
